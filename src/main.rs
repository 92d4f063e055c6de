//! Zeek IDS Core - Main Entry Point

mod logic;
pub mod constants;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use logic::config::PipelineConfig;
use logic::pipeline::Pipeline;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let config = PipelineConfig::default();
    if let Err(e) = config.validate() {
        log::error!("Configuration invalid: {}", e);
        std::process::exit(1);
    }
    log::info!("Log source: {}", config.log_dir.display());
    log::info!("Output: {}", config.output_file.display());
    log::info!("Model: {}", config.model_path.display());

    let pipeline = match Pipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let status = pipeline.status_handle();
    let feed = pipeline.feed();

    let shutdown = Arc::new(AtomicBool::new(false));
    let pipeline_shutdown = Arc::clone(&shutdown);
    let worker = std::thread::spawn(move || {
        pipeline.run(pipeline_shutdown);
    });

    // Park the main thread on the signal; the pipeline drains on exit.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();
    match rt {
        Ok(rt) => {
            rt.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Signal handler failed: {}", e);
                }
            });
        }
        Err(e) => {
            log::error!("Tokio runtime failed: {}", e);
        }
    }

    log::info!("Shutting down...");
    shutdown.store(true, Ordering::SeqCst);
    if worker.join().is_err() {
        log::error!("Pipeline thread panicked");
    }

    let status = status.read();
    let stats = feed.stats();
    log::info!(
        "Final: {} scored, {} attacks ({:.1}% rate), {} malformed, {} inference failures",
        status.records_scored,
        status.attacks,
        stats.attack_rate * 100.0,
        status.malformed_lines,
        status.inference_failures
    );
}
