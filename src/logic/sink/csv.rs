//! CSV Sink
//!
//! Append-only output file: one row per scored record, identity columns
//! first, then the full feature layout, then the verdict. The header is
//! written only when the file is new or empty so restarts append instead
//! of corrupting the log. `flush` runs before offsets are committed, so
//! a crash can duplicate a few rows but never lose them.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::logic::error::PipelineResult;
use crate::logic::features::{FEATURE_LAYOUT, FEATURE_VERSION};

use super::ClassificationResult;

pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<std::fs::File>,
    rows_written: u64,
}

impl CsvSink {
    pub fn open(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);

        if needs_header {
            writeln!(writer, "{}", header())?;
            writer.flush()?;
            log::info!("CSV sink created: {}", path.display());
        } else {
            log::info!("CSV sink appending to: {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn append(&mut self, result: &ClassificationResult) -> PipelineResult<()> {
        let mut row = String::with_capacity(256);
        row.push_str(&format!(
            "{:.6},{},{},{},{},{}",
            result.ts,
            result.uid,
            result.orig_h,
            result.orig_p.map(|p| p.to_string()).unwrap_or_default(),
            result.resp_h,
            result.resp_p.map(|p| p.to_string()).unwrap_or_default(),
        ));
        for (_, value) in result.features.named_values() {
            row.push(',');
            row.push_str(&format_value(value));
        }
        row.push_str(&format!(
            ",{:.6},{},{}",
            result.probability,
            result.label.as_str(),
            result.features.version
        ));

        writeln!(self.writer, "{}", row)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush buffered rows to disk. Called once per poll cycle, before
    /// the offset store commits.
    pub fn flush(&mut self) -> PipelineResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn header() -> String {
    let mut cols = vec![
        "ts".to_string(),
        "uid".to_string(),
        "src_ip".to_string(),
        "src_port".to_string(),
        "dst_ip".to_string(),
        "dst_port".to_string(),
    ];
    cols.extend(FEATURE_LAYOUT.iter().map(|s| s.to_string()));
    cols.push("probability".to_string());
    cols.push("label".to_string());
    cols.push("feature_version".to_string());
    debug_assert!(FEATURE_VERSION >= 1);
    cols.join(",")
}

/// Integers print without a fractional part so counts stay readable.
fn format_value(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < 1e9 {
        format!("{}", value as i64)
    } else {
        format!("{:.6}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{FeatureVector, FEATURE_COUNT};
    use crate::logic::model::{Label, Prediction};

    fn sample_result() -> ClassificationResult {
        let record = crate::logic::decoder::ConnRecord {
            ts: 1700000000.5,
            uid: "C1".into(),
            orig_h: "192.168.1.2".into(),
            orig_p: Some(54321),
            resp_h: "10.0.0.1".into(),
            resp_p: Some(80),
            proto: Some("tcp".into()),
            service: Some("http".into()),
            duration: Some(0.5),
            orig_bytes: Some(10),
            resp_bytes: Some(20),
            conn_state: Some("SF".into()),
            missed_bytes: None,
            history: None,
            orig_pkts: None,
            resp_pkts: None,
        };
        let prediction = Prediction {
            probability: 0.73,
            label: Label::Attack,
            inference_time_us: 120,
        };
        ClassificationResult::new(
            &record,
            FeatureVector::from_values([1.0; FEATURE_COUNT]),
            &prediction,
            false,
        )
    }

    #[test]
    fn test_header_written_once_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.append(&sample_result()).unwrap();
            sink.flush().unwrap();
        }
        {
            let mut sink = CsvSink::open(&path).unwrap();
            sink.append(&sample_result()).unwrap();
            sink.flush().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let headers = lines.iter().filter(|l| l.starts_with("ts,uid,")).count();
        assert_eq!(headers, 1);
    }

    #[test]
    fn test_row_width_matches_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&sample_result()).unwrap();
        sink.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let header_cols = lines.next().unwrap().split(',').count();
        let row_cols = lines.next().unwrap().split(',').count();
        assert_eq!(header_cols, row_cols);
        assert_eq!(header_cols, 6 + FEATURE_COUNT + 3);
    }

    #[test]
    fn test_rows_survive_flush_before_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        for _ in 0..5 {
            sink.append(&sample_result()).unwrap();
        }
        sink.flush().unwrap();
        assert_eq!(sink.rows_written(), 5);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 6);
    }
}
