//! Enrichment cache
//!
//! Protocol-log entries arrive independently of conn.log and are matched
//! by uid. The cache keeps a bounded uid -> extras map feeding the
//! content features (hot indicators, logged_in, wrong_fragment) and the
//! service fallback. Oldest uid is evicted at capacity so memory stays
//! bounded regardless of traffic.

use std::collections::{HashMap, VecDeque};

use super::record::{AuxDetail, AuxRecord, LogKind};

/// URI substrings treated as hot indicators (command injection, path
/// traversal, credential probing).
const HOT_PATTERNS: &[&str] = &[
    "cmd=", "exec=", "/bin/", "/etc/", "passwd", "shadow", ".php?", "eval(", "system(",
];

/// Notice note substrings counted as compromise indicators.
const COMPROMISE_PATTERNS: &[&str] = &["exploit", "attack", "backdoor", "trojan"];

/// Default uid capacity.
pub const DEFAULT_ENRICHMENT_CAP: usize = 10_000;

/// Content-feature inputs accumulated per connection uid.
#[derive(Debug, Clone, Default)]
pub struct ConnExtras {
    /// Suspicious-pattern hits across HTTP URIs
    pub hot_hits: u32,
    /// HTTP request carried a username (basic auth or form)
    pub http_auth: bool,
    /// SSH log confirmed a successful authentication
    pub ssh_auth_ok: bool,
    /// Weird events whose name mentions fragmentation
    pub frag_weirds: u32,
    /// Security notices whose note mentions a compromise indicator
    pub compromise_hits: u32,
    /// Service implied by the protocol log when conn.log has none
    pub fallback_service: Option<String>,
}

pub struct EnrichmentCache {
    extras: HashMap<String, ConnExtras>,
    order: VecDeque<String>,
    capacity: usize,
}

impl EnrichmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            extras: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.extras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extras.is_empty()
    }

    /// Fold one protocol-log entry into the uid's extras.
    pub fn observe(&mut self, aux: &AuxRecord) {
        if !self.extras.contains_key(&aux.uid) {
            if self.extras.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.extras.remove(&oldest);
                }
            }
            self.order.push_back(aux.uid.clone());
        }
        let entry = self.extras.entry(aux.uid.clone()).or_default();

        // Only protocol logs imply a service; weird/notice entries do not
        let names_service = matches!(
            aux.kind,
            LogKind::Dns | LogKind::Http | LogKind::Ssh | LogKind::Ssl
        );
        if names_service && entry.fallback_service.is_none() {
            entry.fallback_service = Some(aux.kind.as_str().to_string());
        }

        match &aux.detail {
            AuxDetail::Http { uri, username, .. } => {
                if let Some(uri) = uri {
                    entry.hot_hits += HOT_PATTERNS
                        .iter()
                        .filter(|p| uri.contains(*p))
                        .count() as u32;
                }
                if username.is_some() {
                    entry.http_auth = true;
                }
            }
            AuxDetail::Ssh { auth_success } => {
                if *auth_success == Some(true) {
                    entry.ssh_auth_ok = true;
                }
            }
            AuxDetail::Weird { name } => {
                if name
                    .as_deref()
                    .map(|n| n.to_ascii_lowercase().contains("frag"))
                    .unwrap_or(false)
                {
                    entry.frag_weirds += 1;
                }
            }
            AuxDetail::Notice { note } => {
                if let Some(note) = note {
                    let lowered = note.to_ascii_lowercase();
                    if COMPROMISE_PATTERNS.iter().any(|p| lowered.contains(p)) {
                        entry.compromise_hits += 1;
                    }
                }
            }
            AuxDetail::Dns { .. } | AuxDetail::Ssl { .. } => {}
        }
    }

    pub fn get(&self, uid: &str) -> Option<&ConnExtras> {
        self.extras.get(uid)
    }
}
