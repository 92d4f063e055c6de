//! Typed log records
//!
//! One closed set of record kinds over the loose shape Zeek logs share:
//! every line carries a timestamp and (for the logs we consume) a
//! connection uid. The conn log is mandatory; protocol logs only enrich.

use serde::{Deserialize, Serialize};

/// Log types recognized by the pipeline, derived from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Conn,
    Dns,
    Http,
    Ssh,
    Ssl,
    Weird,
    Notice,
}

impl LogKind {
    /// Map a log file stem (`conn`, `dns`, ...) to its kind.
    pub fn from_stem(stem: &str) -> Option<Self> {
        match stem {
            "conn" => Some(LogKind::Conn),
            "dns" => Some(LogKind::Dns),
            "http" => Some(LogKind::Http),
            "ssh" => Some(LogKind::Ssh),
            "ssl" => Some(LogKind::Ssl),
            "weird" => Some(LogKind::Weird),
            "notice" => Some(LogKind::Notice),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Conn => "conn",
            LogKind::Dns => "dns",
            LogKind::Http => "http",
            LogKind::Ssh => "ssh",
            LogKind::Ssl => "ssl",
            LogKind::Weird => "weird",
            LogKind::Notice => "notice",
        }
    }
}

/// One parsed conn.log entry. Immutable once constructed.
///
/// Fields Zeek left unset (`-`) stay `None`; a missing byte count is not
/// the same thing as zero bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnRecord {
    pub ts: f64,
    pub uid: String,
    pub orig_h: String,
    pub orig_p: Option<u16>,
    pub resp_h: String,
    pub resp_p: Option<u16>,
    pub proto: Option<String>,
    pub service: Option<String>,
    pub duration: Option<f64>,
    pub orig_bytes: Option<u64>,
    pub resp_bytes: Option<u64>,
    pub conn_state: Option<String>,
    pub missed_bytes: Option<u64>,
    pub history: Option<String>,
    pub orig_pkts: Option<u64>,
    pub resp_pkts: Option<u64>,
}

impl ConnRecord {
    /// Service key used for window bucketing; unset maps to "other".
    pub fn service_or_other(&self) -> &str {
        self.service.as_deref().unwrap_or("other")
    }

    /// Same-host same-port loopback connection (NSL-KDD `land`).
    pub fn is_land(&self) -> bool {
        self.orig_h == self.resp_h && self.orig_p.is_some() && self.orig_p == self.resp_p
    }
}

/// One parsed protocol-log entry, matched to a conn record by uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxRecord {
    pub kind: LogKind,
    pub ts: f64,
    pub uid: String,
    pub detail: AuxDetail,
}

/// Kind-specific attributes the content features consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuxDetail {
    Dns { qtype: Option<String> },
    Http { status: Option<u16>, uri: Option<String>, username: Option<String> },
    Ssh { auth_success: Option<bool> },
    Ssl { server_name: Option<String> },
    Weird { name: Option<String> },
    Notice { note: Option<String> },
}

/// Output of decoding one line.
#[derive(Debug, Clone)]
pub enum Decoded {
    Conn(ConnRecord),
    Aux(AuxRecord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_kind_from_stem() {
        assert_eq!(LogKind::from_stem("conn"), Some(LogKind::Conn));
        assert_eq!(LogKind::from_stem("weird"), Some(LogKind::Weird));
        assert_eq!(LogKind::from_stem("notice"), Some(LogKind::Notice));
        assert_eq!(LogKind::from_stem("stderr"), None);
    }

    #[test]
    fn test_land_detection() {
        let mut rec = ConnRecord {
            ts: 1.0,
            uid: "C1".into(),
            orig_h: "10.0.0.1".into(),
            orig_p: Some(80),
            resp_h: "10.0.0.1".into(),
            resp_p: Some(80),
            proto: Some("tcp".into()),
            service: None,
            duration: None,
            orig_bytes: None,
            resp_bytes: None,
            conn_state: None,
            missed_bytes: None,
            history: None,
            orig_pkts: None,
            resp_pkts: None,
        };
        assert!(rec.is_land());
        rec.resp_p = Some(81);
        assert!(!rec.is_land());
        rec.resp_p = None;
        rec.orig_p = None;
        assert!(!rec.is_land());
    }
}
