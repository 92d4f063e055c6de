//! Record Decoder - Zeek TSV line parsing
//!
//! Zeek's ASCII logs are tab-separated with an in-band `#fields` header
//! that declares the column order; `-` marks an unset field. The decoder
//! tracks the header per source and fails per-line, never per-batch: a
//! malformed line is reported to the caller (who counts it) and the
//! stream continues.

pub mod enrich;
pub mod record;

pub use enrich::EnrichmentCache;
pub use record::{AuxDetail, AuxRecord, ConnRecord, Decoded, LogKind};

use std::collections::HashMap;

/// Why a line could not produce a record.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Header not seen yet, or the line has too few columns.
    Malformed(String),
    /// Timestamp missing, non-numeric, or containing NULs.
    BadTimestamp(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(msg) => write!(f, "malformed line: {}", msg),
            DecodeError::BadTimestamp(ts) => write!(f, "invalid timestamp '{}'", ts),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Stateful decoder for one log source.
pub struct ZeekDecoder {
    kind: LogKind,
    fields: Option<Vec<String>>,
    index: HashMap<String, usize>,
}

impl ZeekDecoder {
    pub fn new(kind: LogKind) -> Self {
        Self {
            kind,
            fields: None,
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> LogKind {
        self.kind
    }

    /// Forget the captured header. Called after a file rotation so a stale
    /// column order is never applied to the new file.
    pub fn reset(&mut self) {
        self.fields = None;
        self.index.clear();
    }

    /// Decode one raw line. `Ok(None)` for comments, headers, and blanks.
    pub fn decode_line(&mut self, line: &str) -> Result<Option<Decoded>, DecodeError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = line.strip_prefix("#fields") {
            let fields: Vec<String> = rest
                .trim_start_matches(['\t', ' '])
                .split('\t')
                .map(|s| s.to_string())
                .collect();
            self.index = fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.clone(), i))
                .collect();
            self.fields = Some(fields);
            return Ok(None);
        }
        if line.starts_with('#') {
            return Ok(None);
        }

        if self.fields.is_none() {
            return Err(DecodeError::Malformed("data line before #fields header".into()));
        }

        let values: Vec<&str> = line.split('\t').collect();
        if values.len() < 2 {
            return Err(DecodeError::Malformed(format!("{} columns", values.len())));
        }

        let ts_raw = self.get(&values, "ts").unwrap_or("");
        let ts = parse_ts(ts_raw).ok_or_else(|| DecodeError::BadTimestamp(ts_raw.into()))?;

        let uid = match self.get(&values, "uid") {
            Some(u) => u.to_string(),
            None => return Err(DecodeError::Malformed("missing uid".into())),
        };

        match self.kind {
            LogKind::Conn => {
                let record = ConnRecord {
                    ts,
                    uid,
                    orig_h: self.get(&values, "id.orig_h").unwrap_or("").to_string(),
                    orig_p: self.get_parsed(&values, "id.orig_p"),
                    resp_h: self.get(&values, "id.resp_h").unwrap_or("").to_string(),
                    resp_p: self.get_parsed(&values, "id.resp_p"),
                    proto: self.get(&values, "proto").map(str::to_string),
                    service: self.get(&values, "service").map(str::to_string),
                    duration: self.get_parsed(&values, "duration"),
                    orig_bytes: self.get_parsed(&values, "orig_bytes"),
                    resp_bytes: self.get_parsed(&values, "resp_bytes"),
                    conn_state: self.get(&values, "conn_state").map(str::to_string),
                    missed_bytes: self.get_parsed(&values, "missed_bytes"),
                    history: self.get(&values, "history").map(str::to_string),
                    orig_pkts: self.get_parsed(&values, "orig_pkts"),
                    resp_pkts: self.get_parsed(&values, "resp_pkts"),
                };
                Ok(Some(Decoded::Conn(record)))
            }
            kind => {
                let detail = match kind {
                    LogKind::Dns => AuxDetail::Dns {
                        qtype: self.get(&values, "qtype_name").map(str::to_string),
                    },
                    LogKind::Http => AuxDetail::Http {
                        status: self.get_parsed(&values, "status_code"),
                        uri: self.get(&values, "uri").map(str::to_string),
                        username: self.get(&values, "username").map(str::to_string),
                    },
                    LogKind::Ssh => AuxDetail::Ssh {
                        auth_success: self
                            .get(&values, "auth_success")
                            .map(|v| v == "T" || v == "true"),
                    },
                    LogKind::Ssl => AuxDetail::Ssl {
                        server_name: self.get(&values, "server_name").map(str::to_string),
                    },
                    LogKind::Weird => AuxDetail::Weird {
                        name: self.get(&values, "name").map(str::to_string),
                    },
                    LogKind::Notice => AuxDetail::Notice {
                        note: self.get(&values, "note").map(str::to_string),
                    },
                    LogKind::Conn => unreachable!(),
                };
                Ok(Some(Decoded::Aux(AuxRecord { kind, ts, uid, detail })))
            }
        }
    }

    /// Field lookup honoring Zeek's `-` unset marker.
    fn get<'a>(&self, values: &[&'a str], name: &str) -> Option<&'a str> {
        let idx = *self.index.get(name)?;
        match values.get(idx) {
            Some(&v) if v != "-" && !v.is_empty() => Some(v),
            _ => None,
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, values: &[&str], name: &str) -> Option<T> {
        self.get(values, name).and_then(|v| v.parse().ok())
    }
}

/// Parse an epoch-seconds timestamp, rejecting the garbage Zeek can leave
/// behind after an unclean shutdown (embedded NULs, non-numeric text).
fn parse_ts(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.contains('\0') {
        return None;
    }
    let ts: f64 = raw.parse().ok()?;
    if ts.is_finite() && ts >= 0.0 {
        Some(ts)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONN_HEADER: &str = "#fields\tts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tservice\tduration\torig_bytes\tresp_bytes\tconn_state\tmissed_bytes\thistory\torig_pkts\tresp_pkts";

    fn conn_line(ts: &str, uid: &str, service: &str, state: &str) -> String {
        format!(
            "{}\t{}\t192.168.1.10\t51234\t10.0.0.5\t80\ttcp\t{}\t0.25\t120\t4000\t{}\t0\tShADad\t4\t6",
            ts, uid, service, state
        )
    }

    #[test]
    fn test_decode_conn_line() {
        let mut dec = ZeekDecoder::new(LogKind::Conn);
        assert!(dec.decode_line(CONN_HEADER).unwrap().is_none());

        let decoded = dec
            .decode_line(&conn_line("1710000000.123", "CAbc1", "http", "SF"))
            .unwrap()
            .unwrap();
        match decoded {
            Decoded::Conn(rec) => {
                assert_eq!(rec.uid, "CAbc1");
                assert_eq!(rec.orig_p, Some(51234));
                assert_eq!(rec.service.as_deref(), Some("http"));
                assert_eq!(rec.conn_state.as_deref(), Some("SF"));
                assert_eq!(rec.orig_bytes, Some(120));
                assert!((rec.ts - 1710000000.123).abs() < 1e-6);
            }
            other => panic!("expected conn record, got {:?}", other),
        }
    }

    #[test]
    fn test_unset_fields_stay_none() {
        let mut dec = ZeekDecoder::new(LogKind::Conn);
        dec.decode_line(CONN_HEADER).unwrap();
        let line = "1710000000.5\tCAbc2\t192.168.1.10\t51234\t10.0.0.5\t80\ttcp\t-\t-\t-\t-\tS0\t-\t-\t-\t-";
        let decoded = dec.decode_line(line).unwrap().unwrap();
        match decoded {
            Decoded::Conn(rec) => {
                assert!(rec.service.is_none());
                assert!(rec.duration.is_none());
                assert!(rec.orig_bytes.is_none());
                assert_eq!(rec.service_or_other(), "other");
            }
            other => panic!("expected conn record, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line_skipped_neighbors_survive() {
        let mut dec = ZeekDecoder::new(LogKind::Conn);
        dec.decode_line(CONN_HEADER).unwrap();

        let good1 = dec.decode_line(&conn_line("1.0", "C1", "http", "SF")).unwrap();
        let bad = dec.decode_line("garbage-no-tabs");
        let good2 = dec.decode_line(&conn_line("2.0", "C2", "dns", "SF")).unwrap();

        assert!(good1.is_some());
        assert!(bad.is_err());
        match good2.unwrap() {
            Decoded::Conn(rec) => assert_eq!(rec.uid, "C2"),
            other => panic!("expected conn record, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let mut dec = ZeekDecoder::new(LogKind::Conn);
        dec.decode_line(CONN_HEADER).unwrap();
        let err = dec
            .decode_line(&conn_line("not-a-ts", "C3", "http", "SF"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::BadTimestamp(_)));
    }

    #[test]
    fn test_data_before_header_is_malformed() {
        let mut dec = ZeekDecoder::new(LogKind::Conn);
        let err = dec.decode_line("1.0\tC1\ta\tb").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_reset_clears_header() {
        let mut dec = ZeekDecoder::new(LogKind::Conn);
        dec.decode_line(CONN_HEADER).unwrap();
        dec.reset();
        assert!(dec.decode_line(&conn_line("1.0", "C1", "http", "SF")).is_err());
    }

    #[test]
    fn test_decode_notice_aux() {
        let mut dec = ZeekDecoder::new(LogKind::Notice);
        dec.decode_line("#fields\tts\tuid\tnote\tmsg").unwrap();
        let decoded = dec
            .decode_line("7.0\tC5\tATTACK::Exploit_Attempt\tdetails")
            .unwrap()
            .unwrap();
        match decoded {
            Decoded::Aux(aux) => {
                assert_eq!(aux.kind, LogKind::Notice);
                match aux.detail {
                    AuxDetail::Notice { note } => {
                        assert_eq!(note.as_deref(), Some("ATTACK::Exploit_Attempt"));
                    }
                    other => panic!("expected notice detail, got {:?}", other),
                }
            }
            other => panic!("expected aux record, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_http_aux() {
        let mut dec = ZeekDecoder::new(LogKind::Http);
        dec.decode_line("#fields\tts\tuid\turi\tstatus_code\tusername").unwrap();
        let decoded = dec
            .decode_line("5.0\tC9\t/index.php?cmd=ls\t200\t-")
            .unwrap()
            .unwrap();
        match decoded {
            Decoded::Aux(aux) => {
                assert_eq!(aux.kind, LogKind::Http);
                match aux.detail {
                    AuxDetail::Http { status, uri, username } => {
                        assert_eq!(status, Some(200));
                        assert_eq!(uri.as_deref(), Some("/index.php?cmd=ls"));
                        assert!(username.is_none());
                    }
                    other => panic!("expected http detail, got {:?}", other),
                }
            }
            other => panic!("expected aux record, got {:?}", other),
        }
    }
}
