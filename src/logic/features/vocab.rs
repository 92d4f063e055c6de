//! Categorical vocabularies
//!
//! Fixed at model-training time: each categorical field encodes to the
//! label index the trainer used. A value outside the vocabulary maps to
//! the reserved fallback bucket (`other` / `OTH`) so the encoder can
//! never produce an out-of-schema vector, whatever traffic shows up.

/// Protocols the model knows, `other` reserved last.
pub const PROTOCOL_VOCAB: &[&str] = &["tcp", "udp", "icmp", "other"];

/// NSL-KDD service names the model was trained on, `other` reserved last.
pub const SERVICE_VOCAB: &[&str] = &[
    "domain", "http", "http_443", "ssh", "ftp", "ftp_data", "smtp", "pop_3",
    "imap4", "telnet", "nntp", "IRC", "whois", "private", "ntp_u", "ldap",
    "finger", "other",
];

/// Zeek connection states, `OTH` reserved last as the fallback.
pub const FLAG_VOCAB: &[&str] = &[
    "S0", "SF", "REJ", "S1", "S2", "S3", "RSTO", "RSTR", "RSTOS0", "SH", "OTH",
];

/// Zeek service name -> NSL-KDD service name. Anything unmapped lands
/// in `other`.
const SERVICE_MAPPING: &[(&str, &str)] = &[
    ("dns", "domain"),
    ("http", "http"),
    ("https", "http_443"),
    ("ssh", "ssh"),
    ("ftp", "ftp"),
    ("ftp-data", "ftp_data"),
    ("smtp", "smtp"),
    ("pop3", "pop_3"),
    ("imap", "imap4"),
    ("telnet", "telnet"),
    ("nntp", "nntp"),
    ("irc", "IRC"),
    ("whois", "whois"),
    ("ssl", "private"),
    ("dhcp", "other"),
    ("ntp", "ntp_u"),
    ("ldap", "ldap"),
    ("finger", "finger"),
];

fn encode_in(vocab: &[&str], value: &str) -> f32 {
    vocab
        .iter()
        .position(|&v| v == value)
        .unwrap_or(vocab.len() - 1) as f32
}

/// Encode a transport protocol. Unknown -> `other` bucket.
pub fn encode_protocol(proto: Option<&str>) -> f32 {
    let p = proto.map(|s| s.to_ascii_lowercase()).unwrap_or_default();
    encode_in(PROTOCOL_VOCAB, &p)
}

/// Translate a Zeek service name into the trained NSL-KDD name.
pub fn map_service(zeek_service: &str) -> &'static str {
    SERVICE_MAPPING
        .iter()
        .find(|(z, _)| *z == zeek_service)
        .map(|(_, n)| *n)
        .unwrap_or("other")
}

/// Encode a Zeek service name. Unknown or unset -> `other` bucket.
pub fn encode_service(zeek_service: Option<&str>) -> f32 {
    let mapped = zeek_service.map(map_service).unwrap_or("other");
    encode_in(SERVICE_VOCAB, mapped)
}

/// Encode a connection-state flag. Unknown or unset -> `OTH` bucket.
pub fn encode_flag(conn_state: Option<&str>) -> f32 {
    encode_in(FLAG_VOCAB, conn_state.unwrap_or("OTH"))
}
