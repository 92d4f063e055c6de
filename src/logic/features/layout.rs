//! Feature Layout - the trained schema, centralized
//!
//! The classifier was trained against this exact column order. Any
//! change here (add, remove, reorder) must increment `FEATURE_VERSION`;
//! the CRC identifies the layout at runtime so a vector produced under
//! an older layout is rejected instead of silently misread.

use crc32fast::Hasher;

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in the exact order they appear in the vector.
/// Single source of truth for the encoder, the CSV header, and the
/// startup compatibility check against the model's input width.
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Basic connection attributes (0-8) ===
    "duration",
    "protocol_type",
    "service",
    "flag",
    "src_bytes",
    "dst_bytes",
    "land",
    "wrong_fragment",
    "urgent",
    // === Content attributes (9-11), approximated from protocol logs ===
    "hot",
    "logged_in",
    "num_compromised",
    // === Time-window traffic statistics (12-18) ===
    "count",
    "srv_count",
    "serror_rate",
    "srv_serror_rate",
    "rerror_rate",
    "same_srv_rate",
    "diff_srv_rate",
    // === Destination-host count-window statistics (19-23) ===
    "dst_host_count",
    "dst_host_srv_count",
    "dst_host_same_srv_rate",
    "dst_host_serror_rate",
    "dst_host_rerror_rate",
];

/// Total number of features. Must match FEATURE_LAYOUT.len().
pub const FEATURE_COUNT: usize = 24;

/// CRC32 over version + ordered feature names.
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// A vector was produced under a different layout than the running one.
#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "feature layout mismatch: expected v{} (hash {:08x}), got v{} (hash {:08x})",
            self.expected_version, self.expected_hash, self.actual_version, self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let expected = layout_hash();
    if version != FEATURE_VERSION || hash != expected {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: expected,
            actual_version: version,
            actual_hash: hash,
        });
    }
    Ok(())
}

/// Index of a feature name (features are few, linear scan is fine).
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}
