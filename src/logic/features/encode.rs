//! Feature Encoder
//!
//! Combines a conn record's intrinsic attributes, the aggregator's
//! post-update snapshot, and the fixed categorical vocabularies into a
//! complete vector in `FEATURE_LAYOUT` order.
//!
//! Content attributes that would need payload inspection are
//! approximated from the protocol logs where possible: `hot` counts
//! suspicious HTTP URI patterns, `wrong_fragment` counts fragmentation
//! weirds, `num_compromised` counts compromise-indicating security
//! notices. `urgent` has no connection-log source and is always 0.

use crate::logic::decoder::enrich::ConnExtras;
use crate::logic::decoder::ConnRecord;
use crate::logic::window::WindowSnapshot;

use super::layout::FEATURE_COUNT;
use super::vector::FeatureVector;
use super::vocab;

/// Services that imply an authenticated session when the connection
/// completed normally.
const AUTH_SERVICES: &[&str] = &["ssh", "ftp", "smtp", "pop3", "imap", "telnet"];

pub fn encode(
    record: &ConnRecord,
    snapshot: &WindowSnapshot,
    extras: Option<&ConnExtras>,
) -> FeatureVector {
    // Protocol logs can name the service when conn.log could not
    let service = record
        .service
        .as_deref()
        .or_else(|| extras.and_then(|e| e.fallback_service.as_deref()));

    let mut v = [0.0f32; FEATURE_COUNT];

    // Basic attributes
    v[0] = record.duration.unwrap_or(0.0) as f32;
    v[1] = vocab::encode_protocol(record.proto.as_deref());
    v[2] = vocab::encode_service(service);
    v[3] = vocab::encode_flag(record.conn_state.as_deref());
    v[4] = record.orig_bytes.unwrap_or(0) as f32;
    v[5] = record.resp_bytes.unwrap_or(0) as f32;
    v[6] = if record.is_land() { 1.0 } else { 0.0 };
    v[7] = extras.map(|e| e.frag_weirds).unwrap_or(0) as f32;
    v[8] = 0.0; // urgent: not derivable from connection logs

    // Content attributes
    v[9] = extras.map(|e| e.hot_hits).unwrap_or(0) as f32;
    v[10] = if is_logged_in(record, service, extras) { 1.0 } else { 0.0 };
    v[11] = extras.map(|e| e.compromise_hits).unwrap_or(0) as f32;

    // Time-window statistics
    v[12] = snapshot.count as f32;
    v[13] = snapshot.srv_count as f32;
    v[14] = snapshot.serror_rate;
    v[15] = snapshot.srv_serror_rate;
    v[16] = snapshot.rerror_rate;
    v[17] = snapshot.same_srv_rate;
    v[18] = snapshot.diff_srv_rate;

    // Destination-host count-window statistics
    v[19] = snapshot.dst_host_count as f32;
    v[20] = snapshot.dst_host_srv_count as f32;
    v[21] = snapshot.dst_host_same_srv_rate;
    v[22] = snapshot.dst_host_serror_rate;
    v[23] = snapshot.dst_host_rerror_rate;

    FeatureVector::from_values(v)
}

fn is_logged_in(record: &ConnRecord, service: Option<&str>, extras: Option<&ConnExtras>) -> bool {
    if let Some(e) = extras {
        if e.ssh_auth_ok || e.http_auth {
            return true;
        }
    }
    let established = record.conn_state.as_deref() == Some("SF");
    established && service.map_or(false, |s| AUTH_SERVICES.contains(&s))
}
