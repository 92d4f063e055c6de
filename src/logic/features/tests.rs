use super::*;
use crate::logic::decoder::enrich::ConnExtras;
use crate::logic::decoder::ConnRecord;
use crate::logic::window::WindowSnapshot;

fn record(service: Option<&str>, conn_state: &str) -> ConnRecord {
    ConnRecord {
        ts: 1700000000.0,
        uid: "CTest1".into(),
        orig_h: "192.168.1.10".into(),
        orig_p: Some(51544),
        resp_h: "10.0.0.5".into(),
        resp_p: Some(22),
        proto: Some("tcp".into()),
        service: service.map(|s| s.to_string()),
        duration: Some(1.25),
        orig_bytes: Some(840),
        resp_bytes: Some(1200),
        conn_state: Some(conn_state.into()),
        missed_bytes: None,
        history: Some("ShADad".into()),
        orig_pkts: Some(12),
        resp_pkts: Some(10),
    }
}

#[test]
fn test_encode_produces_full_width_vector() {
    let v = encode(&record(Some("ssh"), "SF"), &WindowSnapshot::default(), None);
    assert_eq!(v.as_slice().len(), FEATURE_COUNT);
    assert!(v.validate().is_ok());
    assert_eq!(v.get_by_name("duration"), Some(1.25));
    assert_eq!(v.get_by_name("src_bytes"), Some(840.0));
    assert_eq!(v.get_by_name("dst_bytes"), Some(1200.0));
}

#[test]
fn test_every_categorical_value_keeps_dimensionality() {
    // Known, unknown, and unset values all encode to the same width.
    let cases = [
        record(Some("dns"), "SF"),
        record(Some("gopher"), "S0"),
        record(None, "REJ"),
        {
            let mut r = record(None, "SF");
            r.proto = Some("sctp".into());
            r.conn_state = Some("XX".into());
            r
        },
    ];
    for rec in &cases {
        let v = encode(rec, &WindowSnapshot::default(), None);
        assert_eq!(v.as_slice().len(), FEATURE_COUNT);
        assert!(v.validate().is_ok());
    }
}

#[test]
fn test_unseen_service_lands_in_reserved_bucket() {
    let v = encode(&record(Some("gopher"), "SF"), &WindowSnapshot::default(), None);
    let other = (vocab::SERVICE_VOCAB.len() - 1) as f32;
    assert_eq!(v.get_by_name("service"), Some(other));
}

#[test]
fn test_window_stats_copied_in_layout_order() {
    let snap = WindowSnapshot {
        count: 42,
        serror_rate: 0.5,
        rerror_rate: 0.25,
        same_srv_rate: 0.75,
        diff_srv_rate: 0.25,
        srv_count: 17,
        srv_serror_rate: 0.1,
        dst_host_count: 100,
        dst_host_srv_count: 60,
        dst_host_same_srv_rate: 0.6,
        dst_host_serror_rate: 0.3,
        dst_host_rerror_rate: 0.2,
        late: false,
    };
    let v = encode(&record(Some("http"), "SF"), &snap, None);
    assert_eq!(v.get_by_name("count"), Some(42.0));
    assert_eq!(v.get_by_name("srv_count"), Some(17.0));
    assert_eq!(v.get_by_name("serror_rate"), Some(0.5));
    assert_eq!(v.get_by_name("srv_serror_rate"), Some(0.1));
    assert_eq!(v.get_by_name("rerror_rate"), Some(0.25));
    assert_eq!(v.get_by_name("same_srv_rate"), Some(0.75));
    assert_eq!(v.get_by_name("diff_srv_rate"), Some(0.25));
    assert_eq!(v.get_by_name("dst_host_count"), Some(100.0));
    assert_eq!(v.get_by_name("dst_host_srv_count"), Some(60.0));
    assert_eq!(v.get_by_name("dst_host_same_srv_rate"), Some(0.6));
    assert_eq!(v.get_by_name("dst_host_serror_rate"), Some(0.3));
    assert_eq!(v.get_by_name("dst_host_rerror_rate"), Some(0.2));
}

#[test]
fn test_content_features_from_extras() {
    let extras = ConnExtras {
        hot_hits: 3,
        http_auth: true,
        ssh_auth_ok: false,
        frag_weirds: 2,
        compromise_hits: 1,
        fallback_service: None,
    };
    let v = encode(&record(Some("http"), "SF"), &WindowSnapshot::default(), Some(&extras));
    assert_eq!(v.get_by_name("hot"), Some(3.0));
    assert_eq!(v.get_by_name("logged_in"), Some(1.0));
    assert_eq!(v.get_by_name("wrong_fragment"), Some(2.0));
    assert_eq!(v.get_by_name("urgent"), Some(0.0));
    assert_eq!(v.get_by_name("num_compromised"), Some(1.0));
    // Without enrichment the content attributes default to zero
    let v = encode(&record(Some("http"), "SF"), &WindowSnapshot::default(), None);
    assert_eq!(v.get_by_name("num_compromised"), Some(0.0));
}

#[test]
fn test_logged_in_needs_established_auth_service() {
    // ssh but the handshake never completed
    let v = encode(&record(Some("ssh"), "S0"), &WindowSnapshot::default(), None);
    assert_eq!(v.get_by_name("logged_in"), Some(0.0));
    // completed but not an auth service
    let v = encode(&record(Some("http"), "SF"), &WindowSnapshot::default(), None);
    assert_eq!(v.get_by_name("logged_in"), Some(0.0));
    // completed auth service
    let v = encode(&record(Some("ssh"), "SF"), &WindowSnapshot::default(), None);
    assert_eq!(v.get_by_name("logged_in"), Some(1.0));
}

#[test]
fn test_fallback_service_fills_unset_service() {
    let extras = ConnExtras {
        fallback_service: Some("dns".into()),
        ..Default::default()
    };
    let v = encode(&record(None, "SF"), &WindowSnapshot::default(), Some(&extras));
    // dns maps to domain, index 0
    assert_eq!(v.get_by_name("service"), Some(0.0));
}

#[test]
fn test_land_flag() {
    let mut rec = record(Some("http"), "SF");
    rec.resp_h = rec.orig_h.clone();
    rec.resp_p = rec.orig_p;
    let v = encode(&rec, &WindowSnapshot::default(), None);
    assert_eq!(v.get_by_name("land"), Some(1.0));
}
