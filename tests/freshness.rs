use std::time::{Duration, SystemTime};

use larder::freshness::{evaluate, Verdict, HEADER_PROBE};

fn response(headers: &str) -> Vec<u8> {
    format!("HTTP/1.1 200 OK\r\n{headers}\r\n\r\nbody").into_bytes()
}

#[test]
fn test_max_age_monotonicity() {
    for n in [1u64, 5, 60, 3600] {
        let entry = response(&format!("Cache-Control: max-age={n}"));
        assert_eq!(
            evaluate(&entry, Duration::from_secs(n - 1)),
            Verdict::Fresh,
            "age {} under max-age={n}",
            n - 1
        );
        assert_eq!(
            evaluate(&entry, Duration::from_secs(n)),
            Verdict::Stale,
            "age {n} at max-age={n}"
        );
        assert_eq!(evaluate(&entry, Duration::from_secs(n + 100)), Verdict::Stale);
    }
}

#[test]
fn test_max_age_zero_always_stale() {
    let entry = response("Cache-Control: max-age=0");
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::Stale);
    assert_eq!(evaluate(&entry, Duration::from_secs(10)), Verdict::Stale);
}

#[test]
fn test_no_store_no_cache_not_cacheable() {
    let entry = response("Cache-Control: no-store");
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::NotCacheable);

    let entry = response("Cache-Control: no-cache");
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::NotCacheable);
}

#[test]
fn test_stored_redirect_never_fresh() {
    let entry = b"HTTP/1.1 301 Moved Permanently\r\nLocation: http://example.com/\r\n\r\n".to_vec();
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::NotCacheable);

    let entry = b"HTTP/1.1 302 Found\r\nLocation: /elsewhere\r\n\r\n".to_vec();
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::NotCacheable);
}

#[test]
fn test_expires_in_future_is_fresh() {
    let expires = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(86_400));
    let entry = response(&format!("Expires: {expires}"));
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::Fresh);
}

#[test]
fn test_expires_in_past_is_stale() {
    let expires = httpdate::fmt_http_date(SystemTime::now() - Duration::from_secs(86_400));
    let entry = response(&format!("Expires: {expires}"));
    assert_eq!(evaluate(&entry, Duration::ZERO), Verdict::Stale);
}

#[test]
fn test_max_age_takes_precedence_over_expires() {
    let expired = httpdate::fmt_http_date(SystemTime::now() - Duration::from_secs(86_400));
    let entry = response(&format!("Cache-Control: max-age=60\r\nExpires: {expired}"));
    assert_eq!(evaluate(&entry, Duration::from_secs(10)), Verdict::Fresh);
}

#[test]
fn test_unparseable_expires_falls_through() {
    let entry = response("Expires: not a date at all");
    assert_eq!(evaluate(&entry, Duration::from_secs(10)), Verdict::Fresh);
}

#[test]
fn test_no_directive_defaults_to_fresh() {
    let entry = response("Content-Type: text/plain");
    assert_eq!(evaluate(&entry, Duration::from_secs(1_000_000)), Verdict::Fresh);
}

#[test]
fn test_directives_beyond_probe_are_ignored() {
    let padding = "a".repeat(HEADER_PROBE);
    let entry = response(&format!("X-Padding: {padding}\r\nCache-Control: max-age=0"));
    assert_eq!(evaluate(&entry, Duration::from_secs(10)), Verdict::Fresh);
}

#[test]
fn test_binary_body_does_not_confuse_header_scan() {
    let mut entry = response("Cache-Control: max-age=60");
    entry.extend_from_slice(&[0x00, 0xff, 0xfe, 0x80]);
    assert_eq!(evaluate(&entry, Duration::from_secs(10)), Verdict::Fresh);
}
