// Helpers for picking apart the head of a raw HTTP response. A response
// with no blank-line separator is treated as all head.

pub fn head_block(raw: &[u8]) -> &[u8] {
    match raw.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

pub fn body_offset(raw: &[u8]) -> Option<usize> {
    raw.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|idx| idx + 4)
}

pub fn status_code(head: &str) -> Option<u16> {
    let line = head.split("\r\n").next()?;
    line.split_whitespace().nth(1)?.parse().ok()
}

pub fn is_redirect(head: &str) -> bool {
    matches!(status_code(head), Some(301 | 302))
}

pub fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    for line in head.split("\r\n").skip(1) {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim());
            }
        }
    }
    None
}

pub fn max_age(cache_control: &str) -> Option<u64> {
    for part in cache_control.split(',') {
        let part = part.trim();
        if let Some(raw) = part.strip_prefix("max-age=") {
            if let Ok(secs) = raw.parse::<u64>() {
                return Some(secs);
            }
        }
    }
    None
}
