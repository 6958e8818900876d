use std::time::{Duration, SystemTime};

use crate::head;

/// The freshness check only reads this much of an entry; the header block
/// sits at the front.
pub const HEADER_PROBE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fresh,
    Stale,
    NotCacheable,
}

/// Decides whether a cached entry may still be served, from the start of
/// the stored response and the entry age. First matching rule wins:
/// stored redirect, `no-store`/`no-cache`, `max-age` vs age, `Expires` vs
/// now. With no directive at all the entry is trusted indefinitely.
pub fn evaluate(prefix: &[u8], age: Duration) -> Verdict {
    let probe = &prefix[..prefix.len().min(HEADER_PROBE)];
    let head = String::from_utf8_lossy(head::head_block(probe));

    if head::is_redirect(&head) {
        return Verdict::NotCacheable;
    }

    if let Some(cc) = head::header_value(&head, "Cache-Control") {
        if cc.contains("no-store") || cc.contains("no-cache") {
            return Verdict::NotCacheable;
        }
        if let Some(secs) = head::max_age(cc) {
            if secs == 0 || age.as_secs() >= secs {
                return Verdict::Stale;
            }
            return Verdict::Fresh;
        }
    }

    if let Some(raw) = head::header_value(&head, "Expires") {
        match httpdate::parse_http_date(raw) {
            Ok(expires) => {
                if SystemTime::now() < expires {
                    return Verdict::Fresh;
                }
                return Verdict::Stale;
            }
            // an unparseable date counts as no directive at all
            Err(_) => log::debug!("ignoring unparseable Expires date: {raw:?}"),
        }
    }

    Verdict::Fresh
}
