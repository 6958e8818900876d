use crate::head;

#[derive(Debug, Clone)]
pub struct Classification {
    pub is_redirect: bool,
    pub is_cacheable: bool,
    pub content_type: Option<String>,
}

impl Classification {
    pub fn is_html(&self) -> bool {
        let Some(ct) = self.content_type.as_deref() else {
            return false;
        };
        let ct = ct.to_ascii_lowercase();
        ct.contains("text/html") || ct.contains("application/xhtml+xml")
    }
}

/// Inspects a freshly received origin response. Redirects are never
/// cached, and neither is anything the origin marked `no-store`,
/// `no-cache`, or `max-age=0`.
pub fn classify(raw: &[u8]) -> Classification {
    if raw.is_empty() {
        return Classification {
            is_redirect: false,
            is_cacheable: false,
            content_type: None,
        };
    }
    let head = String::from_utf8_lossy(head::head_block(raw));
    let is_redirect = head::is_redirect(&head);
    let content_type = head::header_value(&head, "Content-Type").map(|v| v.to_string());

    let mut is_cacheable = !is_redirect;
    if let Some(cc) = head::header_value(&head, "Cache-Control") {
        if cc.contains("no-store") || cc.contains("no-cache") || head::max_age(cc) == Some(0) {
            is_cacheable = false;
        }
    }

    Classification {
        is_redirect,
        is_cacheable,
        content_type,
    }
}
