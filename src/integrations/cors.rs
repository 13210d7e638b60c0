use axum::http::{HeaderMap, HeaderValue, header};

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Origin allow-list. An empty list, or a request without an `Origin`
/// header (same-origin), is accepted.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin.map(str::trim).filter(|o| !o.is_empty()) {
            None => true,
            Some(_) if self.allowed_origins.is_empty() => true,
            Some(origin) => self.allowed_origins.iter().any(|allowed| allowed == origin),
        }
    }

    pub fn headers_for(&self, origin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match origin.map(str::trim).filter(|o| !o.is_empty()) {
            Some(origin) if self.allows(Some(origin)) => {
                if let Ok(value) = HeaderValue::from_str(origin) {
                    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
                }
            }
            Some(_) => {}
            None => {
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                );
            }
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(vec!["https://site.example".to_string()])
    }

    #[test]
    fn empty_allow_list_accepts_any_origin() {
        let open = CorsPolicy::default();
        assert!(open.allows(Some("https://anything.example")));
        assert!(open.allows(None));
    }

    #[test]
    fn missing_origin_is_treated_as_same_origin() {
        assert!(policy().allows(None));
        assert!(policy().allows(Some("  ")));
    }

    #[test]
    fn rejects_origins_outside_the_list() {
        assert!(policy().allows(Some("https://site.example")));
        assert!(!policy().allows(Some("https://evil.example")));
    }

    #[test]
    fn echoes_allowed_origin_only() {
        let headers = policy().headers_for(Some("https://site.example"));
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
            Some("https://site.example")
        );

        let headers = policy().headers_for(Some("https://evil.example"));
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).and_then(|v| v.to_str().ok()),
            Some(ALLOW_METHODS)
        );
    }
}
