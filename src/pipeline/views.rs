use pingora::http::RequestHeader;

/// A read-only wrapper around Pingora's RequestHeader, used for access logging
pub struct RequestView<'a> {
    inner: &'a RequestHeader,
}

impl<'a> RequestView<'a> {
    pub fn new(request_header: &'a RequestHeader) -> Self {
        Self {
            inner: request_header,
        }
    }

    pub fn method(&self) -> &str {
        self.inner.method.as_str()
    }

    /// The request target as received, path and query included.
    pub fn request_uri(&self) -> &str {
        self.inner
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    /// Get the Host header value. Pingora's HeaderMap is case-insensitive.
    pub fn host(&self) -> Option<&str> {
        self.inner.headers.get("host").and_then(|h| h.to_str().ok())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.inner.headers.get(key).and_then(|h| h.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_fields() {
        let mut request = RequestHeader::build("POST", b"/orders?id=7", None).unwrap();
        request.insert_header("Host", "shop.example").unwrap();
        let view = RequestView::new(&request);

        assert_eq!(view.method(), "POST");
        assert_eq!(view.request_uri(), "/orders?id=7");
        assert_eq!(view.host(), Some("shop.example"));
        assert_eq!(view.header("color"), None);
    }
}
