use std::fmt;

use http::Uri;

use crate::error::{BackendError, Result};

const DEFAULT_WEIGHT: u32 = 1;

/// One routable upstream: a name used for tagging, a target URL and a selection weight.
///
/// Built once from configuration and never mutated afterwards. The path of the
/// target replaces the path of every request forwarded to it, so a backend may be
/// bound to a sub-path of its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    name: String,
    target: Uri,
    weight: u32,
}

impl BackendSpec {
    /// Validates raw configuration strings and builds a backend.
    ///
    /// An empty `weight` means the default weight of 1. Anything else must be a
    /// positive integer, otherwise the backend is rejected.
    pub fn parse(name: &str, location: &str, weight: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(BackendError::InvalidName);
        }

        let target = parse_target(location)?;
        let weight = parse_weight(weight)?;

        Ok(Self {
            name: name.to_lowercase(),
            target,
            weight,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Uri {
        &self.target
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn scheme(&self) -> &str {
        // parse_target guarantees a scheme
        self.target.scheme_str().unwrap_or_default()
    }

    /// The `host[:port]` part of the target, as configured.
    pub fn authority(&self) -> &str {
        self.target
            .authority()
            .map(|a| a.as_str())
            .unwrap_or_default()
    }

    pub fn host(&self) -> &str {
        self.target.host().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.target.path()
    }

    pub fn is_tls(&self) -> bool {
        self.scheme().eq_ignore_ascii_case("https")
    }

    pub fn port(&self) -> u16 {
        self.target
            .port_u16()
            .unwrap_or(if self.is_tls() { 443 } else { 80 })
    }

    /// Socket address to dial, with the scheme's default port filled in.
    pub fn peer_address(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }

    /// Host name for SNI; IPv6 literals lose their brackets.
    pub fn sni(&self) -> String {
        self.host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string()
    }
}

impl fmt::Display for BackendSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "backend{{name: {}, url: {}, weight: {}}}",
            self.name, self.target, self.weight
        )
    }
}

fn parse_target(location: &str) -> Result<Uri> {
    // "http://" and "http:///path" are rejected by the uri grammar before the
    // host can be inspected
    if let Some((scheme, rest)) = location.split_once("://")
        && is_scheme(scheme)
        && (rest.is_empty() || rest.starts_with('/'))
    {
        return Err(BackendError::InvalidUrl("host required".to_string()));
    }

    let target: Uri = location
        .parse()
        .map_err(|e: http::uri::InvalidUri| BackendError::InvalidUrl(e.to_string()))?;

    if target.scheme().is_none() {
        return Err(BackendError::InvalidUrl("scheme required".to_string()));
    }

    if target.host().is_none_or(str::is_empty) {
        return Err(BackendError::InvalidUrl("host required".to_string()));
    }

    // the uri grammar accepts any digits, a dialable port must fit in u16
    if target.port().is_some() && target.port_u16().is_none() {
        return Err(BackendError::InvalidUrl("invalid port".to_string()));
    }

    Ok(target)
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn parse_weight(weight: &str) -> Result<u32> {
    if weight.is_empty() {
        return Ok(DEFAULT_WEIGHT);
    }

    match weight.parse::<u32>() {
        Ok(w) if w >= 1 => Ok(w),
        _ => Err(BackendError::InvalidWeight(weight.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_backend() {
        let backend = BackendSpec::parse("blue", "http://host:1234/path", "5").unwrap();
        assert_eq!(backend.name(), "blue");
        assert_eq!(backend.scheme(), "http");
        assert_eq!(backend.authority(), "host:1234");
        assert_eq!(backend.path(), "/path");
        assert_eq!(backend.weight(), 5);
    }

    #[test]
    fn test_name_is_lowercased() {
        let backend = BackendSpec::parse("GREEN", "http://h", "").unwrap();
        assert_eq!(backend.name(), "green");
    }

    #[test]
    fn test_empty_weight_defaults_to_one() {
        let backend = BackendSpec::parse("x", "http://h", "").unwrap();
        assert_eq!(backend.weight(), 1);
    }

    #[test]
    fn test_malformed_weights_rejected() {
        for weight in ["abc", "0", "-3", "1.5", " 2"] {
            assert_eq!(
                BackendSpec::parse("x", "http://h", weight),
                Err(BackendError::InvalidWeight(weight.to_string())),
                "weight {:?} should be rejected",
                weight
            );
        }
    }

    #[test]
    fn test_missing_scheme() {
        let err = BackendSpec::parse("x", "not-a-url-no-scheme", "1").unwrap_err();
        assert_eq!(err, BackendError::InvalidUrl("scheme required".to_string()));

        let err = BackendSpec::parse("x", "/just/a/path", "1").unwrap_err();
        assert_eq!(err, BackendError::InvalidUrl("scheme required".to_string()));
    }

    #[test]
    fn test_missing_host() {
        for location in ["http://", "http:///svc"] {
            let err = BackendSpec::parse("x", location, "1").unwrap_err();
            assert_eq!(err, BackendError::InvalidUrl("host required".to_string()));
        }
    }

    #[test]
    fn test_scheme_check_ignores_later_separator() {
        let err = BackendSpec::parse("x", "/path?u=http:///x", "1").unwrap_err();
        assert_eq!(err, BackendError::InvalidUrl("scheme required".to_string()));
    }

    #[test]
    fn test_out_of_range_port_rejected() {
        let err = BackendSpec::parse("x", "http://127.0.0.1:99999/", "1").unwrap_err();
        assert_eq!(err, BackendError::InvalidUrl("invalid port".to_string()));

        let backend = BackendSpec::parse("x", "http://127.0.0.1:65535/", "1").unwrap();
        assert_eq!(backend.port(), 65535);
    }

    #[test]
    fn test_unparsable_url() {
        let err = BackendSpec::parse("x", "http://exa mple.com", "1").unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            BackendSpec::parse("", "http://h", "1"),
            Err(BackendError::InvalidName)
        );
    }

    #[test]
    fn test_peer_address_defaults_port() {
        let plain = BackendSpec::parse("a", "http://svc.internal/x", "").unwrap();
        assert_eq!(plain.peer_address(), "svc.internal:80");
        assert!(!plain.is_tls());

        let tls = BackendSpec::parse("b", "https://svc.internal", "").unwrap();
        assert_eq!(tls.peer_address(), "svc.internal:443");
        assert!(tls.is_tls());
        assert_eq!(tls.sni(), "svc.internal");

        let explicit = BackendSpec::parse("c", "http://10.0.0.1:9000", "").unwrap();
        assert_eq!(explicit.peer_address(), "10.0.0.1:9000");
    }

    #[test]
    fn test_ipv6_sni_strips_brackets() {
        let backend = BackendSpec::parse("v6", "https://[::1]:8443/", "").unwrap();
        assert_eq!(backend.peer_address(), "[::1]:8443");
        assert_eq!(backend.sni(), "::1");
    }

    #[test]
    fn test_display() {
        let backend = BackendSpec::parse("blue", "http://host:1234/path", "5").unwrap();
        assert_eq!(
            backend.to_string(),
            "backend{name: blue, url: http://host:1234/path, weight: 5}"
        );
    }
}
