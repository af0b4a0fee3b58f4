use crate::types::Port;
use std::str::FromStr;
use thiserror::Error;

/// The error returned when a string cannot be parsed as a `HostUrl`.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("not a URL: {0}")]
pub struct NotAUrl(pub String);

/// A host and port extracted from a URL-like string.
///
/// Recognises an optional case-insensitive `http://` or `https://` scheme prefix, a mandatory
/// host token and an optional `:port` suffix.  The port defaults to 443 for `https` and to 80
/// otherwise.
///
/// # Examples
///
/// ```
/// use hopcheck_core::{HostUrl, Port};
///
/// let url: HostUrl = "https://example.com".parse()?;
/// assert_eq!("example.com", url.host);
/// assert_eq!(Port(443), url.port);
/// # Ok::<(), hopcheck_core::NotAUrl>(())
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HostUrl {
    /// The host name or address.
    pub host: String,
    /// The port.
    pub port: Port,
}

impl FromStr for HostUrl {
    type Err = NotAUrl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = match s.split_once("://") {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, s),
        };
        let https = match scheme {
            Some(scheme) if scheme.eq_ignore_ascii_case("https") => true,
            Some(scheme) if scheme.eq_ignore_ascii_case("http") => false,
            Some(_) => return Err(NotAUrl(s.to_string())),
            None => false,
        };
        let (host, port) = match rest.split_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                (host, Port(port.parse().map_err(|_| NotAUrl(s.to_string()))?))
            }
            Some(_) => return Err(NotAUrl(s.to_string())),
            None => (rest, Port(if https { 443 } else { 80 })),
        };
        if host.is_empty() || host.contains(['/', ':']) || host.contains(char::is_whitespace) {
            return Err(NotAUrl(s.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("example.com", "example.com", 80; "bare host")]
    #[test_case("http://example.com", "example.com", 80; "http default port")]
    #[test_case("https://example.com", "example.com", 443; "https default port")]
    #[test_case("HTTPS://EXAMPLE.COM", "EXAMPLE.COM", 443; "uppercase scheme")]
    #[test_case("example.com:8443", "example.com", 8443; "bare host with port")]
    #[test_case("https://example.com:8443", "example.com", 8443; "https with port")]
    #[test_case("192.168.1.10:3000", "192.168.1.10", 3000; "address with port")]
    fn test_parse(input: &str, host: &str, port: u16) {
        let url = HostUrl::from_str(input).unwrap();
        assert_eq!(host, url.host);
        assert_eq!(Port(port), url.port);
    }

    #[test_case(""; "empty")]
    #[test_case("ftp://example.com"; "unsupported scheme")]
    #[test_case("://example.com"; "missing scheme")]
    #[test_case("example.com:"; "empty port")]
    #[test_case("example.com:abc"; "non numeric port")]
    #[test_case("example.com:99999"; "port too large")]
    #[test_case("http://example.com/path"; "trailing path")]
    #[test_case("exa mple.com"; "whitespace in host")]
    #[test_case("host:80:90"; "multiple ports")]
    fn test_parse_invalid(input: &str) {
        assert!(HostUrl::from_str(input).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = HostUrl::from_str("ftp://example.com").unwrap_err();
        assert_eq!("not a URL: ftp://example.com", err.to_string());
    }
}
