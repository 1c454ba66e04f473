//! Request parsing and outbound serialization.
//!
//! # Responsibilities
//! - Turn the raw bytes of a single client read into a [`Request`]
//! - Extract the origin host, port and path from an absolute-form target
//! - Compute the request [`Fingerprint`] used as the cache key
//! - Serialize the request back into the HTTP/1.0 form sent upstream
//!
//! # Design Decisions
//! - The client's protocol version is discarded; upstream always sees
//!   `HTTP/1.0` and `Connection: close` so the origin ends the response by
//!   closing the socket
//! - No percent-decoding, header validation or duplicate merging

use thiserror::Error;

use crate::http::fingerprint::Fingerprint;

/// Protocol version advertised upstream.
pub const PROTOCOL_VERSION: &str = "HTTP/1.0";

/// Connection directive advertised upstream.
pub const CONNECTION_DIRECTIVE: &str = "Connection: close";

const DEFAULT_PORT: &str = "80";
const SCHEME_PREFIX: &str = "http://";
const CONNECTION_MARKER: &[u8] = b"Connection:";

/// Why a client request could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("request line is missing the method")]
    MissingMethod,

    #[error("request line is missing the target")]
    MissingTarget,

    #[error("target `{0}` has no host")]
    MissingHost(String),

    #[error("target port `{0}` is not a valid port number")]
    InvalidPort(String),

    #[error("request line {0} is not valid UTF-8")]
    NonUtf8(&'static str),
}

/// A client request, normalized for forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    host: String,
    port: String,
    path: String,
    headers: Vec<Vec<u8>>,
    body: Vec<u8>,
    fingerprint: Fingerprint,
}

impl Request {
    /// Parse the bytes of a single client read.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let request_line = raw.split(|b| *b == b'\n').next().unwrap_or_default();

        let mut tokens = request_line
            .split(|b| b.is_ascii_whitespace())
            .filter(|token| !token.is_empty());
        let method = tokens.next().ok_or(ParseError::MissingMethod)?;
        let target = tokens.next().ok_or(ParseError::MissingTarget)?;
        let method = std::str::from_utf8(method).map_err(|_| ParseError::NonUtf8("method"))?;
        let target = std::str::from_utf8(target).map_err(|_| ParseError::NonUtf8("target"))?;

        let (host, port, path) = split_target(target)?;
        let fingerprint = Fingerprint::new(&host, &port, &path, method);

        let (headers, body) = split_headers(raw);

        Ok(Self {
            method: method.to_string(),
            host,
            port,
            path,
            headers,
            body,
            fingerprint,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header lines forwarded upstream, in client order, as the client sent them.
    pub fn headers(&self) -> &[Vec<u8>] {
        &self.headers
    }

    /// Bytes that followed the header section in the client read.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The `host:port` authority to connect to.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Serialize into the bytes written to the origin.
    ///
    /// ```text
    /// <method> <path> HTTP/1.0
    /// Host: <host>
    /// Connection: close
    /// <header-line>*
    ///
    /// <body>
    /// ```
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = format!(
            "{} {} {}\nHost: {}\n{}\n",
            self.method, self.path, PROTOCOL_VERSION, self.host, CONNECTION_DIRECTIVE
        )
        .into_bytes();
        for header in &self.headers {
            wire.extend_from_slice(header);
            wire.push(b'\n');
        }
        wire.push(b'\n');
        wire.extend_from_slice(&self.body);
        wire
    }
}

/// Split an absolute-form target into host, port and path.
fn split_target(target: &str) -> Result<(String, String, String), ParseError> {
    let target = target.strip_prefix(SCHEME_PREFIX).unwrap_or(target);

    let (authority, path) = match target.split_once('/') {
        Some((authority, rest)) => (authority, format!("/{rest}")),
        None => (target, "/".to_string()),
    };
    let path: String = path.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port),
        None => (authority, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(ParseError::MissingHost(target.to_string()));
    }
    // u16::from_str accepts a leading '+', so check the digits separately.
    if !port.bytes().all(|b| b.is_ascii_digit()) || port.parse::<u16>().is_err() {
        return Err(ParseError::InvalidPort(port.to_string()));
    }

    Ok((host.to_string(), port.to_string(), path))
}

/// Collect header lines and any trailing body bytes.
///
/// The first two lines (request line and the client's own `Host:` line) are
/// skipped, `Connection:` lines are dropped, and the section ends at the first
/// empty line. Kept lines are not decoded.
fn split_headers(raw: &[u8]) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut headers = Vec::new();
    let mut offset = 0;
    let mut index = 0;

    while offset < raw.len() {
        let (line, next) = match raw[offset..].iter().position(|b| *b == b'\n') {
            Some(pos) => (&raw[offset..offset + pos], offset + pos + 1),
            None => (&raw[offset..], raw.len()),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if index >= 1 && line.is_empty() {
            return (headers, raw[next..].to_vec());
        }
        if index >= 2 && !contains(line, CONNECTION_MARKER) {
            headers.push(line.to_vec());
        }

        offset = next;
        index += 1;
    }

    (headers, Vec::new())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_request() {
        let raw = b"GET http://example.com/page HTTP/1.0\nHost: example.com\nConnection: keep-alive\n\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.host(), "example.com");
        assert_eq!(request.port(), "80");
        assert_eq!(request.path(), "/page");
        assert!(request.headers().is_empty());
        assert!(request.body().is_empty());
        assert_eq!(
            request.fingerprint(),
            Fingerprint::new("example.com", "80", "/page", "GET")
        );
        assert_eq!(request.fingerprint().to_string(), "138868228");

        let wire = String::from_utf8(request.to_wire()).unwrap();
        assert!(wire.starts_with("GET /page HTTP/1.0\nHost: example.com\nConnection: close\n"));
        assert_eq!(wire, "GET /page HTTP/1.0\nHost: example.com\nConnection: close\n\n");
    }

    #[test]
    fn explicit_port_and_nested_path() {
        let request = Request::parse(b"POST http://localhost:8080/api/v1/items?id=3 HTTP/1.1\n").unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.host(), "localhost");
        assert_eq!(request.port(), "8080");
        assert_eq!(request.path(), "/api/v1/items?id=3");
        assert_eq!(request.authority(), "localhost:8080");
    }

    #[test]
    fn target_without_path_defaults_to_root() {
        let request = Request::parse(b"GET http://example.com HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(request.host(), "example.com");
        assert_eq!(request.path(), "/");

        let request = Request::parse(b"GET http://example.com:81\n").unwrap();
        assert_eq!(request.port(), "81");
        assert_eq!(request.path(), "/");
    }

    #[test]
    fn scheme_prefix_is_optional() {
        let request = Request::parse(b"GET example.com/a HTTP/1.0\n").unwrap();
        assert_eq!(request.host(), "example.com");
        assert_eq!(request.path(), "/a");
    }

    #[test]
    fn version_token_is_ignored() {
        let a = Request::parse(b"GET http://example.com/ HTTP/1.1\n").unwrap();
        let b = Request::parse(b"GET http://example.com/ HTTP/1.0\n").unwrap();
        let c = Request::parse(b"GET http://example.com/\n").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(b.fingerprint(), c.fingerprint());
    }

    #[test]
    fn keeps_headers_in_order_and_drops_connection() {
        let raw = b"GET http://example.com/ HTTP/1.1\r\n\
Host: example.com\r\n\
User-Agent: test\r\n\
Connection: keep-alive\r\n\
Proxy-Connection: keep-alive\r\n\
Accept: */*\r\n\
\r\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.headers(), [b"User-Agent: test".to_vec(), b"Accept: */*".to_vec()]);

        let wire = String::from_utf8(request.to_wire()).unwrap();
        assert_eq!(
            wire,
            "GET / HTTP/1.0\nHost: example.com\nConnection: close\nUser-Agent: test\nAccept: */*\n\n"
        );
    }

    #[test]
    fn body_after_blank_line_is_forwarded() {
        let raw = b"POST http://example.com/form HTTP/1.0\nHost: example.com\nContent-Length: 3\n\na=1";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.headers(), [b"Content-Length: 3".to_vec()]);
        assert_eq!(request.body(), b"a=1");
        assert!(request.to_wire().ends_with(b"Content-Length: 3\n\na=1"));
    }

    #[test]
    fn non_utf8_header_bytes_are_forwarded_unchanged() {
        let raw = b"GET http://example.com/ HTTP/1.0\nHost: example.com\nCookie: a=\xe9\xff\nAccept: */*\n\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.headers(), [b"Cookie: a=\xe9\xff".to_vec(), b"Accept: */*".to_vec()]);

        let wire = request.to_wire();
        assert!(wire.ends_with(b"Connection: close\nCookie: a=\xe9\xff\nAccept: */*\n\n"));
    }

    #[test]
    fn non_utf8_connection_line_is_still_dropped() {
        let raw = b"GET http://example.com/ HTTP/1.0\nHost: example.com\nConnection: \xff\nX-A: 1\n\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.headers(), [b"X-A: 1".to_vec()]);
    }

    #[test]
    fn non_utf8_request_line_is_rejected() {
        assert_eq!(
            Request::parse(b"G\xffT http://example.com/ HTTP/1.0\n"),
            Err(ParseError::NonUtf8("method"))
        );
        assert_eq!(
            Request::parse(b"GET http://example.com/\xe9 HTTP/1.0\n"),
            Err(ParseError::NonUtf8("target"))
        );
    }

    #[test]
    fn request_line_only_has_no_headers() {
        let request = Request::parse(b"GET http://example.com/x HTTP/1.0").unwrap();
        assert!(request.headers().is_empty());
        assert_eq!(request.path(), "/x");
    }

    #[test]
    fn rejects_missing_tokens() {
        assert_eq!(Request::parse(b""), Err(ParseError::MissingMethod));
        assert_eq!(Request::parse(b"\n\n"), Err(ParseError::MissingMethod));
        assert_eq!(Request::parse(b"GARBAGE\n"), Err(ParseError::MissingTarget));
        assert_eq!(
            Request::parse(b"GET\nhttp://example.com/ HTTP/1.0\n"),
            Err(ParseError::MissingTarget)
        );
    }

    #[test]
    fn rejects_unrecognizable_targets() {
        assert!(matches!(
            Request::parse(b"GET /index.html HTTP/1.0\n"),
            Err(ParseError::MissingHost(_))
        ));
        assert!(matches!(
            Request::parse(b"GET http://:80/ HTTP/1.0\n"),
            Err(ParseError::MissingHost(_))
        ));
        assert_eq!(
            Request::parse(b"GET http://example.com:/ HTTP/1.0\n"),
            Err(ParseError::InvalidPort(String::new()))
        );
        assert_eq!(
            Request::parse(b"GET http://example.com:http/ HTTP/1.0\n"),
            Err(ParseError::InvalidPort("http".into()))
        );
        assert_eq!(
            Request::parse(b"GET http://example.com:70000/ HTTP/1.0\n"),
            Err(ParseError::InvalidPort("70000".into()))
        );
    }
}
