//! Envelope to canonical request translation.
//!
//! [`RequestTranslator`] detects the variant of a raw event and hands it to
//! exactly one typed translator ([`from_v1`] or [`from_v2`]). Both end in
//! [`validate`], so a [`CanonicalRequest`] always has a method, a non-empty
//! path and a parseable URL.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use ferry_core::{FerryError, FerryResult, PayloadVersion};
use ferry_model::{RequestV1, RequestV2};
use http::header::{COOKIE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tracing::warn;

use crate::body::RequestBody;
use crate::detect::PayloadDetector;
use crate::headers::value_string;

/// Name of the synthetic header recording which envelope variant produced
/// a translated request. Its value is [`PayloadVersion::label`].
pub const PAYLOAD_VERSION_HEADER: &str = "x-ferry-payload-version";

/// The HTTP request handed to the application.
///
/// Always carries a [`RequestMeta`] extension.
pub type CanonicalRequest = http::Request<RequestBody>;

/// Characters escaped when turning a decoded v1 path back into a URL path.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// HTTP protocol version as a major/minor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl Protocol {
    /// `HTTP/1.1`, assumed for v1 envelopes.
    pub const HTTP_11: Self = Self { major: 1, minor: 1 };

    /// Create a protocol pair.
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Closest [`http::Version`]. Unknown pairs map to `HTTP/1.1`.
    #[must_use]
    pub fn to_version(self) -> Version {
        match (self.major, self.minor) {
            (0, 9) => Version::HTTP_09,
            (1, 0) => Version::HTTP_10,
            (2, _) => Version::HTTP_2,
            (3, _) => Version::HTTP_3,
            _ => Version::HTTP_11,
        }
    }

    /// Protocol pair of an [`http::Version`].
    #[must_use]
    pub fn from_version(version: Version) -> Self {
        match version {
            Version::HTTP_09 => Self::new(0, 9),
            Version::HTTP_10 => Self::new(1, 0),
            Version::HTTP_2 => Self::new(2, 0),
            Version::HTTP_3 => Self::new(3, 0),
            _ => Self::HTTP_11,
        }
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Connection-level facts that do not fit in [`http::Request`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Value of the `Host` header, removed from the header map.
    pub host: String,
    /// Client address (`sourceIp` for envelopes, peer `ip:port` for live traffic).
    pub remote_addr: String,
    /// Protocol the client spoke.
    pub protocol: Protocol,
    /// Body length in bytes (declared `Content-Length` for live traffic).
    pub content_length: u64,
    /// Envelope variant, `None` for live traffic.
    pub payload_version: Option<PayloadVersion>,
}

impl RequestMeta {
    /// Metadata attached to `req`, if any.
    #[must_use]
    pub fn of<B>(req: &http::Request<B>) -> Option<&Self> {
        req.extensions().get::<Self>()
    }
}

/// Detects the variant of an event and translates it.
#[derive(Debug, Clone, Default)]
pub struct RequestTranslator {
    detector: PayloadDetector,
}

impl RequestTranslator {
    /// Create a translator around `detector`.
    #[must_use]
    pub fn new(detector: PayloadDetector) -> Self {
        Self { detector }
    }

    /// Translate a raw event into a validated [`CanonicalRequest`].
    pub fn translate(&self, event: &[u8]) -> FerryResult<CanonicalRequest> {
        match self.detector.detect(event)? {
            version @ (PayloadVersion::RestV1 | PayloadVersion::HttpV1) => {
                from_v1(serde_json::from_slice(event)?, version)
            }
            PayloadVersion::HttpV2 => from_v2(serde_json::from_slice(event)?),
        }
    }
}

/// Translate a REST-v1 or HTTP-v1 envelope.
///
/// The multi-value maps are authoritative; the single-value maps are only
/// used when their multi-value twin is empty. The path arrives decoded and
/// is re-escaped; query keys are emitted in sorted order.
pub fn from_v1(req: RequestV1, version: PayloadVersion) -> FerryResult<CanonicalRequest> {
    let mut headers = HeaderMap::new();
    if req.multi_value_headers.is_empty() {
        for (name, value) in &req.headers {
            append_header(&mut headers, name, value);
        }
    } else {
        for (name, values) in &req.multi_value_headers {
            for value in values {
                append_header(&mut headers, name, value);
            }
        }
    }

    let mut uri = utf8_percent_encode(&req.path, PATH_ESCAPE).to_string();
    let query = encode_query(
        &req.multi_value_query_string_parameters,
        &req.query_string_parameters,
    );
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query);
    }

    let body = decode_body(&req.body, req.is_base64_encoded)?;
    let remote_addr = req
        .request_context
        .source_ip()
        .unwrap_or_default()
        .to_owned();

    build(Parts {
        method: &req.http_method,
        uri,
        headers,
        remote_addr,
        protocol: Protocol::HTTP_11,
        body,
        version,
    })
}

/// Translate an HTTP-v2 envelope.
///
/// `rawPath` and `rawQueryString` are used verbatim; the cookie list is
/// folded into a single `Cookie` header.
pub fn from_v2(req: RequestV2) -> FerryResult<CanonicalRequest> {
    let mut headers = HeaderMap::new();
    for (name, value) in &req.headers {
        append_header(&mut headers, name, value);
    }
    if !req.cookies.is_empty() {
        append_header(&mut headers, COOKIE.as_str(), &req.cookies.join("; "));
    }

    let mut uri = req.raw_path;
    if !req.raw_query_string.is_empty() {
        uri.push('?');
        uri.push_str(&req.raw_query_string);
    }

    let body = decode_body(&req.body, req.is_base64_encoded)?;
    let http_ctx = req.request_context.http;
    let (major, minor) = parse_http_protocol(&http_ctx.protocol);

    build(Parts {
        method: &http_ctx.method,
        uri,
        headers,
        remote_addr: http_ctx.source_ip,
        protocol: Protocol::new(major, minor),
        body,
        version: PayloadVersion::HttpV2,
    })
}

/// Validate a method and URL.
///
/// Checks run in order: empty method, unparseable method, empty path,
/// unparseable URL. The first failure is returned.
pub fn validate(method: &str, uri: &str) -> FerryResult<(Method, Uri)> {
    if method.is_empty() {
        return Err(FerryError::validation("http method is empty"));
    }
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| FerryError::validation(format!("invalid http method: {method}")))?;

    let path = uri.split_once('?').map_or(uri, |(path, _)| path);
    if path.is_empty() {
        return Err(FerryError::validation("url path is empty"));
    }
    let parsed = uri
        .parse::<Uri>()
        .map_err(|e| FerryError::validation(format!("invalid url {uri}: {e}")))?;
    if parsed.path().is_empty() {
        return Err(FerryError::validation("url path is empty"));
    }
    Ok((method, parsed))
}

/// Parse a protocol string such as `"HTTP/1.1"` into `(major, minor)`.
///
/// Only `HTTP/1.0`, `HTTP/1.1` and anything starting with `HTTP/2` are
/// recognized; the rest yields `(0, 0)`.
#[must_use]
pub fn parse_http_protocol(protocol: &str) -> (u8, u8) {
    match protocol {
        "HTTP/1.0" => (1, 0),
        "HTTP/1.1" => (1, 1),
        p if p.starts_with("HTTP/2") => (2, 0),
        _ => (0, 0),
    }
}

struct Parts<'a> {
    method: &'a str,
    uri: String,
    headers: HeaderMap,
    remote_addr: String,
    protocol: Protocol,
    body: Bytes,
    version: PayloadVersion,
}

fn build(parts: Parts<'_>) -> FerryResult<CanonicalRequest> {
    let (method, uri) = validate(parts.method, &parts.uri)?;
    let mut headers = parts.headers;
    let host = headers
        .remove(HOST)
        .map(|v| value_string(&v))
        .unwrap_or_default();
    headers.insert(
        PAYLOAD_VERSION_HEADER,
        HeaderValue::from_static(parts.version.label()),
    );

    let meta = RequestMeta {
        host,
        remote_addr: parts.remote_addr,
        protocol: parts.protocol,
        content_length: parts.body.len() as u64,
        payload_version: Some(parts.version),
    };

    let mut request = http::Request::builder()
        .method(method)
        .uri(uri)
        .version(parts.protocol.to_version())
        .body(RequestBody::from_bytes(parts.body))?;
    *request.headers_mut() = headers;
    request.extensions_mut().insert(meta);
    Ok(request)
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let name = match HeaderName::from_bytes(name.as_bytes()) {
        Ok(name) => name,
        Err(e) => {
            warn!(header = %name, error = %e, "skipping invalid header name");
            return;
        }
    };
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.append(name, value);
        }
        Err(e) => warn!(header = %name, error = %e, "skipping invalid header value"),
    }
}

fn encode_query(
    multi: &BTreeMap<String, Vec<String>>,
    single: &BTreeMap<String, String>,
) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if multi.is_empty() {
        for (key, value) in single {
            serializer.append_pair(key, value);
        }
    } else {
        for (key, values) in multi {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
    }
    serializer.finish()
}

fn decode_body(body: &str, is_base64_encoded: bool) -> FerryResult<Bytes> {
    if is_base64_encoded {
        Ok(Bytes::from(STANDARD.decode(body.as_bytes())?))
    } else {
        Ok(Bytes::copy_from_slice(body.as_bytes()))
    }
}
