//! Outbound envelopes.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use ferry_core::FerryResult;
use serde::{Deserialize, Serialize};

use crate::serde_ext::nullable;

/// Response envelope returned to the serverless host for buffered invocations.
///
/// `multi_value_headers` is authoritative; `headers` mirrors the first value
/// of every key so that hosts reading either map see the same names.
/// `cookies` is `None` for REST API responses, where its presence would
/// break deserialization on the gateway side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status_code: u16,
    /// First value of every header.
    #[serde(default, deserialize_with = "nullable")]
    pub headers: BTreeMap<String, String>,
    /// All header values.
    #[serde(default, deserialize_with = "nullable")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    /// `Set-Cookie` values, for HTTP API responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,
    /// Response body, base64-encoded when `is_base64_encoded` is set.
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    /// Whether `body` is base64-encoded.
    #[serde(default, deserialize_with = "nullable")]
    pub is_base64_encoded: bool,
}

impl ResponseEnvelope {
    /// Decode the body into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::InvalidBodyEncoding`](ferry_core::FerryError::InvalidBodyEncoding)
    /// if the body is flagged as base64 but does not decode.
    pub fn body_bytes(&self) -> FerryResult<Bytes> {
        if self.is_base64_encoded {
            Ok(Bytes::from(STANDARD.decode(self.body.as_bytes())?))
        } else {
            Ok(Bytes::from(self.body.clone()))
        }
    }

    /// Replay the envelope as a live HTTP response.
    ///
    /// Headers come from `multi_value_headers` (or `headers` if that map is
    /// empty). Cookies not already present as `Set-Cookie` values are
    /// appended as `Set-Cookie` headers.
    pub fn into_http_response(self) -> FerryResult<http::Response<Bytes>> {
        let body = self.body_bytes()?;
        let mut builder = http::Response::builder().status(self.status_code);

        let mut set_cookies: Vec<&str> = Vec::new();
        if self.multi_value_headers.is_empty() {
            for (name, value) in &self.headers {
                if name.eq_ignore_ascii_case("set-cookie") {
                    set_cookies.push(value);
                }
                builder = builder.header(name.as_str(), value.as_str());
            }
        } else {
            for (name, values) in &self.multi_value_headers {
                for value in values {
                    if name.eq_ignore_ascii_case("set-cookie") {
                        set_cookies.push(value);
                    }
                    builder = builder.header(name.as_str(), value.as_str());
                }
            }
        }

        for cookie in self.cookies.iter().flatten() {
            if !set_cookies.contains(&cookie.as_str()) {
                builder = builder.header(http::header::SET_COOKIE, cookie.as_str());
            }
        }

        Ok(builder.body(body)?)
    }
}

/// Metadata prelude of a streaming response.
///
/// The body is delivered out-of-band through the stream, so only status,
/// headers and cookies are carried here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// HTTP status code.
    pub status_code: u16,
    /// Headers; repeated values are comma-joined. `Set-Cookie` is excluded.
    #[serde(default, deserialize_with = "nullable")]
    pub headers: BTreeMap<String, String>,
    /// `Set-Cookie` values.
    #[serde(default, deserialize_with = "nullable")]
    pub cookies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"statusCode":200,"headers":{"Content-Type":"text/plain"},"multiValueHeaders":{"Content-Type":["text/plain"]},"cookies":["foo=bar","bar=baz"],"body":"Hello XXX","isBase64Encoded":false}"#;
    const BASE64: &str = r#"{"statusCode":200,"headers":{"Content-Type":"text/plain"},"multiValueHeaders":{"Content-Type":["text/plain"]},"cookies":["foo=bar","bar=baz"],"body":"SGVsbG8gWFhY","isBase64Encoded":true}"#;

    #[test]
    fn test_should_replay_plain_envelope() {
        let envelope: ResponseEnvelope = serde_json::from_str(PLAIN).unwrap();
        let resp = envelope.into_http_response().unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/plain");
        let cookies: Vec<_> = resp
            .headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies, vec!["foo=bar", "bar=baz"]);
        assert_eq!(resp.body().as_ref(), b"Hello XXX");
    }

    #[test]
    fn test_should_replay_base64_envelope() {
        let envelope: ResponseEnvelope = serde_json::from_str(BASE64).unwrap();
        let resp = envelope.into_http_response().unwrap();
        assert_eq!(resp.body().as_ref(), b"Hello XXX");
    }

    #[test]
    fn test_should_not_duplicate_cookies_already_in_headers() {
        let mut envelope = ResponseEnvelope {
            status_code: 200,
            cookies: Some(vec!["a=1".to_owned()]),
            ..ResponseEnvelope::default()
        };
        envelope
            .multi_value_headers
            .insert("Set-Cookie".to_owned(), vec!["a=1".to_owned()]);
        let resp = envelope.into_http_response().unwrap();
        assert_eq!(resp.headers().get_all("set-cookie").iter().count(), 1);
    }

    #[test]
    fn test_should_reject_invalid_base64_body() {
        let envelope = ResponseEnvelope {
            status_code: 200,
            body: "!!!".to_owned(),
            is_base64_encoded: true,
            ..ResponseEnvelope::default()
        };
        assert!(envelope.into_http_response().is_err());
    }

    #[test]
    fn test_should_skip_absent_cookies_when_serializing() {
        let envelope = ResponseEnvelope {
            status_code: 204,
            ..ResponseEnvelope::default()
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("cookies").is_none());
        assert_eq!(json["statusCode"], 204);
        assert_eq!(json["isBase64Encoded"], false);
    }

    #[test]
    fn test_should_serialize_metadata_in_camel_case() {
        let meta = ResponseMetadata {
            status_code: 200,
            headers: BTreeMap::from([("Content-Type".to_owned(), "text/event-stream".to_owned())]),
            cookies: vec![],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["headers"]["Content-Type"], "text/event-stream");
    }
}
