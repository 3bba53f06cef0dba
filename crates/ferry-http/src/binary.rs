//! Binary/text classification of response bodies.

use ferry_core::config::DEFAULT_TEXT_MIME_TYPES;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use mime::Mime;

/// Decides whether a response body must be base64-encoded.
///
/// A body is binary when any header says so: a `Content-Type` that is
/// neither `text/*` nor on the allow-list, or a `Content-Encoding: gzip`.
#[derive(Debug, Clone)]
pub struct MimeClassifier {
    text_types: Vec<String>,
}

impl MimeClassifier {
    /// Create a classifier with the given allow-list of text-safe MIME types.
    pub fn new<I, S>(text_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            text_types: text_types
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether a `Content-Type` value denotes text.
    ///
    /// Parameters are ignored; unparseable values are not text.
    #[must_use]
    pub fn is_text_mime(&self, content_type: &str) -> bool {
        let Ok(mime) = content_type.parse::<Mime>() else {
            return false;
        };
        mime.type_() == mime::TEXT
            || self
                .text_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(mime.essence_str()))
    }

    /// Whether a single header marks the body as binary.
    #[must_use]
    pub fn is_binary_header(&self, name: &HeaderName, value: &HeaderValue) -> bool {
        if *name == CONTENT_TYPE {
            return match value.to_str() {
                Ok(v) => !self.is_text_mime(v),
                Err(_) => true,
            };
        }
        *name == CONTENT_ENCODING && value.as_bytes() == b"gzip"
    }

    /// Whether any header in `headers` marks the body as binary.
    #[must_use]
    pub fn is_binary(&self, headers: &HeaderMap) -> bool {
        headers
            .iter()
            .any(|(name, value)| self.is_binary_header(name, value))
    }
}

impl Default for MimeClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_MIME_TYPES)
    }
}
