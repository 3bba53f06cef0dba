//! Buffered response capture.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{Bytes, BytesMut};
use ferry_core::config::DEFAULT_CONTENT_TYPE;
use ferry_core::{ApiType, FerryConfig, FerryError, FerryResult};
use ferry_model::ResponseEnvelope;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use tracing::warn;

use crate::binary::MimeClassifier;
use crate::headers::{canonical_header_key, value_string};

/// Process-wide settings consulted when finishing a capture.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Applied when the handler never sets `Content-Type`.
    pub default_content_type: HeaderValue,
    /// Decides whether the body is base64-encoded.
    pub classifier: MimeClassifier,
}

impl CaptureConfig {
    /// Derive capture settings from the process configuration.
    ///
    /// An unusable default content type falls back to
    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn from_config(config: &FerryConfig) -> Self {
        let default_content_type = HeaderValue::from_str(&config.default_content_type)
            .unwrap_or_else(|e| {
                warn!(
                    value = %config.default_content_type,
                    error = %e,
                    "invalid default content type, using text/plain"
                );
                HeaderValue::from_static(DEFAULT_CONTENT_TYPE)
            });
        Self {
            default_content_type,
            classifier: MimeClassifier::new(&config.text_mime_types),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            classifier: MimeClassifier::default(),
        }
    }
}

/// Accumulates a handler's output into a [`ResponseEnvelope`].
///
/// Status defaults to `200 OK`. The body is buffered in full and
/// classified only once, in [`ResponseCapture::finish`].
#[derive(Debug)]
pub struct ResponseCapture {
    status: StatusCode,
    headers: HeaderMap,
    buffer: BytesMut,
    api_type: ApiType,
    config: Arc<CaptureConfig>,
}

impl ResponseCapture {
    /// Create an empty capture for an event of the given gateway flavour.
    #[must_use]
    pub fn new(api_type: ApiType, config: Arc<CaptureConfig>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buffer: BytesMut::new(),
            api_type,
            config,
        }
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Response headers set so far.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Current status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Append body bytes. Always accepts the whole slice.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.buffer.extend_from_slice(data);
        data.len()
    }

    /// Drive a handler response into the capture and finish it.
    pub async fn record<B>(mut self, response: http::Response<B>) -> FerryResult<ResponseEnvelope>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let (parts, mut body) = response.into_parts();
        self.set_status(parts.status);
        for (name, value) in &parts.headers {
            self.headers.append(name, value.clone());
        }
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| FerryError::Body(e.to_string()))?;
            if let Ok(data) = frame.into_data() {
                self.write(&data);
            }
        }
        Ok(self.finish())
    }

    /// Produce the outbound envelope.
    #[must_use]
    pub fn finish(mut self) -> ResponseEnvelope {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, self.config.default_content_type.clone());
        }
        let is_binary = self.config.classifier.is_binary(&self.headers);

        let mut headers = BTreeMap::new();
        let mut multi_value_headers = BTreeMap::new();
        for name in self.headers.keys() {
            let values: Vec<String> = self
                .headers
                .get_all(name)
                .iter()
                .map(value_string)
                .collect();
            let key = canonical_header_key(name.as_str());
            if let Some(first) = values.first() {
                headers.insert(key.clone(), first.clone());
            }
            multi_value_headers.insert(key, values);
        }

        let cookies: Vec<String> = self
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .map(value_string)
            .collect();
        let cookies = match self.api_type {
            ApiType::Http if !cookies.is_empty() => Some(cookies),
            _ => None,
        };

        let buffer = self.buffer.freeze();
        let (body, is_base64_encoded) = if is_binary {
            (STANDARD.encode(&buffer), true)
        } else {
            match String::from_utf8(buffer.to_vec()) {
                Ok(text) => (text, false),
                Err(_) => (STANDARD.encode(&buffer), true),
            }
        };

        ResponseEnvelope {
            status_code: self.status.as_u16(),
            headers,
            multi_value_headers,
            cookies,
            body,
            is_base64_encoded,
        }
    }
}
