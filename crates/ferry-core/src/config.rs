//! Process-wide configuration.
//!
//! [`FerryConfig`] carries every knob that influences request adaptation
//! (payload-version override, binary allow-list, default content type) and
//! the standalone listener (address, prefix, PROXY protocol). It is built once
//! at start-up, either explicitly or from environment variables via
//! [`FerryConfig::from_env`], and then shared read-only by every request.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Env var holding the standalone listener address.
pub const ADDR_ENV: &str = "FERRY_ADDR";
/// Env var holding the mount prefix.
pub const PREFIX_ENV: &str = "FERRY_PREFIX";
/// Env var overriding payload-version detection.
pub const PAYLOAD_VERSION_ENV: &str = "FERRY_PAYLOAD_VERSION";
/// Env var enabling the PROXY protocol decorator.
pub const PROXY_PROTOCOL_ENV: &str = "FERRY_PROXY_PROTOCOL";
/// Env var holding the comma-separated text MIME allow-list.
pub const TEXT_MIME_TYPES_ENV: &str = "FERRY_TEXT_MIME_TYPES";
/// Env var holding the default response content type.
pub const DEFAULT_CONTENT_TYPE_ENV: &str = "FERRY_DEFAULT_CONTENT_TYPE";
/// Env var toggling streaming responses in handler mode.
pub const STREAMING_RESPONSE_ENV: &str = "FERRY_STREAMING_RESPONSE";
/// Env var holding the streaming sink capacity, in frames.
pub const STREAM_BUFFER_FRAMES_ENV: &str = "FERRY_STREAM_BUFFER_FRAMES";

/// Default response content type when a handler never sets one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// MIME types that are text-safe despite not being `text/*`.
pub const DEFAULT_TEXT_MIME_TYPES: [&str; 3] =
    ["image/svg+xml", "application/json", "application/xml"];

/// Ferry configuration.
///
/// # Examples
///
/// ```
/// use ferry_core::FerryConfig;
///
/// let config = FerryConfig::builder().prefix("/api".into()).build();
/// assert_eq!(config.prefix, "/api");
/// assert_eq!(config.default_content_type, "text/plain; charset=utf-8");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FerryConfig {
    /// Bind address for the standalone listener.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub address: String,

    /// Path prefix the application is mounted under.
    #[builder(default = String::from("/"))]
    pub prefix: String,

    /// When set, disables payload-version detection and uses this value verbatim.
    #[builder(default, setter(strip_option))]
    pub payload_version: Option<String>,

    /// Whether accepted connections carry a PROXY protocol preamble.
    #[builder(default = false)]
    pub proxy_protocol: bool,

    /// Non-`text/*` MIME types whose bodies are emitted as plain text.
    #[builder(default = default_text_mime_types())]
    pub text_mime_types: Vec<String>,

    /// Content type applied to responses that never set one.
    #[builder(default = String::from(DEFAULT_CONTENT_TYPE))]
    pub default_content_type: String,

    /// Explicit streaming-response switch. `None` defers to the environment.
    #[builder(default, setter(strip_option))]
    pub streaming_response: Option<bool>,

    /// Capacity of the bounded channel between a streaming producer and consumer.
    #[builder(default = 16)]
    pub stream_buffer_frames: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

fn default_text_mime_types() -> Vec<String> {
    DEFAULT_TEXT_MIME_TYPES
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:8080"),
            prefix: String::from("/"),
            payload_version: None,
            proxy_protocol: false,
            text_mime_types: default_text_mime_types(),
            default_content_type: String::from(DEFAULT_CONTENT_TYPE),
            streaming_response: None,
            stream_buffer_frames: 16,
            log_level: String::from("info"),
        }
    }
}

impl FerryConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FERRY_ADDR` | `0.0.0.0:8080` |
    /// | `FERRY_PREFIX` | `/` |
    /// | `FERRY_PAYLOAD_VERSION` | *(auto-detect)* |
    /// | `FERRY_PROXY_PROTOCOL` | `false` |
    /// | `FERRY_TEXT_MIME_TYPES` | `image/svg+xml,application/json,application/xml` |
    /// | `FERRY_DEFAULT_CONTENT_TYPE` | `text/plain; charset=utf-8` |
    /// | `FERRY_STREAM_BUFFER_FRAMES` | `16` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// `FERRY_STREAMING_RESPONSE` is deliberately not read here: the
    /// dispatcher resolves it when it enters handler mode, and only if
    /// [`FerryConfig::streaming_response`] was left unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup(ADDR_ENV) {
            config.address = v;
        }
        if let Some(v) = lookup(PREFIX_ENV) {
            config.prefix = v;
        }
        if let Some(v) = lookup(PAYLOAD_VERSION_ENV) {
            if !v.is_empty() {
                config.payload_version = Some(v);
            }
        }
        if let Some(v) = lookup(PROXY_PROTOCOL_ENV) {
            config.proxy_protocol = parse_bool(&v);
        }
        if let Some(v) = lookup(TEXT_MIME_TYPES_ENV) {
            config.text_mime_types = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
        }
        if let Some(v) = lookup(DEFAULT_CONTENT_TYPE_ENV) {
            if !v.is_empty() {
                config.default_content_type = v;
            }
        }
        if let Some(v) = lookup(STREAM_BUFFER_FRAMES_ENV) {
            if let Ok(n) = v.parse::<usize>() {
                config.stream_buffer_frames = n.max(1);
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
