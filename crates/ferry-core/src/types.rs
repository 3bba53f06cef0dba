//! Discriminant types shared across Ferry crates.

use std::fmt;

use crate::error::{FerryError, FerryResult};

/// Envelope variant of a proxy-integration event.
///
/// Resolved once per event from the `version` field (or a configured
/// override) and then used to pick exactly one typed translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadVersion {
    /// REST API proxy integration; the event carries no `version` field.
    RestV1,
    /// HTTP API proxy integration, payload format `1.0`.
    HttpV1,
    /// HTTP API proxy integration, payload format `2.0`.
    HttpV2,
}

impl PayloadVersion {
    /// Parse a `version` discriminant.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::UnsupportedVersion`] for anything other than
    /// `""`, `"1.0"` or `"2.0"`.
    pub fn parse(version: &str) -> FerryResult<Self> {
        match version {
            "" => Ok(Self::RestV1),
            "1.0" => Ok(Self::HttpV1),
            "2.0" => Ok(Self::HttpV2),
            other => Err(FerryError::UnsupportedVersion(other.to_owned())),
        }
    }

    /// The wire value of the `version` field (`""` for REST).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RestV1 => "",
            Self::HttpV1 => "1.0",
            Self::HttpV2 => "2.0",
        }
    }

    /// Value written into the synthetic payload-version request header.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::RestV1 => "rest-v1",
            Self::HttpV1 => "http-v1",
            Self::HttpV2 => "http-v2",
        }
    }
}

impl fmt::Display for PayloadVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gateway flavour that produced an event.
///
/// Only used to decide whether the outbound envelope may carry a
/// first-class `cookies` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApiType {
    /// REST API. Responses must not carry a `cookies` field.
    Rest,
    /// HTTP API (payload `1.0` or `2.0`).
    #[default]
    Http,
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => f.write_str("REST"),
            Self::Http => f.write_str("HTTP"),
        }
    }
}

/// How the process was launched, derived once from environment probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeMode {
    /// Running as the function handler of a managed serverless runtime.
    ServerlessHandler,
    /// Running inside a managed serverless runtime, but not as the handler.
    ServerlessExtension,
    /// Running as a plain network server.
    StandaloneServer,
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerlessHandler => f.write_str("serverless-handler"),
            Self::ServerlessExtension => f.write_str("serverless-extension"),
            Self::StandaloneServer => f.write_str("standalone-server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_supported_versions() {
        assert_eq!(PayloadVersion::parse("").unwrap(), PayloadVersion::RestV1);
        assert_eq!(PayloadVersion::parse("1.0").unwrap(), PayloadVersion::HttpV1);
        assert_eq!(PayloadVersion::parse("2.0").unwrap(), PayloadVersion::HttpV2);
    }

    #[test]
    fn test_should_reject_unsupported_version() {
        let err = PayloadVersion::parse("3.0").unwrap_err();
        assert_eq!(err.to_string(), "payload Version 3.0 is not supported");
    }

    #[test]
    fn test_should_label_and_serialize_versions() {
        assert_eq!(PayloadVersion::RestV1.label(), "rest-v1");
        assert_eq!(PayloadVersion::HttpV1.label(), "http-v1");
        assert_eq!(PayloadVersion::HttpV2.to_string(), "http-v2");
        for v in [
            PayloadVersion::RestV1,
            PayloadVersion::HttpV1,
            PayloadVersion::HttpV2,
        ] {
            assert_eq!(PayloadVersion::parse(v.as_str()).unwrap(), v);
        }
    }

    #[test]
    fn test_should_display_api_type() {
        assert_eq!(ApiType::Rest.to_string(), "REST");
        assert_eq!(ApiType::Http.to_string(), "HTTP");
        assert_eq!(ApiType::default(), ApiType::Http);
    }

    #[test]
    fn test_should_display_runtime_mode() {
        assert_eq!(RuntimeMode::ServerlessHandler.to_string(), "serverless-handler");
        assert_eq!(RuntimeMode::StandaloneServer.to_string(), "standalone-server");
    }
}
