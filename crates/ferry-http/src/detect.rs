//! Envelope variant detection.

use ferry_core::{ApiType, FerryResult, PayloadVersion};
use serde::Deserialize;

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<String>,
}

/// Picks the envelope variant of a raw event.
///
/// With an override configured, the event is never inspected and the
/// override is parsed verbatim; otherwise only the top-level `version`
/// field is decoded.
#[derive(Debug, Clone, Default)]
pub struct PayloadDetector {
    override_version: Option<String>,
}

impl PayloadDetector {
    /// Create a detector, optionally pinned to a fixed version string.
    #[must_use]
    pub fn new(override_version: Option<String>) -> Self {
        Self { override_version }
    }

    /// Detect the variant of `event`.
    ///
    /// # Errors
    ///
    /// - [`FerryError::MalformedEnvelope`](ferry_core::FerryError::MalformedEnvelope)
    ///   if `event` is not JSON (or `version` is not a string).
    /// - [`FerryError::UnsupportedVersion`](ferry_core::FerryError::UnsupportedVersion)
    ///   if the version is not one of `""`, `"1.0"`, `"2.0"`.
    pub fn detect(&self, event: &[u8]) -> FerryResult<PayloadVersion> {
        if let Some(version) = &self.override_version {
            return PayloadVersion::parse(version);
        }
        let probe: VersionProbe = serde_json::from_slice(event)?;
        PayloadVersion::parse(probe.version.as_deref().unwrap_or_default())
    }
}

/// Gateway flavour of `event`: REST when `version` is missing or empty
/// (or the event does not parse), HTTP otherwise.
#[must_use]
pub fn detect_api_type(event: &[u8]) -> ApiType {
    match serde_json::from_slice::<VersionProbe>(event) {
        Ok(VersionProbe {
            version: Some(version),
        }) if !version.is_empty() => ApiType::Http,
        _ => ApiType::Rest,
    }
}
