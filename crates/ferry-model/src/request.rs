//! REST API and HTTP API (payload 1.0) request envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::serde_ext::nullable;

/// Inbound event for REST API and HTTP API payload format 1.0.
///
/// Both shapes are identical apart from the `version` field, which REST
/// events omit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestV1 {
    /// Payload format version (`None` for REST API events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Request body, base64-encoded when `is_base64_encoded` is set.
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    /// Single-value headers (last value wins on the gateway side).
    #[serde(default, deserialize_with = "nullable")]
    pub headers: BTreeMap<String, String>,
    /// All header values, in arrival order per key.
    #[serde(default, deserialize_with = "nullable")]
    pub multi_value_headers: BTreeMap<String, Vec<String>>,
    /// HTTP method.
    #[serde(default, deserialize_with = "nullable")]
    pub http_method: String,
    /// Request path, already percent-decoded by the gateway.
    #[serde(default, deserialize_with = "nullable")]
    pub path: String,
    /// Path parameters matched by the gateway resource.
    #[serde(default, deserialize_with = "nullable")]
    pub path_parameters: BTreeMap<String, String>,
    /// Single-value query parameters.
    #[serde(default, deserialize_with = "nullable")]
    pub query_string_parameters: BTreeMap<String, String>,
    /// All query parameter values, in arrival order per key.
    #[serde(default, deserialize_with = "nullable")]
    pub multi_value_query_string_parameters: BTreeMap<String, Vec<String>>,
    /// Gateway resource template.
    #[serde(default, deserialize_with = "nullable")]
    pub resource: String,
    /// Stage variables.
    #[serde(default, deserialize_with = "nullable")]
    pub stage_variables: BTreeMap<String, String>,
    /// Per-request context.
    #[serde(default, deserialize_with = "nullable")]
    pub request_context: RequestContextV1,
    /// Whether `body` is base64-encoded.
    #[serde(default, deserialize_with = "nullable")]
    pub is_base64_encoded: bool,
}

/// Request context for [`RequestV1`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContextV1 {
    /// Owning account.
    #[serde(default, deserialize_with = "nullable")]
    pub account_id: String,
    /// Gateway API identifier.
    #[serde(default, deserialize_with = "nullable")]
    pub api_id: String,
    /// HTTP method as seen by the gateway.
    #[serde(default, deserialize_with = "nullable")]
    pub http_method: String,
    /// Caller identity. Values are kept loosely typed because the gateway
    /// mixes strings, `null` and nested objects here.
    #[serde(default, deserialize_with = "nullable")]
    pub identity: BTreeMap<String, serde_json::Value>,
    /// Gateway request identifier.
    #[serde(default, deserialize_with = "nullable")]
    pub request_id: String,
    /// Gateway resource identifier.
    #[serde(default, deserialize_with = "nullable")]
    pub resource_id: String,
    /// Gateway resource path.
    #[serde(default, deserialize_with = "nullable")]
    pub resource_path: String,
    /// Deployment stage.
    #[serde(default, deserialize_with = "nullable")]
    pub stage: String,
}

impl RequestContextV1 {
    /// Client address from `identity.sourceIp`, if present and a string.
    #[must_use]
    pub fn source_ip(&self) -> Option<&str> {
        self.identity.get("sourceIp").and_then(serde_json::Value::as_str)
    }
}
