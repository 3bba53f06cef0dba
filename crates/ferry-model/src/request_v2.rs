//! HTTP API (payload 2.0) request envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::serde_ext::nullable;

/// Inbound event for HTTP API payload format 2.0.
///
/// Unlike [`RequestV1`](crate::RequestV1) there are no multi-value maps:
/// repeated headers arrive comma-joined, and cookies arrive as a separate
/// list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestV2 {
    /// Payload format version, always `"2.0"`.
    #[serde(default, deserialize_with = "nullable")]
    pub version: String,
    /// Matched route key (e.g. `"GET /items"`).
    #[serde(default, deserialize_with = "nullable")]
    pub route_key: String,
    /// Percent-encoded request path.
    #[serde(default, deserialize_with = "nullable")]
    pub raw_path: String,
    /// Percent-encoded query string without the leading `?`.
    #[serde(default, deserialize_with = "nullable")]
    pub raw_query_string: String,
    /// Request cookies, one `name=value` pair per entry.
    #[serde(default, deserialize_with = "nullable")]
    pub cookies: Vec<String>,
    /// Headers; repeated values are comma-joined.
    #[serde(default, deserialize_with = "nullable")]
    pub headers: BTreeMap<String, String>,
    /// Query parameters; repeated values are comma-joined.
    #[serde(default, deserialize_with = "nullable")]
    pub query_string_parameters: BTreeMap<String, String>,
    /// Path parameters matched by the route.
    #[serde(default, deserialize_with = "nullable")]
    pub path_parameters: BTreeMap<String, String>,
    /// Per-request context.
    #[serde(default, deserialize_with = "nullable")]
    pub request_context: RequestContextV2,
    /// Request body, base64-encoded when `is_base64_encoded` is set.
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    /// Whether `body` is base64-encoded.
    #[serde(default, deserialize_with = "nullable")]
    pub is_base64_encoded: bool,
    /// Stage variables.
    #[serde(default, deserialize_with = "nullable")]
    pub stage_variables: BTreeMap<String, String>,
}

/// Request context for [`RequestV2`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContextV2 {
    /// Owning account.
    #[serde(default, deserialize_with = "nullable")]
    pub account_id: String,
    /// Gateway API identifier.
    #[serde(default, deserialize_with = "nullable")]
    pub api_id: String,
    /// Full domain name used to invoke the API.
    #[serde(default, deserialize_with = "nullable")]
    pub domain_name: String,
    /// First label of `domain_name`.
    #[serde(default, deserialize_with = "nullable")]
    pub domain_prefix: String,
    /// HTTP details of the request.
    #[serde(default, deserialize_with = "nullable")]
    pub http: HttpContextV2,
    /// Gateway request identifier.
    #[serde(default, deserialize_with = "nullable")]
    pub request_id: String,
    /// Matched route identifier.
    #[serde(default, deserialize_with = "nullable")]
    pub route_id: String,
    /// Matched route key.
    #[serde(default, deserialize_with = "nullable")]
    pub route_key: String,
    /// Deployment stage.
    #[serde(default, deserialize_with = "nullable")]
    pub stage: String,
    /// Request time in CLF format.
    #[serde(default, deserialize_with = "nullable")]
    pub time: String,
    /// Request time in epoch milliseconds.
    #[serde(default, deserialize_with = "nullable")]
    pub time_epoch: i64,
}

/// `requestContext.http` of a [`RequestV2`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpContextV2 {
    /// HTTP method.
    #[serde(default, deserialize_with = "nullable")]
    pub method: String,
    /// Request path.
    #[serde(default, deserialize_with = "nullable")]
    pub path: String,
    /// Protocol string such as `"HTTP/1.1"`.
    #[serde(default, deserialize_with = "nullable")]
    pub protocol: String,
    /// Client address.
    #[serde(default, deserialize_with = "nullable")]
    pub source_ip: String,
    /// Client user agent.
    #[serde(default, deserialize_with = "nullable")]
    pub user_agent: String,
}
