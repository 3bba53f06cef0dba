//! Proxy-integration envelope models for Ferry.
//!
//! The serverless host exchanges JSON records in three inbound shapes,
//! discriminated by the `version` field:
//!
//! | `version` | Shape | Type |
//! |-----------|-------|------|
//! | *(absent)* | REST API proxy integration | [`RequestV1`] |
//! | `"1.0"` | HTTP API, payload format 1.0 | [`RequestV1`] |
//! | `"2.0"` | HTTP API, payload format 2.0 | [`RequestV2`] |
//!
//! Outbound, a buffered invocation returns a [`ResponseEnvelope`] and a
//! streaming invocation returns a [`ResponseMetadata`] prelude followed by
//! the body bytes.
//!
//! Every map and string field tolerates JSON `null`, and unknown fields are
//! ignored, so newer gateway payloads keep deserializing.

mod request;
mod request_v2;
mod response;
pub(crate) mod serde_ext;

pub use request::{RequestContextV1, RequestV1};
pub use request_v2::{HttpContextV2, RequestContextV2, RequestV2};
pub use response::{ResponseEnvelope, ResponseMetadata};
