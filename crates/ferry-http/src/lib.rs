//! Protocol adaptation between proxy-integration envelopes and HTTP.
//!
//! This crate is the heart of Ferry. It handles:
//!
//! - **Detection** ([`detect`]): picks the envelope variant of a raw JSON
//!   event from its `version` field, or from a configured override.
//!
//! - **Translation** ([`request`]): one typed translator per variant turns the
//!   envelope into a [`CanonicalRequest`], followed by validation.
//!
//! - **Inverse translation** ([`inverse`]): builds REST/HTTP-v1 and HTTP-v2
//!   envelopes back from a live request.
//!
//! - **Capture** ([`capture`], [`streaming`]): accumulates a handler's output
//!   into the outbound envelope, either buffered or as a metadata prelude
//!   plus a backpressured byte stream.
//!
//! - **Classification** ([`binary`]): decides whether a response body must be
//!   base64-encoded.
//!
//! - **Handlers** ([`handler`], [`mount`]): the opaque application capability
//!   and its path-prefix mount.
//!
//! # Architecture
//!
//! ```text
//! raw JSON event
//!   -> PayloadDetector (RestV1 | HttpV1 | HttpV2)
//!     -> RequestTranslator::from_v1 / from_v2
//!       -> validate
//!         -> CanonicalRequest
//!           -> Mount -> Handler
//!         <- http::Response<ResponseBody>
//!       <- ResponseCapture | StreamingCapture
//! <- ResponseEnvelope | ResponseMetadata + StreamingBody
//! ```

pub mod binary;
pub mod body;
pub mod capture;
pub mod detect;
pub mod handler;
pub mod headers;
pub mod inverse;
pub mod mount;
pub mod request;
pub mod streaming;

pub use binary::MimeClassifier;
pub use body::{RequestBody, ResponseBody};
pub use capture::{CaptureConfig, ResponseCapture};
pub use detect::{PayloadDetector, detect_api_type};
pub use handler::{Handler, HandlerFn, HandlerFuture, handler_fn};
pub use inverse::{to_request_v1, to_request_v2};
pub use mount::Mount;
pub use request::{
    CanonicalRequest, PAYLOAD_VERSION_HEADER, Protocol, RequestMeta, RequestTranslator,
};
pub use streaming::{StreamState, StreamingBody, StreamingCapture, StreamingReceiver};
