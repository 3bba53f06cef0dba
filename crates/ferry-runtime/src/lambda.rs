//! Serverless handler mode.
//!
//! Each invocation is detected, translated, validated and handed to the
//! mounted application; the response is captured either buffered (one
//! [`ResponseEnvelope`]) or streamed (a [`ResponseMetadata`] prelude plus a
//! [`StreamingBody`]).

use std::sync::Arc;

use ferry_core::{FerryConfig, FerryError, FerryResult};
use ferry_http::{
    CaptureConfig, Handler, PayloadDetector, RequestTranslator, ResponseCapture, StreamingBody,
    StreamingCapture, detect_api_type,
};
use ferry_model::{ResponseEnvelope, ResponseMetadata};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use lambda_runtime::{
    FunctionResponse, LambdaEvent, MetadataPrelude, StreamResponse, service_fn,
};
use serde_json::value::RawValue;
use tracing::{debug, error, info, warn};

use crate::dispatcher::TermHandler;

/// Header carrying the invocation's request id.
pub const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
/// Header carrying the invoked function ARN.
pub const FUNCTION_ARN_HEADER: &str = "lambda-runtime-invoked-function-arn";

/// Identifiers of the current invocation, injected as request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceIds {
    /// Request id assigned by the host.
    pub request_id: String,
    /// ARN the function was invoked through.
    pub function_arn: String,
}

/// Result of one invocation.
#[derive(Debug)]
pub enum Outcome {
    /// Buffered response envelope.
    Buffered(ResponseEnvelope),
    /// Streaming response: metadata first, body as it is produced.
    Streaming {
        /// Status, headers and cookies.
        metadata: ResponseMetadata,
        /// Body chunks.
        body: StreamingBody,
    },
}

/// Response type handed to the serverless host.
pub type InvocationResponse = FunctionResponse<ResponseEnvelope, StreamingBody>;

/// Processes invocations against a mounted application.
#[derive(Clone)]
pub struct Invoker {
    translator: RequestTranslator,
    capture: Arc<CaptureConfig>,
    handler: Arc<dyn Handler>,
    streaming: bool,
    stream_buffer_frames: usize,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("translator", &self.translator)
            .field("streaming", &self.streaming)
            .field("stream_buffer_frames", &self.stream_buffer_frames)
            .finish_non_exhaustive()
    }
}

impl Invoker {
    /// Create an invoker from the process configuration.
    #[must_use]
    pub fn new(config: &FerryConfig, handler: Arc<dyn Handler>, streaming: bool) -> Self {
        Self {
            translator: RequestTranslator::new(PayloadDetector::new(
                config.payload_version.clone(),
            )),
            capture: Arc::new(CaptureConfig::from_config(config)),
            handler,
            streaming,
            stream_buffer_frames: config.stream_buffer_frames,
        }
    }

    /// Whether responses are streamed.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Process one raw event.
    ///
    /// Trace headers are added only when the request does not carry them
    /// already.
    pub async fn invoke(&self, event: &[u8], trace: Option<&TraceIds>) -> FerryResult<Outcome> {
        let mut req = self
            .translator
            .translate(event)
            .inspect_err(|e| error!(error = %e, "failed to translate event"))?;
        if let Some(trace) = trace {
            inject_trace_headers(req.headers_mut(), trace);
        }

        if self.streaming {
            let (capture, receiver) = StreamingCapture::new(self.stream_buffer_frames);
            let response = self.handler.handle(req);
            tokio::spawn(async move {
                if let Err(e) = capture.record(response.await).await {
                    warn!(error = %e, "streaming response aborted");
                }
            });
            let (metadata, body) = receiver.wait().await?;
            return Ok(Outcome::Streaming { metadata, body });
        }

        let api_type = detect_api_type(event);
        debug!(%api_type, "capturing buffered response");
        let response = self.handler.handle(req).await;
        let envelope = ResponseCapture::new(api_type, Arc::clone(&self.capture))
            .record(response)
            .await?;
        Ok(Outcome::Buffered(envelope))
    }

    async fn handle_event(
        &self,
        event: LambdaEvent<Box<RawValue>>,
    ) -> Result<InvocationResponse, lambda_runtime::Error> {
        let trace = TraceIds {
            request_id: event.context.request_id.clone(),
            function_arn: event.context.invoked_function_arn.clone(),
        };
        let outcome = self.invoke(event.payload.get().as_bytes(), Some(&trace)).await?;
        Ok(match outcome {
            Outcome::Buffered(envelope) => FunctionResponse::BufferedResponse(envelope),
            Outcome::Streaming { metadata, body } => {
                FunctionResponse::StreamingResponse(StreamResponse {
                    metadata_prelude: prelude_of(&metadata),
                    stream: body,
                })
            }
        })
    }
}

/// Run the host event loop until it fails.
pub async fn run(invoker: Invoker) -> FerryResult<()> {
    let invoker = Arc::new(invoker);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Box<RawValue>>| {
        let invoker = Arc::clone(&invoker);
        async move { invoker.handle_event(event).await }
    }))
    .await
    .map_err(|e| FerryError::Runtime(e.to_string()))
}

/// Decide whether responses are streamed.
///
/// An explicit setting wins. Otherwise `env` (the raw value of
/// `FERRY_STREAMING_RESPONSE`) is parsed; an absent or empty value keeps
/// `prior`.
#[must_use]
pub fn resolve_streaming(explicit: Option<bool>, env: Option<&str>, prior: bool) -> bool {
    if let Some(streaming) = explicit {
        return streaming;
    }
    env.and_then(parse_env_bool).unwrap_or(prior)
}

/// Parse a boolean env value.
///
/// `1`/`true` and `0`/`false` (case-insensitive) are recognized; an empty
/// value yields `None`; anything else yields `Some(false)` with a warning.
#[must_use]
pub fn parse_env_bool(value: &str) -> Option<bool> {
    if value.is_empty() {
        None
    } else if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        warn!(value, "unrecognized boolean value, treating as false");
        Some(false)
    }
}

/// Log the streaming mode reminder.
pub(crate) fn announce_streaming() {
    info!(
        "streaming response mode enabled; the function must be invoked with response streaming (InvokeMode RESPONSE_STREAM)"
    );
}

/// Run `term` when the host shuts the function down.
///
/// Registers `lambda_runtime`'s internal shutdown extension; the process
/// exits once the callback returns.
pub(crate) async fn register_term_handler(term: TermHandler) {
    #[cfg(unix)]
    {
        lambda_runtime::spawn_graceful_shutdown_handler(move || async move {
            info!("received termination signal");
            term();
        })
        .await;
    }
    #[cfg(not(unix))]
    {
        drop(term);
        warn!("termination callbacks need a unix host, ignoring");
    }
}

fn inject_trace_headers(headers: &mut HeaderMap, trace: &TraceIds) {
    for (name, value) in [
        (REQUEST_ID_HEADER, &trace.request_id),
        (FUNCTION_ARN_HEADER, &trace.function_arn),
    ] {
        if value.is_empty() {
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers
                    .entry(HeaderName::from_static(name))
                    .or_insert(value);
            }
            Err(e) => warn!(header = name, error = %e, "skipping invalid trace header"),
        }
    }
}

fn prelude_of(metadata: &ResponseMetadata) -> MetadataPrelude {
    let mut headers = HeaderMap::new();
    for (name, value) in &metadata.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
    }
    MetadataPrelude {
        status_code: StatusCode::from_u16(metadata.status_code).unwrap_or(StatusCode::OK),
        headers,
        cookies: metadata.cookies.clone(),
    }
}
