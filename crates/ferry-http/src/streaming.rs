//! Streaming response capture.
//!
//! A [`StreamingCapture`] is the producer half handed to the code running
//! the application handler; the [`StreamingReceiver`] is the consumer half
//! held by whoever delivers the response to the host. The two halves share
//! a one-shot commit signal carrying the [`ResponseMetadata`] and a bounded
//! channel carrying body chunks, so a slow consumer blocks `flush` instead
//! of growing memory.
//!
//! ```text
//!            commit / first flush / close
//!   Open  ───────────────────────────────▶  HeadersCommitted
//!     │                                          │
//!     └──────────────── close ───────────────────┴──▶  Closed
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use ferry_core::{FerryError, FerryResult};
use ferry_model::ResponseMetadata;
use futures::Stream;
use http::header::SET_COOKIE;
use http::{HeaderMap, StatusCode};
use http_body::{Body, Frame};
use http_body_util::BodyExt;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::headers::{canonical_header_key, value_string};

type Chunk = Result<Bytes, io::Error>;

/// Lifecycle of a [`StreamingCapture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Headers and status may still change.
    Open,
    /// Metadata has been delivered; only body bytes may follow.
    HeadersCommitted,
    /// The sink is closed.
    Closed,
}

/// Producer half of a streaming response.
#[derive(Debug)]
pub struct StreamingCapture {
    status: StatusCode,
    headers: HeaderMap,
    buffer: BytesMut,
    state: StreamState,
    commit_tx: Option<oneshot::Sender<ResponseMetadata>>,
    sink: Option<mpsc::Sender<Chunk>>,
}

/// Consumer half of a streaming response.
#[derive(Debug)]
pub struct StreamingReceiver {
    metadata: oneshot::Receiver<ResponseMetadata>,
    body: StreamingBody,
}

/// Body chunks of a streaming response, in write order.
///
/// Ends when the producer closes or is dropped.
#[derive(Debug)]
pub struct StreamingBody {
    rx: mpsc::Receiver<Chunk>,
}

impl StreamingCapture {
    /// Create a connected producer/consumer pair.
    ///
    /// `capacity` bounds the number of flushed chunks in flight; it is
    /// clamped to at least one.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, StreamingReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (commit_tx, commit_rx) = oneshot::channel();
        let capture = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buffer: BytesMut::new(),
            state: StreamState::Open,
            commit_tx: Some(commit_tx),
            sink: Some(tx),
        };
        let receiver = StreamingReceiver {
            metadata: commit_rx,
            body: StreamingBody { rx },
        };
        (capture, receiver)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Status code (the committed one once headers are committed).
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Mutable access to the headers. Changes after commit are not sent.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Commit status and headers. Only the first call has any effect.
    pub fn commit(&mut self, status: StatusCode) {
        if self.state != StreamState::Open {
            return;
        }
        self.status = status;
        self.state = StreamState::HeadersCommitted;
        let metadata = metadata_of(status, &self.headers);
        if let Some(tx) = self.commit_tx.take() {
            if tx.send(metadata).is_err() {
                debug!("streaming consumer dropped before headers were committed");
            }
        }
    }

    /// Buffer body bytes until the next flush.
    ///
    /// Returns the number of bytes accepted, which is zero once closed.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if self.state == StreamState::Closed {
            return 0;
        }
        self.buffer.extend_from_slice(data);
        data.len()
    }

    /// Commit if still open, then hand buffered bytes to the consumer.
    ///
    /// Waits while the channel is full. A no-op when nothing is buffered.
    pub async fn flush(&mut self) -> FerryResult<()> {
        self.commit(StatusCode::OK);
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = self.buffer.split().freeze();
        self.send(Ok(chunk)).await
    }

    /// Flush, then close the sink. Committing first if needed.
    ///
    /// Idempotent.
    pub async fn close(&mut self) -> FerryResult<()> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        let result = self.flush().await;
        self.sink = None;
        self.state = StreamState::Closed;
        result
    }

    /// Drive a handler response through the capture.
    ///
    /// Status and headers are committed immediately; each data frame is
    /// written and flushed as it arrives. A body error is forwarded to the
    /// consumer and ends the stream.
    pub async fn record<B>(mut self, response: http::Response<B>) -> FerryResult<()>
    where
        B: Body<Data = Bytes> + Unpin,
        B::Error: Display,
    {
        let (parts, mut body) = response.into_parts();
        for (name, value) in &parts.headers {
            self.headers.append(name, value.clone());
        }
        self.commit(parts.status);

        while let Some(frame) = body.frame().await {
            match frame {
                Ok(frame) => {
                    if let Ok(data) = frame.into_data() {
                        self.write(&data);
                        self.flush().await?;
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    // Best effort: the consumer may already be gone.
                    let _ = self.send(Err(io::Error::other(message.clone()))).await;
                    self.close().await?;
                    return Err(FerryError::Body(message));
                }
            }
        }
        self.close().await
    }

    async fn send(&mut self, chunk: Chunk) -> FerryResult<()> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        sink.send(chunk)
            .await
            .map_err(|_| FerryError::Body("streaming consumer went away".to_owned()))
    }
}

impl StreamingReceiver {
    /// Wait for the metadata, then return it with the body stream.
    ///
    /// # Errors
    ///
    /// [`FerryError::StreamClosedPrematurely`] if the producer is dropped
    /// without committing.
    pub async fn wait(self) -> FerryResult<(ResponseMetadata, StreamingBody)> {
        let metadata = self
            .metadata
            .await
            .map_err(|_| FerryError::StreamClosedPrematurely)?;
        Ok((metadata, self.body))
    }
}

impl Stream for StreamingBody {
    type Item = Chunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Body for StreamingBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.get_mut()
            .rx
            .poll_recv(cx)
            .map(|chunk| chunk.map(|r| r.map(Frame::data)))
    }
}

fn metadata_of(status: StatusCode, headers: &HeaderMap) -> ResponseMetadata {
    let mut joined = BTreeMap::new();
    for name in headers.keys() {
        if *name == SET_COOKIE {
            continue;
        }
        let value = headers
            .get_all(name)
            .iter()
            .map(value_string)
            .collect::<Vec<_>>()
            .join(",");
        joined.insert(canonical_header_key(name.as_str()), value);
    }
    ResponseMetadata {
        status_code: status.as_u16(),
        headers: joined,
        cookies: headers.get_all(SET_COOKIE).iter().map(value_string).collect(),
    }
}
