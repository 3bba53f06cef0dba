//! Request and response body types.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use ferry_core::{FerryError, FerryResult};
use http_body::{Body, Frame, SizeHint};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Incoming;

/// Body of a [`CanonicalRequest`](crate::CanonicalRequest).
///
/// Requests translated from an envelope carry a fully decoded payload;
/// requests from the standalone listener stream straight from the socket.
#[derive(Debug, Default)]
pub enum RequestBody {
    /// A fully buffered body (envelope payload).
    Buffered(Full<Bytes>),
    /// A live body streamed by hyper.
    Incoming(Incoming),
    /// No body.
    #[default]
    Empty,
}

impl RequestBody {
    /// Create a request body from raw bytes. Empty input yields [`RequestBody::Empty`].
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        if data.is_empty() {
            Self::Empty
        } else {
            Self::Buffered(Full::new(data))
        }
    }

    /// Create an empty request body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Collect the whole body into memory.
    pub async fn collect_bytes(self) -> FerryResult<Bytes> {
        self.collect()
            .await
            .map(http_body_util::Collected::to_bytes)
            .map_err(|e| FerryError::Body(e.to_string()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Incoming(incoming) => Pin::new(incoming).poll_frame(cx).map_err(io::Error::other),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Incoming(incoming) => incoming.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Incoming(incoming) => incoming.size_hint(),
            Self::Empty => SizeHint::with_exact(0),
        }
    }
}

/// Body of a handler response.
///
/// Boxed so handlers can return buffered, empty or streaming bodies through
/// one type.
pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// Create a fully buffered response body.
#[must_use]
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Create an empty response body.
#[must_use]
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}
