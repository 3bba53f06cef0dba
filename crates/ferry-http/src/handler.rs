//! The application capability.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::body::ResponseBody;
use crate::request::CanonicalRequest;

/// Future returned by [`Handler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<ResponseBody>> + Send>>;

/// Trait the application must implement.
///
/// The handler sees a [`CanonicalRequest`] regardless of whether it came
/// from an envelope or a socket, and answers with a complete response.
/// Failures are expressed as HTTP statuses.
pub trait Handler: Send + Sync + 'static {
    /// Handle a request.
    fn handle(&self, req: CanonicalRequest) -> HandlerFuture;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, req: CanonicalRequest) -> HandlerFuture {
        (**self).handle(req)
    }
}

/// [`Handler`] backed by an async closure. Built with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Wrap an async closure as a [`Handler`].
///
/// ```
/// use ferry_http::body::full;
/// use ferry_http::handler_fn;
///
/// let app = handler_fn(|req| async move {
///     http::Response::new(full(format!("you asked for {}", req.uri().path())))
/// });
/// # let _ = app;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(CanonicalRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = http::Response<ResponseBody>> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(CanonicalRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = http::Response<ResponseBody>> + Send + 'static,
{
    fn handle(&self, req: CanonicalRequest) -> HandlerFuture {
        Box::pin((self.f)(req))
    }
}
