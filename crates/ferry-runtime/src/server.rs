//! Standalone HTTP listener.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use ferry_core::{FerryError, FerryResult};
use ferry_http::headers::value_string;
use ferry_http::request::{PAYLOAD_VERSION_HEADER, Protocol, RequestMeta};
use ferry_http::{CanonicalRequest, Handler, RequestBody, ResponseBody};
use http::header::{CONTENT_LENGTH, HOST};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::proxy_protocol;
use crate::shutdown::ShutdownWatch;

/// Listener options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServeOptions {
    /// Expect a PROXY protocol preamble on every connection.
    pub proxy_protocol: bool,
}

/// Bind a TCP listener.
///
/// # Errors
///
/// [`FerryError::ListenerBind`] if the address cannot be bound.
pub async fn bind(address: &str) -> FerryResult<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(|source| FerryError::ListenerBind {
            address: address.to_owned(),
            source,
        })
}

/// Run the accept loop until `shutdown` fires, then drain open connections.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    options: ServeOptions,
    mut shutdown: ShutdownWatch,
) -> FerryResult<()> {
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    if options.proxy_protocol {
        info!("PROXY protocol enabled");
    }
    // Connections whose PROXY preamble has been read off the accept loop.
    let (ready_tx, mut ready_rx) = mpsc::channel::<(TcpStream, SocketAddr)>(64);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                if options.proxy_protocol {
                    let ready_tx = ready_tx.clone();
                    let watch = shutdown.clone();
                    tokio::spawn(async move {
                        let mut stream = stream;
                        match proxy_protocol::accept(&mut stream, peer_addr).await {
                            Ok(_) if watch.is_shutdown() => {
                                debug!(
                                    peer_addr = %peer_addr,
                                    "dropping connection accepted during shutdown"
                                );
                            }
                            Ok(remote) => {
                                let _ = ready_tx.send((stream, remote)).await;
                            }
                            Err(e) => {
                                warn!(
                                    peer_addr = %peer_addr,
                                    error = %e,
                                    "rejected PROXY preamble"
                                );
                            }
                        }
                    });
                    continue;
                }

                let conn = http.serve_connection(
                    TokioIo::new(stream),
                    ConnectionService { handler: Arc::clone(&handler), remote: peer_addr },
                );
                let conn = graceful.watch(conn.into_owned());
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            Some((stream, remote)) = ready_rx.recv() => {
                debug!(remote_addr = %remote, "PROXY preamble accepted");
                let conn = http.serve_connection(
                    TokioIo::new(stream),
                    ConnectionService { handler: Arc::clone(&handler), remote },
                );
                let conn = graceful.watch(conn.into_owned());
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %remote, error = %e, "connection error");
                    }
                });
            }

            () = shutdown.wait() => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained");
    Ok(())
}

/// Per-connection hyper service feeding the handler.
#[derive(Clone)]
struct ConnectionService {
    handler: Arc<dyn Handler>,
    remote: SocketAddr,
}

impl Service<http::Request<Incoming>> for ConnectionService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let response = self.handler.handle(to_canonical(req, self.remote));
        Box::pin(async move { Ok(response.await) })
    }
}

/// Convert a live request into a [`CanonicalRequest`].
///
/// `Host` moves from the header map into [`RequestMeta`] (falling back to
/// the URI authority for HTTP/2), and any client-supplied payload-version
/// header is discarded.
pub fn to_canonical(req: http::Request<Incoming>, remote: SocketAddr) -> CanonicalRequest {
    let (mut parts, body) = req.into_parts();
    let host = parts
        .headers
        .remove(HOST)
        .map(|v| value_string(&v))
        .or_else(|| parts.uri.authority().map(ToString::to_string))
        .unwrap_or_default();
    parts.headers.remove(PAYLOAD_VERSION_HEADER);
    let content_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    parts.extensions.insert(RequestMeta {
        host,
        remote_addr: remote.to_string(),
        protocol: Protocol::from_version(parts.version),
        content_length,
        payload_version: None,
    });
    http::Request::from_parts(parts, RequestBody::Incoming(body))
}
