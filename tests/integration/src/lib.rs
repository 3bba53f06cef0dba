//! Integration tests for the Ferry standalone listener.
//!
//! Each test starts a [`Ferry`] dispatcher in-process on an ephemeral port
//! and talks to it over real sockets, so no external server is needed.

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use ferry_core::{FerryConfig, FerryResult};
use ferry_http::body::full;
use ferry_http::request::RequestMeta;
use ferry_http::{CanonicalRequest, Handler, handler_fn};
use ferry_runtime::Ferry;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running in-process listener.
#[derive(Debug)]
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<FerryResult<()>>,
}

impl TestServer {
    /// Start `handler` behind a listener configured by `config`.
    ///
    /// The configured address is ignored in favour of `127.0.0.1:0`.
    pub async fn start(config: FerryConfig, handler: impl Handler) -> Self {
        Self::start_with_term_handler(config, handler, || {}).await
    }

    /// Like [`TestServer::start`], with a termination callback.
    pub async fn start_with_term_handler(
        config: FerryConfig,
        handler: impl Handler,
        on_term: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        let ferry = Ferry::new(config, handler).with_term_handler(on_term);
        let handle = tokio::spawn(ferry.serve(listener, async move {
            let _ = rx.await;
        }));
        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Trigger shutdown without waiting.
    pub fn trigger_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Shut down and wait for the serve loop to finish draining.
    pub async fn stop(mut self) -> FerryResult<()> {
        self.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not drain in time")
            .expect("server task panicked")
    }
}

/// HTTP client that does not follow redirects.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build reqwest client")
}

/// Handler answering with the request target, host and remote address.
pub fn echo_handler() -> impl Handler {
    handler_fn(|req: CanonicalRequest| async move {
        let meta = RequestMeta::of(&req).cloned().unwrap_or_default();
        let target = req.uri().path_and_query().map_or("/", |pq| pq.as_str()).to_owned();
        let body = req.into_body().collect_bytes().await.unwrap_or_default();
        let text = format!(
            "target={target}\nhost={}\nremote={}\nbody={}",
            meta.host,
            meta.remote_addr,
            String::from_utf8_lossy(&body)
        );
        http::Response::new(full(text))
    })
}

/// Handler that sleeps before answering.
pub fn slow_handler(delay: Duration) -> impl Handler {
    handler_fn(move |_req: CanonicalRequest| async move {
        tokio::time::sleep(delay).await;
        http::Response::new(full(Bytes::from_static(b"done")))
    })
}

mod test_envelope;
mod test_mount;
mod test_proxy_protocol;
mod test_shutdown;
