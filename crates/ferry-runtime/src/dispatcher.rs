//! The runtime dispatcher.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ferry_core::config::STREAMING_RESPONSE_ENV;
use ferry_core::{FerryConfig, FerryResult, RuntimeMode};
use ferry_http::{Handler, Mount};
use tokio::net::TcpListener;
use tracing::info;

use crate::lambda::{self, Invoker};
use crate::probe;
use crate::server::{self, ServeOptions};
use crate::shutdown::{self, terminate_signal};

/// Callback run once when the process is asked to terminate.
pub type TermHandler = Arc<dyn Fn() + Send + Sync>;

/// Runs an application either as a serverless function handler or as a
/// standalone HTTP server, depending on the environment.
///
/// ```no_run
/// use ferry_core::FerryConfig;
/// use ferry_http::body::full;
/// use ferry_http::handler_fn;
/// use ferry_runtime::Ferry;
///
/// # async fn demo() -> ferry_core::FerryResult<()> {
/// let app = handler_fn(|_req| async { http::Response::new(full("hello")) });
/// Ferry::new(FerryConfig::from_env(), app)
///     .with_term_handler(|| tracing::info!("bye"))
///     .run()
///     .await
/// # }
/// ```
pub struct Ferry {
    config: FerryConfig,
    handler: Arc<dyn Handler>,
    term_handler: Option<TermHandler>,
}

impl fmt::Debug for Ferry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ferry")
            .field("config", &self.config)
            .field("term_handler", &self.term_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Ferry {
    /// Create a dispatcher for `handler`.
    pub fn new(config: FerryConfig, handler: impl Handler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            term_handler: None,
        }
    }

    /// Register a callback to run once on termination.
    ///
    /// As a standalone server it runs on SIGTERM, Ctrl-C or explicit
    /// shutdown; as a serverless handler it runs when the host sends SIGTERM.
    #[must_use]
    pub fn with_term_handler(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.term_handler = Some(Arc::new(f));
        self
    }

    /// Run until terminated by a signal.
    pub async fn run(self) -> FerryResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until terminated by a signal or until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> FerryResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mode = probe::detect_mode();
        info!(%mode, "runtime mode detected");
        match mode {
            RuntimeMode::ServerlessHandler => self.run_handler(shutdown).await,
            RuntimeMode::ServerlessExtension | RuntimeMode::StandaloneServer => {
                self.run_standalone(shutdown).await
            }
        }
    }

    /// Run the serverless event loop.
    ///
    /// The termination callback is registered with the host through an
    /// internal extension, since the host only delivers SIGTERM to
    /// functions that have one.
    pub async fn run_handler<F>(self, shutdown: F) -> FerryResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let env = std::env::var(STREAMING_RESPONSE_ENV).ok();
        let streaming =
            lambda::resolve_streaming(self.config.streaming_response, env.as_deref(), false);
        if streaming {
            lambda::announce_streaming();
        }

        if let Some(term) = self.term_handler.clone() {
            lambda::register_term_handler(term).await;
        }

        let invoker = Invoker::new(&self.config, self.mounted(), streaming);
        tokio::select! {
            biased;
            () = shutdown => {
                info!("shutdown requested");
                Ok(())
            }
            result = lambda::run(invoker) => result,
        }
    }

    /// Bind the configured address and serve on it.
    pub async fn run_standalone<F>(self, shutdown: F) -> FerryResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            address = %self.config.address,
            prefix = %self.config.prefix,
            "starting up with local httpd"
        );
        let listener = server::bind(&self.config.address).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until a signal or `shutdown`.
    ///
    /// The termination callback runs before connections are drained.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> FerryResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (trigger, watch) = shutdown::channel();
        let options = ServeOptions {
            proxy_protocol: self.config.proxy_protocol,
        };
        let handler = self.mounted();
        let term_handler = self.term_handler;

        let watcher = async move {
            tokio::select! {
                () = shutdown => info!("shutdown requested"),
                () = terminate_signal() => info!("received termination signal"),
            }
            if let Some(term) = term_handler {
                term();
            }
            trigger.fire();
        };

        let ((), result) = tokio::join!(watcher, server::serve(listener, handler, options, watch));
        result
    }

    fn mounted(&self) -> Arc<dyn Handler> {
        Arc::new(Mount::new(&self.config.prefix, Arc::clone(&self.handler)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use ferry_http::body::{empty, full};
    use ferry_http::handler_fn;
    use http_body_util::BodyExt;

    use super::*;

    fn app() -> impl Handler {
        handler_fn(|req| async move {
            if req.uri().path() == "/" {
                http::Response::new(full("root"))
            } else {
                http::Response::new(empty())
            }
        })
    }

    #[tokio::test]
    async fn test_should_not_contact_host_without_term_handler() {
        let ferry = Ferry::new(FerryConfig::default(), app());
        tokio::time::timeout(Duration::from_secs(1), ferry.run_handler(async {}))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_run_term_handler_once_on_explicit_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ferry = Ferry::new(FerryConfig::default(), app())
            .with_term_handler(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), ferry.serve(listener, async {}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_mount_handler_under_prefix() {
        let config = FerryConfig::builder().prefix("/api".into()).build();
        let handler = Ferry::new(config, app()).mounted();
        let req = http::Request::builder()
            .uri("/api/")
            .body(ferry_http::RequestBody::empty())
            .unwrap();
        let resp = handler.handle(req).await;
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"root");
    }
}
