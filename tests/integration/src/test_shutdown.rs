//! Graceful shutdown integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use ferry_core::{FerryConfig, FerryError};
    use reqwest::StatusCode;

    use crate::{TestServer, client, slow_handler};

    #[tokio::test]
    async fn test_should_finish_in_flight_request_before_exit() {
        let mut server =
            TestServer::start(FerryConfig::default(), slow_handler(Duration::from_millis(300)))
                .await;
        let url = server.url("/slow");
        let in_flight = tokio::spawn(async move { client().get(url).send().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        server.trigger_shutdown();

        let resp = in_flight.await.unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "done");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_run_term_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let server = TestServer::start_with_term_handler(
            FerryConfig::default(),
            slow_handler(Duration::ZERO),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        server.stop().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_should_refuse_connections_after_shutdown() {
        let server = TestServer::start(FerryConfig::default(), slow_handler(Duration::ZERO)).await;
        let url = server.url("/");
        server.stop().await.unwrap();
        assert!(client().get(url).send().await.is_err());
    }

    #[tokio::test]
    async fn test_should_report_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();
        let err = ferry_runtime::server::bind(&address).await.unwrap_err();
        assert!(matches!(err, FerryError::ListenerBind { .. }));
        assert!(err.to_string().starts_with(&format!("couldn't listen to {address}: ")));
    }
}
