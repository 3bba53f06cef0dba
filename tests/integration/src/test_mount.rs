//! Mount prefix integration tests.

#[cfg(test)]
mod tests {
    use ferry_core::FerryConfig;
    use reqwest::StatusCode;

    use crate::{TestServer, client, echo_handler};

    fn config(prefix: &str) -> FerryConfig {
        FerryConfig::builder().prefix(prefix.to_owned()).build()
    }

    #[tokio::test]
    async fn test_should_serve_everything_at_root() {
        let server = TestServer::start(config("/"), echo_handler()).await;
        let resp = client()
            .get(server.url("/a/b?x=1"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.text().await.unwrap();
        assert!(body.contains("target=/a/b?x=1"), "{body}");
        assert!(body.contains(&format!("host={}", server.addr)), "{body}");
        assert!(body.contains("remote=127.0.0.1:"), "{body}");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_strip_prefix() {
        let server = TestServer::start(config("/api"), echo_handler()).await;
        let body = client()
            .post(server.url("/api/items?id=3"))
            .body("payload")
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("target=/items?id=3"), "{body}");
        assert!(body.contains("body=payload"), "{body}");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_strip_prefix_with_trailing_slash() {
        let server = TestServer::start(config("/api/"), echo_handler()).await;
        let body = client()
            .get(server.url("/api/items"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("target=/items"), "{body}");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_return_not_found_outside_prefix() {
        let server = TestServer::start(config("/api"), echo_handler()).await;
        let resp = client().get(server.url("/other")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.text().await.unwrap(), "404 page not found\n");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_redirect_bare_prefix() {
        let server = TestServer::start(config("/api"), echo_handler()).await;
        let resp = client().get(server.url("/api")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["location"], "/api/");
        server.stop().await.unwrap();
    }
}
