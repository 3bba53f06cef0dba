//! PROXY protocol integration tests.

#[cfg(test)]
mod tests {
    use ferry_core::FerryConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::{TestServer, echo_handler};

    async fn raw_exchange(server: &TestServer, payload: &[u8]) -> String {
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(payload).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    fn config() -> FerryConfig {
        FerryConfig::builder().proxy_protocol(true).build()
    }

    #[tokio::test]
    async fn test_should_rewrite_remote_address_from_preamble() {
        let server = TestServer::start(config(), echo_handler()).await;
        let response = raw_exchange(
            &server,
            b"PROXY TCP4 203.0.113.7 192.0.2.1 51000 80\r\n\
              GET /ip HTTP/1.1\r\nHost: proxied.example\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("remote=203.0.113.7:51000"), "{response}");
        assert!(response.contains("host=proxied.example"), "{response}");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_pass_through_connections_without_preamble() {
        let server = TestServer::start(config(), echo_handler()).await;
        let response = raw_exchange(
            &server,
            b"GET /plain HTTP/1.1\r\nHost: direct.example\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("remote=127.0.0.1:"), "{response}");
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_should_close_connection_on_malformed_preamble() {
        let server = TestServer::start(config(), echo_handler()).await;
        let response = raw_exchange(&server, b"PROXY TCP4 not-an-ip\r\n").await;
        assert!(response.is_empty(), "{response}");
        server.stop().await.unwrap();
    }
}
