//! Envelope-to-response integration tests through the invoker.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ferry_core::FerryConfig;
    use ferry_http::Handler;
    use ferry_http::{Mount, to_request_v1, to_request_v2};
    use ferry_runtime::{Invoker, Outcome};

    use crate::echo_handler;

    fn invoker(prefix: &str) -> Invoker {
        let app: Arc<dyn Handler> = Arc::new(Mount::new(prefix, echo_handler()));
        Invoker::new(&FerryConfig::default(), app, false)
    }

    async fn buffered(invoker: &Invoker, event: &[u8]) -> ferry_model::ResponseEnvelope {
        match invoker.invoke(event, None).await.unwrap() {
            Outcome::Buffered(envelope) => envelope,
            Outcome::Streaming { .. } => panic!("expected buffered outcome"),
        }
    }

    #[tokio::test]
    async fn test_should_serve_rest_event_under_prefix() {
        let event = r#"{
            "path": "/api/users",
            "httpMethod": "POST",
            "headers": {"Host": "gw.example.com"},
            "queryStringParameters": {"page": "2"},
            "requestContext": {"identity": {"sourceIp": "198.51.100.4"}},
            "body": "aGVsbG8=",
            "isBase64Encoded": true
        }"#;
        let envelope = buffered(&invoker("/api"), event.as_bytes()).await;
        assert_eq!(envelope.status_code, 200);
        assert!(!envelope.is_base64_encoded);
        assert_eq!(
            envelope.body,
            "target=/users?page=2\nhost=gw.example.com\nremote=198.51.100.4\nbody=hello"
        );
        assert!(envelope.cookies.is_none());
    }

    #[tokio::test]
    async fn test_should_replay_live_request_as_v1_and_v2_events() {
        let invoker = invoker("/");
        let live = || {
            http::Request::builder()
                .method("PUT")
                .uri("/things/1?tag=a&tag=b")
                .header("host", "local.example")
                .body(http_body_util::Full::new(bytes::Bytes::from_static(b"data")))
                .unwrap()
        };

        let v1 = serde_json::to_vec(&to_request_v1(live()).await.unwrap()).unwrap();
        let v1_envelope = buffered(&invoker, &v1).await;

        let v2 = serde_json::to_vec(&to_request_v2(live()).await.unwrap()).unwrap();
        let v2_envelope = buffered(&invoker, &v2).await;

        assert_eq!(
            v1_envelope.body,
            "target=/things/1?tag=a&tag=b\nhost=local.example\nremote=\nbody=data"
        );
        assert_eq!(v1_envelope.body, v2_envelope.body);
    }

    #[tokio::test]
    async fn test_should_replay_envelope_as_http_response() {
        let event = r#"{"version":"2.0","rawPath":"/x","requestContext":{"http":{"method":"GET"}}}"#;
        let envelope = buffered(&invoker("/"), event.as_bytes()).await;
        let resp = envelope.into_http_response().unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(
            resp.headers()[http::header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(String::from_utf8_lossy(resp.body()).starts_with("target=/x"));
    }
}
