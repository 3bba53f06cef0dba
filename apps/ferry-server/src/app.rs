//! The hello application.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use ferry_http::body::full;
use ferry_http::request::RequestMeta;
use ferry_http::{CanonicalRequest, Handler, ResponseBody, handler_fn};
use futures::StreamExt;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};

/// Number of events emitted by `/stream`.
const STREAM_EVENTS: u64 = 5;
/// Delay between two events of `/stream`.
const STREAM_INTERVAL: Duration = Duration::from_millis(100);

/// Build the application.
///
/// - `/` echoes the path and remote address.
/// - `/hello?name=` greets.
/// - `/stream` emits server-sent events.
pub fn hello_app() -> impl Handler {
    handler_fn(|req: CanonicalRequest| async move {
        match req.uri().path() {
            "/hello" => hello(&req),
            "/stream" => stream(),
            _ => index(&req),
        }
    })
}

fn index(req: &CanonicalRequest) -> Response<ResponseBody> {
    let remote = RequestMeta::of(req)
        .map(|m| m.remote_addr.as_str())
        .unwrap_or_default();
    text(
        StatusCode::OK,
        format!("path: {}\nremote: {remote}\n", req.uri().path()),
    )
}

fn hello(req: &CanonicalRequest) -> Response<ResponseBody> {
    let name = req
        .uri()
        .query()
        .and_then(|q| {
            form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "name")
                .map(|(_, v)| v.into_owned())
        })
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "world".to_owned());
    text(StatusCode::OK, format!("Hello, {name}!\n"))
}

fn stream() -> Response<ResponseBody> {
    let events = futures::stream::iter(0..STREAM_EVENTS).then(|i| async move {
        if i > 0 {
            tokio::time::sleep(STREAM_INTERVAL).await;
        }
        Ok::<_, io::Error>(Frame::data(Bytes::from(format!("data: {i}\n\n"))))
    });
    let mut resp = Response::new(BodyExt::boxed(StreamBody::new(events)));
    resp.headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("text/event-stream"));
    resp
}

fn text(status: StatusCode, body: String) -> Response<ResponseBody> {
    let mut resp = Response::new(full(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

#[cfg(test)]
mod tests {
    use ferry_http::RequestBody;

    use super::*;

    async fn call(uri: &str) -> (StatusCode, String) {
        let mut req = http::Request::builder()
            .uri(uri)
            .body(RequestBody::empty())
            .unwrap();
        req.extensions_mut().insert(RequestMeta {
            remote_addr: "192.0.2.1:1234".to_owned(),
            ..RequestMeta::default()
        });
        let resp = hello_app().handle(req).await;
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_should_echo_path_and_remote() {
        let (status, body) = call("/some/where").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "path: /some/where\nremote: 192.0.2.1:1234\n");
    }

    #[tokio::test]
    async fn test_should_greet_by_name() {
        assert_eq!(call("/hello?name=ferry").await.1, "Hello, ferry!\n");
        assert_eq!(call("/hello").await.1, "Hello, world!\n");
    }

    #[tokio::test]
    async fn test_should_stream_five_events() {
        let (_, body) = call("/stream").await;
        assert_eq!(body, "data: 0\n\ndata: 1\n\ndata: 2\n\ndata: 3\n\ndata: 4\n\n");
    }
}
