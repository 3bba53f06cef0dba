//! Path-prefix mounting of the application.

use std::fmt;

use http::header::{CONTENT_TYPE, LOCATION};
use http::uri::PathAndQuery;
use http::{HeaderValue, StatusCode, Uri};

use crate::body::full;
use crate::handler::{Handler, HandlerFuture};
use crate::request::CanonicalRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    /// Everything goes to the handler untouched.
    Root,
    /// Paths under `pattern` go to the handler with `strip` removed.
    Prefix { pattern: String, strip: String },
}

/// Mounts a handler under a path prefix.
///
/// - `""` or `"/"`: all requests reach the handler unchanged.
/// - `/p` (no trailing slash): requests under `/p/` reach the handler with
///   `/p` stripped from the path.
/// - `/p/` (trailing slash): same, stripping `/p`.
///
/// Requests outside the prefix get `404 page not found`; a request for the
/// prefix itself without its trailing slash is redirected to `/p/`.
pub struct Mount<H> {
    rule: Rule,
    inner: H,
}

impl<H> fmt::Debug for Mount<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount").field("rule", &self.rule).finish_non_exhaustive()
    }
}

impl<H: Handler> Mount<H> {
    /// Mount `inner` under `prefix`.
    pub fn new(prefix: &str, inner: H) -> Self {
        let rule = if prefix.is_empty() || prefix == "/" {
            Rule::Root
        } else if let Some(strip) = prefix.strip_suffix('/') {
            Rule::Prefix {
                pattern: prefix.to_owned(),
                strip: strip.to_owned(),
            }
        } else {
            Rule::Prefix {
                pattern: format!("{prefix}/"),
                strip: prefix.to_owned(),
            }
        };
        Self { rule, inner }
    }
}

impl<H: Handler> Handler for Mount<H> {
    fn handle(&self, mut req: CanonicalRequest) -> HandlerFuture {
        let Rule::Prefix { pattern, strip } = &self.rule else {
            return self.inner.handle(req);
        };

        let path = req.uri().path();
        if path.starts_with(pattern.as_str()) {
            return match strip_prefix(req.uri(), strip) {
                Some(uri) => {
                    *req.uri_mut() = uri;
                    self.inner.handle(req)
                }
                None => Box::pin(async { not_found() }),
            };
        }

        if pattern.strip_suffix('/') == Some(path) {
            let location = match req.uri().query() {
                Some(query) => format!("{pattern}?{query}"),
                None => pattern.clone(),
            };
            return Box::pin(async move { redirect(&location) });
        }

        Box::pin(async { not_found() })
    }
}

fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let rest = uri.path().strip_prefix(prefix)?;
    let path_and_query = match uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_owned(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

fn not_found() -> http::Response<crate::body::ResponseBody> {
    let mut resp = http::Response::new(full("404 page not found\n"));
    *resp.status_mut() = StatusCode::NOT_FOUND;
    let headers = resp.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    resp
}

fn redirect(location: &str) -> http::Response<crate::body::ResponseBody> {
    let mut resp = http::Response::new(crate::body::empty());
    *resp.status_mut() = StatusCode::MOVED_PERMANENTLY;
    if let Ok(value) = HeaderValue::from_str(location) {
        resp.headers_mut().insert(LOCATION, value);
    }
    resp
}
