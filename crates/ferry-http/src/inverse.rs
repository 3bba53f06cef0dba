//! Live request to envelope translation.
//!
//! The inverse of [`crate::request`]: builds the event a gateway would
//! have sent for a live request. Used for testing and for bridging local
//! traffic to code that expects envelopes.

use std::collections::BTreeMap;
use std::fmt::Display;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ferry_core::{FerryError, FerryResult};
use ferry_model::{HttpContextV2, RequestContextV1, RequestContextV2, RequestV1, RequestV2};
use http::header::{COOKIE, HOST};
use http::request::Parts;
use http_body::Body;
use http_body_util::BodyExt;
use percent_encoding::percent_decode_str;

use crate::headers::{canonical_header_key, value_string};
use crate::request::{PAYLOAD_VERSION_HEADER, Protocol, RequestMeta};

/// Build a REST/HTTP-v1 envelope from a live request.
///
/// `version` is left unset so the event detects as REST; set it to `"1.0"`
/// to produce an HTTP-v1 event.
pub async fn to_request_v1<B>(req: http::Request<B>) -> FerryResult<RequestV1>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = collect(body).await?;
    let host = host_of(&parts);
    let meta = RequestMeta::of_parts(&parts);

    let mut event = RequestV1 {
        http_method: parts.method.to_string(),
        path: percent_decode_str(parts.uri.path())
            .decode_utf8_lossy()
            .into_owned(),
        request_context: RequestContextV1 {
            http_method: parts.method.to_string(),
            ..RequestContextV1::default()
        },
        ..RequestV1::default()
    };

    if !host.is_empty() {
        event.headers.insert("Host".to_owned(), host.clone());
        event
            .multi_value_headers
            .insert("Host".to_owned(), vec![host]);
    }
    for name in parts.headers.keys() {
        if *name == HOST || name.as_str() == PAYLOAD_VERSION_HEADER {
            continue;
        }
        let values: Vec<String> = parts
            .headers
            .get_all(name)
            .iter()
            .map(value_string)
            .collect();
        let key = canonical_header_key(name.as_str());
        if let Some(first) = values.first() {
            event.headers.insert(key.clone(), first.clone());
        }
        event.multi_value_headers.insert(key, values);
    }

    for (key, values) in query_values(&parts) {
        if let Some(first) = values.first() {
            event
                .query_string_parameters
                .insert(key.clone(), first.clone());
        }
        event
            .multi_value_query_string_parameters
            .insert(key, values);
    }

    if let Some(remote_addr) = meta.map(|m| m.remote_addr.as_str()).filter(|a| !a.is_empty()) {
        event.request_context.identity.insert(
            "sourceIp".to_owned(),
            serde_json::Value::String(remote_addr.to_owned()),
        );
    }

    if !body.is_empty() {
        event.body = STANDARD.encode(&body);
        event.is_base64_encoded = true;
    }
    Ok(event)
}

/// Build an HTTP-v2 envelope from a live request.
///
/// Repeated headers and query values are comma-joined; `Cookie` headers
/// become the `cookies` list.
pub async fn to_request_v2<B>(req: http::Request<B>) -> FerryResult<RequestV2>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = collect(body).await?;
    let host = host_of(&parts);
    let meta = RequestMeta::of_parts(&parts);

    let protocol = meta.map_or_else(
        || Protocol::from_version(parts.version),
        |m| m.protocol,
    );
    let remote_addr = meta.map(|m| m.remote_addr.clone()).unwrap_or_default();
    let path = percent_decode_str(parts.uri.path())
        .decode_utf8_lossy()
        .into_owned();

    let mut event = RequestV2 {
        version: "2.0".to_owned(),
        route_key: "$default".to_owned(),
        raw_path: parts.uri.path().to_owned(),
        raw_query_string: parts.uri.query().unwrap_or_default().to_owned(),
        request_context: RequestContextV2 {
            domain_name: host.clone(),
            route_key: "$default".to_owned(),
            http: HttpContextV2 {
                method: parts.method.to_string(),
                path,
                protocol: protocol.to_string(),
                source_ip: remote_addr,
                user_agent: parts
                    .headers
                    .get(http::header::USER_AGENT)
                    .map(value_string)
                    .unwrap_or_default(),
            },
            ..RequestContextV2::default()
        },
        ..RequestV2::default()
    };

    if !host.is_empty() {
        event.headers.insert("Host".to_owned(), host);
    }
    for name in parts.headers.keys() {
        if *name == HOST || *name == COOKIE || name.as_str() == PAYLOAD_VERSION_HEADER {
            continue;
        }
        let joined = parts
            .headers
            .get_all(name)
            .iter()
            .map(value_string)
            .collect::<Vec<_>>()
            .join(",");
        event
            .headers
            .insert(canonical_header_key(name.as_str()), joined);
    }
    event.cookies = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .flat_map(|v| {
            value_string(v)
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect();

    for (key, values) in query_values(&parts) {
        event.query_string_parameters.insert(key, values.join(","));
    }

    if !body.is_empty() {
        event.body = STANDARD.encode(&body);
        event.is_base64_encoded = true;
    }
    Ok(event)
}

impl RequestMeta {
    fn of_parts(parts: &Parts) -> Option<&Self> {
        parts.extensions.get::<Self>()
    }
}

async fn collect<B>(body: B) -> FerryResult<bytes::Bytes>
where
    B: Body,
    B::Error: Display,
{
    body.collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| FerryError::Body(e.to_string()))
}

fn host_of(parts: &Parts) -> String {
    if let Some(meta) = RequestMeta::of_parts(parts) {
        if !meta.host.is_empty() {
            return meta.host.clone();
        }
    }
    parts
        .headers
        .get(HOST)
        .map(value_string)
        .or_else(|| parts.uri.authority().map(ToString::to_string))
        .unwrap_or_default()
}

fn query_values(parts: &Parts) -> BTreeMap<String, Vec<String>> {
    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(query) = parts.uri.query() {
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            values
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }
    values
}
