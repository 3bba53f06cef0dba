//! Header name and value helpers.

use http::HeaderValue;

/// Canonical `Title-Case` form of a header name.
///
/// The first letter and every letter following a hyphen are upper-cased;
/// all other letters are lower-cased. Names containing bytes outside the
/// token alphabet are returned unchanged.
///
/// ```
/// use ferry_http::headers::canonical_header_key;
///
/// assert_eq!(canonical_header_key("content-type"), "Content-Type");
/// assert_eq!(canonical_header_key("X-AMZ-date"), "X-Amz-Date");
/// ```
#[must_use]
pub fn canonical_header_key(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_owned();
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Header value as a string, replacing invalid UTF-8 sequences.
#[must_use]
pub fn value_string(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}
