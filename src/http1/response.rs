//! Canned response bodies and the shared response-assembly helpers used by
//! the HTTP/1.1 request handler.

use std::time::SystemTime;

use bytes::Bytes;
use http::StatusCode;

/// HTML served for every HTTP/1 parse error and for any cache miss.
pub const NOT_FOUND_BODY: &str = "<!doctype html><html><head><title>404 Not Found</title></head><body><h1>File Not Found</h1></body></html>";

/// Render the literal status line for one of the statuses this server
/// emits.
///
/// `http::StatusCode`'s canonical reason phrase is used for every status
/// except `500`, which this server's wire format spells "Not Implemented"
/// rather than `StatusCode::INTERNAL_SERVER_ERROR`'s canonical "Internal
/// Server Error" — that one line is kept as a literal to match the wire
/// response exactly.
#[must_use]
pub fn status_line(status: StatusCode) -> String {
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        "500 Not Implemented".to_string()
    } else {
        format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
    }
}

/// RFC 1123 date, GMT, locale independent — the wire form of every `Date`
/// and `Last-Modified` header this server emits.
#[must_use]
pub fn format_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Everything a 200 response needs beyond the shared boilerplate.
pub struct HitResponse {
    pub encoding: &'static str,
    pub media_type: &'static str,
    pub media_charset: Option<&'static str>,
    pub modified: SystemTime,
    pub body: Bytes,
}

/// Render the response head (everything up to and including the blank
/// line) for a cache hit. The caller writes `response.body` separately so
/// this never clones the body bytes.
#[must_use]
pub fn render_hit_headers(response: &HitResponse, product: &str) -> String {
    let content_type = match response.media_charset {
        Some(charset) => format!("{};charset={charset}", response.media_type),
        None => response.media_type.to_string(),
    };

    format!(
        "HTTP/1.1 {status}\r\n\
         Connection: keep-alive\r\n\
         Content-Encoding: {encoding}\r\n\
         Content-Length: {length}\r\n\
         Content-Type: {content_type}\r\n\
         Date: {date}\r\n\
         Last-Modified: {last_modified}\r\n\
         Referrer-Policy: no-referrer\r\n\
         Server: {product}\r\n\
         Strict-Transport-Security: max-age=31536000\r\n\
         X-Content-Type-Options: nosniff\r\n\
         \r\n",
        status = status_line(StatusCode::OK),
        encoding = response.encoding,
        length = response.body.len(),
        date = format_date(SystemTime::now()),
        last_modified = format_date(response.modified),
        product = product,
    )
}

/// A bodiless `304 Not Modified`.
#[must_use]
pub fn render_not_modified(product: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\n\
         Connection: keep-alive\r\n\
         Date: {date}\r\n\
         Referrer-Policy: no-referrer\r\n\
         Server: {product}\r\n\
         Strict-Transport-Security: max-age=31536000\r\n\
         X-Content-Type-Options: nosniff\r\n\
         \r\n",
        status = status_line(StatusCode::NOT_MODIFIED),
        date = format_date(SystemTime::now()),
        product = product,
    )
}

/// The canned 404, used for both a cache miss and any request parse error.
#[must_use]
pub fn render_not_found(product: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\n\
         Connection: keep-alive\r\n\
         Content-Encoding: identity\r\n\
         Content-Length: {length}\r\n\
         Content-Type: text/html;charset=utf-8\r\n\
         Date: {date}\r\n\
         Referrer-Policy: no-referrer\r\n\
         Server: {product}\r\n\
         Strict-Transport-Security: max-age=31536000\r\n\
         X-Content-Type-Options: nosniff\r\n\
         \r\n{body}",
        status = status_line(StatusCode::NOT_FOUND),
        length = NOT_FOUND_BODY.len(),
        date = format_date(SystemTime::now()),
        product = product,
        body = NOT_FOUND_BODY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_keeps_500_literal() {
        assert_eq!(status_line(StatusCode::INTERNAL_SERVER_ERROR), "500 Not Implemented");
    }

    #[test]
    fn status_line_derives_others_from_http_crate() {
        assert_eq!(status_line(StatusCode::OK), "200 OK");
        assert_eq!(status_line(StatusCode::NOT_FOUND), "404 Not Found");
    }

    #[test]
    fn render_not_found_contains_canned_body() {
        let rendered = render_not_found("rampart");
        assert!(rendered.contains("404 Not Found"));
        assert!(rendered.ends_with(NOT_FOUND_BODY));
        assert!(rendered.contains("Content-Length: 105"));
    }

    #[test]
    fn render_hit_headers_appends_charset_when_present() {
        let response = HitResponse {
            encoding: "br",
            media_type: "text/html",
            media_charset: Some("utf-8"),
            modified: SystemTime::UNIX_EPOCH,
            body: Bytes::from_static(b"hi"),
        };
        let rendered = render_hit_headers(&response, "rampart");
        assert!(rendered.contains("Content-Type: text/html;charset=utf-8"));
        assert!(rendered.contains("Content-Encoding: br"));
        assert!(rendered.contains("Content-Length: 2"));
    }
}
