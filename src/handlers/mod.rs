//! Request handlers for the DID resolution API.

mod identifier;

pub use identifier::*;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use chrono::{DateTime, Utc};

use crate::error::{DidError, DidResult, ErrorCode};

/// Creates common response headers.
pub fn common_headers(request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", value);
    }
    if let Ok(value) = HeaderValue::from_str(&format_http_date(&Utc::now())) {
        headers.insert(header::DATE, value);
    }
    headers.insert(
        header::SERVER,
        HeaderValue::from_static(concat!("algo-did/", env!("CARGO_PKG_VERSION"))),
    );
    headers
}

/// Formats a timestamp as an HTTP IMF-fixdate.
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds a response with the given status, headers, and body.
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> DidResult<Response<Body>> {
    let mut response = Response::builder()
        .status(status)
        .body(body)
        .map_err(|e| DidError::with_message(ErrorCode::Internal, e.to_string()))?;
    *response.headers_mut() = headers;
    Ok(response)
}
