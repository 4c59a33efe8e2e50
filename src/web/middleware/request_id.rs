//! Request-ID propagation.
//!
//! Every request runs inside a tracing span carrying its ID, so log lines
//! from the handlers and the lookup core correlate per request. The ID is
//! taken from a fronting proxy's `x-request-id` header when present and
//! minted as a ULID otherwise; either way it is echoed on the response.
//! Error-severity logging lives with `ApiError`, not here.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn propagate_request_id(req: Request, next: Next) -> Response {
    let req_id = match req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(upstream) => upstream.to_owned(),
        None => ulid::Ulid::new().to_string(),
    };

    let span = tracing::info_span!(
        "request",
        req_id = %req_id,
        method = %req.method(),
        path = req.uri().path(),
    );
    let started = Instant::now();

    let mut response = next.run(req).instrument(span).await;

    tracing::debug!(
        req_id = %req_id,
        status = response.status().as_u16(),
        elapsed = crate::utils::fmt_duration(started.elapsed()),
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&req_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
