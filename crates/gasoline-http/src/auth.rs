//! Extension authentication (§4.6): the ingest and command-polling routes
//! require `X-Gasoline-Client: gasoline-extension/<any-version>`, matched
//! by prefix only — the extension's version is informational.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

const CLIENT_HEADER: &str = "x-gasoline-client";
const CLIENT_PREFIX: &str = "gasoline-extension/";

pub async fn require_extension_client(req: Request<Body>, next: Next) -> Response {
    let header = req
        .headers()
        .get(CLIENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !header.starts_with(CLIENT_PREFIX) {
        return (StatusCode::FORBIDDEN, "missing or invalid X-Gasoline-Client header").into_response();
    }

    next.run(req).await
}
