//! DNS-rebinding defenses (§4.6), applied ahead of every handler: a request
//! whose `Origin` isn't loopback, or whose `Host` doesn't name loopback, is
//! rejected with 403 before any handler logic runs.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

fn is_loopback_origin(origin: &str) -> bool {
    origin.is_empty()
        || strip_port(origin.strip_prefix("http://").unwrap_or(origin)) == "localhost"
        || strip_port(origin.strip_prefix("http://").unwrap_or(origin)) == "127.0.0.1"
}

fn is_loopback_host(host: &str) -> bool {
    let host = strip_port(host);
    host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "::1"
}

fn strip_port(host_or_origin: &str) -> &str {
    host_or_origin.split(':').next().unwrap_or(host_or_origin)
}

pub async fn loopback_only(req: Request<Body>, next: Next) -> Response {
    let headers = req.headers();

    if let Some(origin) = headers.get(axum::http::header::ORIGIN) {
        let origin = origin.to_str().unwrap_or("");
        if !is_loopback_origin(origin) {
            return reject(format!("origin '{origin}' is not loopback"));
        }
    }

    if let Some(host) = headers.get(axum::http::header::HOST) {
        let host = host.to_str().unwrap_or("");
        if !host.is_empty() && !is_loopback_host(host) {
            return reject(format!("host '{host}' does not resolve to loopback"));
        }
    }

    next.run(req).await
}

fn reject(message: String) -> Response {
    (StatusCode::FORBIDDEN, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_origins_are_accepted() {
        assert!(is_loopback_origin(""));
        assert!(is_loopback_origin("http://localhost:3000"));
        assert!(is_loopback_origin("http://127.0.0.1:9234"));
    }

    #[test]
    fn remote_origin_is_rejected() {
        assert!(!is_loopback_origin("https://evil.example"));
    }

    #[test]
    fn loopback_hosts_are_accepted() {
        assert!(is_loopback_host("localhost:9234"));
        assert!(is_loopback_host("127.0.0.1:9234"));
    }

    #[test]
    fn remote_host_is_rejected() {
        assert!(!is_loopback_host("evil.example"));
    }
}
