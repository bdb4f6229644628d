use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

// Bodies past this size pass through without being captured for the log.
const MAX_BODY_LOG_SIZE: usize = 1024;

/// Tags every request with an `x-request-id`, logs it on the way in and out
/// with latency, and echoes the id back to the caller. Request bodies are
/// only logged in sanitized form so card data never reaches the logs.
pub async fn request_logger_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        req.headers_mut().insert("x-request-id", value);
    }

    // Bodies are only buffered when the declared length fits the log limit;
    // oversized or chunked bodies flow through untouched so the handler
    // still sees them.
    if log_bodies() && method != axum::http::Method::GET && body_fits_log(req.headers()) {
        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, MAX_BODY_LOG_SIZE).await {
            Ok(bytes) => {
                tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    body = %sanitized_body(&bytes),
                    "Incoming request"
                );
                req = Request::from_parts(parts, Body::from(bytes));
            }
            // Content-Length lied, so the body is already gone.
            Err(_) => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    "Incoming request body exceeded its declared length"
                );
                req = Request::from_parts(parts, Body::empty());
            }
        }
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            "Incoming request"
        );
    }

    let response = next.run(req).await;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        latency_ms = start.elapsed().as_millis(),
        "Outgoing response"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert("x-request-id", value);
    }
    Response::from_parts(parts, body)
}

fn body_fits_log(headers: &axum::http::HeaderMap) -> bool {
    headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .map(|len| len <= MAX_BODY_LOG_SIZE)
        .unwrap_or(false)
}

fn log_bodies() -> bool {
    std::env::var("LOG_REQUEST_BODY")
        .map(|v| v == "true")
        .unwrap_or(false)
}

fn sanitized_body(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(json) => {
            let sanitized = crate::utils::sanitize::sanitize_json(&json);
            serde_json::to_string(&sanitized).unwrap_or_else(|_| "[invalid json]".to_string())
        }
        Err(_) => format!("[non-json, {} bytes]", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::{body::Body, routing::post, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn adds_request_id_to_response() {
        let app = Router::new()
            .route("/test", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_logger_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn large_body_reaches_the_handler_when_body_logging_is_on() {
        std::env::set_var("LOG_REQUEST_BODY", "true");

        let app = Router::new()
            .route(
                "/test",
                post(|axum::Json(v): axum::Json<serde_json::Value>| async move {
                    v["description"]
                        .as_str()
                        .map(|s| s.len().to_string())
                        .unwrap_or_default()
                }),
            )
            .layer(axum::middleware::from_fn(request_logger_middleware));

        let body = serde_json::json!({ "description": "x".repeat(2048) }).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/test")
                    .header("content-type", "application/json")
                    .header("content-length", body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"2048");
    }

    #[test]
    fn masks_card_fields_in_logged_bodies() {
        let body = br#"{"cardNumber":"4111111111111111","cvv":"123","amount":"10.00"}"#;
        let logged = sanitized_body(body);
        assert!(logged.contains("****1111"));
        assert!(!logged.contains("4111111111111111"));
        assert!(!logged.contains("123\""));
        assert!(logged.contains("10.00"));
    }
}
