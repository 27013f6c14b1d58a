//! Request latency header.

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

pub static X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

/// Attach the wall-clock seconds spent in the inner stack as `X-Process-Time`.
pub async fn timing_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    // f64 Display never uses exponent notation, so this always parses back.
    if let Ok(value) = HeaderValue::from_str(&elapsed.as_secs_f64().to_string()) {
        response.headers_mut().insert(X_PROCESS_TIME.clone(), value);
    }
    metrics::record_request(method.as_str(), response.status().as_u16(), elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    "slow"
                }),
            )
            .layer(middleware::from_fn(timing_middleware))
    }

    async fn process_time(path: &str) -> (StatusCode, f64) {
        let response = app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let value: f64 = response.headers()[&X_PROCESS_TIME]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        (response.status(), value)
    }

    #[tokio::test]
    async fn header_is_non_negative_seconds() {
        let (status, seconds) = process_time("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(seconds >= 0.0);
    }

    #[tokio::test]
    async fn header_covers_handler_time() {
        let (_, seconds) = process_time("/slow").await;
        assert!(seconds >= 0.02, "got {seconds}");
    }

    #[tokio::test]
    async fn header_present_on_not_found() {
        let (status, seconds) = process_time("/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(seconds >= 0.0);
    }
}
