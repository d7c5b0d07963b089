use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Records method, path, status and latency once the response is complete.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    if crate::config::config().api.enable_request_logging {
        tracing::info!(
            %method,
            path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    }

    response
}
