//! Audit logging middleware.
//!
//! Logs every protected request with a request id, the caller, method,
//! path, response status and latency. Runs outside auth so 401 and 403
//! rejections are logged too; the caller is read from the response
//! extensions auth leaves behind. The request id is echoed in
//! `X-Request-Id`.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::models::PublicUser;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;

    let user_id = response.extensions().get::<PublicUser>().map(|u| u.id);
    let status = response.status().as_u16();
    tracing::info!(
        request_id,
        user_id,
        method,
        path,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API access"
    );

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-Id", val);
    }
    response
}
