//! Role authorization gate.
//!
//! Mounted per route group with a fixed allow-list, after
//! `require_auth` has attached the caller. No store access.

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::models::{PublicUser, Role};

pub const PATIENT_ONLY: &[Role] = &[Role::Patient];
pub const DOCTOR_ONLY: &[Role] = &[Role::Doctor];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Pass the request through unchanged when the caller's role is allowed.
pub async fn require_role(
    State(allowed): State<&'static [Role]>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    match check_role(req.extensions().get::<PublicUser>(), allowed) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

pub fn check_role(user: Option<&PublicUser>, allowed: &[Role]) -> Result<(), ApiError> {
    let user = user.ok_or(ApiError::Unauthenticated)?;
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        tracing::debug!(user_id = user.id, role = %user.role, "Role not permitted");
        Err(ApiError::Forbidden("Insufficient role".into()))
    }
}
