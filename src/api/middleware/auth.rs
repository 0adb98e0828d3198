//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it, loads the user
//! with a single store read and injects the `PublicUser` into request
//! extensions for downstream handlers. The caller is also copied onto the
//! response so the outer access log can record it.

use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::accounts;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Require a valid identity token.
///
/// Missing header or token is 401 without touching the store. A token
/// that fails verification is 403. A token for a deleted user is 401.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = bearer_token(req.headers().get(header::AUTHORIZATION))
        .ok_or(ApiError::Unauthenticated)?;

    let user_id = ctx.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected identity token");
        ApiError::from(e)
    })?;

    let user = ctx
        .blocking(move |conn| accounts::resolve_identity(conn, user_id))
        .await?
        .ok_or_else(|| {
            tracing::debug!(user_id, "Token refers to unknown user");
            ApiError::Unauthenticated
        })?;

    req.extensions_mut().insert(user.clone());

    let mut response = next.run(req).await;
    response.extensions_mut().insert(user);
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_extraction() {
        let ok = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(bearer_token(Some(&ok)), Some("abc.def.ghi"));

        for bad in ["Basic abc", "Bearer ", "abc.def.ghi", "bearer abc"] {
            let value = HeaderValue::from_static(bad);
            assert_eq!(bearer_token(Some(&value)), None, "header {bad:?}");
        }
        assert_eq!(bearer_token(None), None);
    }
}
