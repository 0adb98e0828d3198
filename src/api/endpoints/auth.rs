//! Authentication endpoints. All unprotected.
//!
//! `POST /api/auth/register`: create a patient account
//! `POST /api/auth/login`: email + password
//! `POST /api/auth/google`: external identity, creates a patient on first sight

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::accounts::{self, AuthSession, Credentials, ExternalIdentity, Registration};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::PublicUser;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub user: PublicUser,
}

impl AuthResponse {
    fn new(message: &'static str, session: AuthSession) -> Self {
        Self {
            message,
            token: session.token,
            user: session.user,
        }
    }
}

pub async fn register(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(registration) = payload?;
    let tokens = ctx.tokens.clone();
    let session = ctx
        .blocking(move |conn| accounts::register(conn, &tokens, &registration))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", session)),
    ))
}

pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(credentials) = payload?;
    let tokens = ctx.tokens.clone();
    let session = ctx
        .blocking(move |conn| accounts::login(conn, &tokens, &credentials))
        .await?;
    Ok(Json(AuthResponse::new("Login successful", session)))
}

pub async fn google(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ExternalIdentity>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(identity) = payload?;
    let tokens = ctx.tokens.clone();
    let session = ctx
        .blocking(move |conn| accounts::login_with_google(conn, &tokens, &identity))
        .await?;
    Ok(Json(AuthResponse::new("Google login successful", session)))
}
