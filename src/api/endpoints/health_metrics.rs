//! Health-metrics endpoints, open to any authenticated caller. The
//! caller must still own a patient profile.
//!
//! `GET /api/health-metrics`: latest 50 entries
//! `POST /api/health-metrics`: append one entry

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::health_metrics::{self, Measurement};
use crate::models::{HealthMetric, PublicUser};

#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub success: bool,
    pub data: Vec<HealthMetric>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RecordedId {
    pub health_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: RecordedId,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<PublicUser>,
) -> Result<Json<MetricListResponse>, ApiError> {
    let data = ctx
        .blocking(move |conn| health_metrics::list(conn, user.id))
        .await?;
    Ok(Json(MetricListResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<PublicUser>,
    payload: Result<Json<Measurement>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    let Json(measurement) = payload?;
    let metric = ctx
        .blocking(move |conn| health_metrics::record(conn, user.id, &measurement))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            success: true,
            message: "Health metrics recorded",
            data: RecordedId {
                health_id: metric.health_id,
            },
        }),
    ))
}
