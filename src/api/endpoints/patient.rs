//! Patient-only health-metrics endpoints in the older request/response
//! shape. Same recorder and owner key as `/api/health-metrics`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::health_metrics::{self, LegacyMeasurement};
use crate::models::PublicUser;

#[derive(Debug, Serialize)]
pub struct LegacyRecordResponse {
    pub message: &'static str,
    pub bmi: f64,
}

/// `GET /api/patient/health-metrics`: newest entry, or `{}` when none.
pub async fn latest(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<PublicUser>,
) -> Result<Json<Value>, ApiError> {
    let latest = ctx
        .blocking(move |conn| health_metrics::latest(conn, user.id))
        .await?;
    let body = match latest {
        Some(metric) => serde_json::to_value(metric)
            .map_err(|e| ApiError::Internal(format!("serialize metric: {e}")))?,
        None => Value::Object(Default::default()),
    };
    Ok(Json(body))
}

/// `POST /api/patient/health-metrics`: `blood_pressure` as `"sys/dia"`.
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<PublicUser>,
    payload: Result<Json<LegacyMeasurement>, JsonRejection>,
) -> Result<Json<LegacyRecordResponse>, ApiError> {
    let Json(legacy) = payload?;
    let measurement = legacy.into_measurement()?;
    let metric = ctx
        .blocking(move |conn| health_metrics::record(conn, user.id, &measurement))
        .await?;
    Ok(Json(LegacyRecordResponse {
        message: "Health metrics saved",
        bmi: metric.bmi,
    }))
}
