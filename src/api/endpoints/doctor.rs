//! Doctor-only endpoints.
//!
//! `GET /api/doctor/appointments`: the caller's agenda
//! `GET /api/doctor/search-patient/:patientId`: patient overview

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::health_metrics::{self, PatientOverview};
use crate::models::{DoctorAppointment, PublicUser};
use crate::scheduling;

pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<PublicUser>,
) -> Result<Json<Vec<DoctorAppointment>>, ApiError> {
    let agenda = ctx
        .blocking(move |conn| scheduling::list_doctor_appointments(conn, user.id))
        .await?;
    Ok(Json(agenda))
}

pub async fn search_patient(
    State(ctx): State<ApiContext>,
    patient_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PatientOverview>, ApiError> {
    let Path(patient_id) = patient_id?;
    let overview = ctx
        .blocking(move |conn| health_metrics::patient_overview(conn, patient_id))
        .await?;
    Ok(Json(overview))
}
