//! Admin-only management endpoints.
//!
//! `POST /api/admin/doctors`: doctor user + profile
//! `POST /api/admin/hospitals`
//! `POST /api/admin/schedule`: weekly slot for a doctor at a hospital

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::accounts::{self, NewDoctor};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::scheduling::{self, NewHospital, NewScheduleSlot};

#[derive(Debug, Serialize)]
pub struct DoctorCreated {
    pub message: &'static str,
    pub doctor_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct HospitalCreated {
    pub message: &'static str,
    pub hospital_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ScheduleCreated {
    pub message: &'static str,
    pub schedule_id: i64,
}

pub async fn create_doctor(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewDoctor>, JsonRejection>,
) -> Result<(StatusCode, Json<DoctorCreated>), ApiError> {
    let Json(doctor) = payload?;
    let created = ctx
        .blocking(move |conn| accounts::create_doctor(conn, &doctor))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DoctorCreated {
            message: "Doctor created",
            doctor_id: created.doctor_id,
            user_id: created.user_id,
        }),
    ))
}

pub async fn create_hospital(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewHospital>, JsonRejection>,
) -> Result<(StatusCode, Json<HospitalCreated>), ApiError> {
    let Json(hospital) = payload?;
    let hospital_id = ctx
        .blocking(move |conn| scheduling::create_hospital(conn, &hospital))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(HospitalCreated {
            message: "Hospital created",
            hospital_id,
        }),
    ))
}

pub async fn add_schedule(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewScheduleSlot>, JsonRejection>,
) -> Result<(StatusCode, Json<ScheduleCreated>), ApiError> {
    let Json(slot) = payload?;
    let schedule_id = ctx
        .blocking(move |conn| scheduling::add_schedule_slot(conn, &slot))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ScheduleCreated {
            message: "Schedule slot added",
            schedule_id,
        }),
    ))
}
