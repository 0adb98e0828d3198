//! Patient-side appointment endpoints.
//!
//! `GET /api/appointments/find-doctors?name&hospital&specialization`
//! `POST /api/appointments/book`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Appointment, DoctorSearchFilter, DoctorSearchResult, PublicUser};
use crate::scheduling::{self, BookingRequest};

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub message: &'static str,
    pub appointment: Appointment,
}

pub async fn find_doctors(
    State(ctx): State<ApiContext>,
    query: Result<Query<DoctorSearchFilter>, QueryRejection>,
) -> Result<Json<Vec<DoctorSearchResult>>, ApiError> {
    let Query(filter) = query?;
    let doctors = ctx
        .blocking(move |conn| scheduling::find_doctors(conn, &filter))
        .await?;
    Ok(Json(doctors))
}

pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<PublicUser>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError> {
    let Json(request) = payload?;
    let appointment = ctx
        .blocking(move |conn| scheduling::book(conn, user.id, &request))
        .await?;
    Ok(Json(BookingResponse {
        message: "Appointment booked successfully",
        appointment,
    }))
}
