use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{
    Hospital, NearbyHospitalsResponse, NearbyQuery, ReviewRequest, ReviewResponse,
    StoredSearchQuery,
};
use crate::router::HospitalState;
use crate::services::HospitalService;

fn hospital_service(state: &HospitalState) -> HospitalService {
    HospitalService::new(state.db.clone(), state.geosearch.clone())
}

fn hospital_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    id.map(|Path(id)| id)
        .map_err(|e| AppError::ValidationError(e.body_text()))
}

#[axum::debug_handler]
pub async fn nearby_hospitals(
    State(state): State<Arc<HospitalState>>,
    query: Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<NearbyHospitalsResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let response = hospital_service(&state).nearby(query).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn stored_hospitals(
    State(state): State<Arc<HospitalState>>,
    query: Result<Query<StoredSearchQuery>, QueryRejection>,
) -> Result<Json<NearbyHospitalsResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let response = hospital_service(&state).stored_near(query).await?;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_hospital(
    State(state): State<Arc<HospitalState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Hospital>, AppError> {
    let id = hospital_id(id)?;
    debug!("Fetching hospital {}", id);

    let hospital = hospital_service(&state).get(id).await?;

    Ok(Json(hospital))
}

#[axum::debug_handler]
pub async fn add_review(
    State(state): State<Arc<HospitalState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewResponse>, AppError> {
    let id = hospital_id(id)?;
    let Json(request) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let response = hospital_service(&state).add_review(id, request).await?;

    Ok(Json(response))
}
