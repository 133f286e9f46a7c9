use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::hospitals::decode_reviews;
use shared_database::models::{HospitalEntity, StoredReview};
use shared_database::DbError;
use shared_models::error::AppError;

use crate::services::GeoSearchError;

pub const DEFAULT_RADIUS: u32 = 5000;
pub const MIN_RADIUS: u32 = 100;
pub const MAX_RADIUS: u32 = 50_000;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 50;
pub const MAX_REVIEWER_LENGTH: usize = 100;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HospitalLocation {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalReview {
    pub reviewer: String,
    pub comment: String,
    pub rating: f64,
}

impl From<StoredReview> for HospitalReview {
    fn from(review: StoredReview) -> Self {
        Self {
            reviewer: review.reviewer,
            comment: review.comment,
            rating: review.rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub distance: Option<f64>,
    pub location: HospitalLocation,
    pub rating: Option<f64>,
    pub reviews: Vec<HospitalReview>,
}

impl From<HospitalEntity> for Hospital {
    fn from(entity: HospitalEntity) -> Self {
        let reviews = decode_reviews(&entity)
            .into_iter()
            .map(HospitalReview::from)
            .collect();

        Self {
            id: entity.id,
            name: entity.name,
            address: entity.address,
            distance: entity.distance,
            location: HospitalLocation {
                lat: entity.lat,
                lng: entity.lng,
            },
            rating: entity.rating,
            reviews,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyHospitalsResponse {
    pub hospitals: Vec<Hospital>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub message: String,
    pub hospital: Hospital,
}

fn default_radius() -> u32 {
    DEFAULT_RADIUS
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl NearbyQuery {
    pub fn validate(&self) -> Result<(), HospitalError> {
        validate_point(self.lat, self.lon)?;
        validate_radius(self.radius)?;
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(HospitalError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(())
    }
}

/// Search over hospitals already stored locally.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredSearchQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "default_radius")]
    pub radius: u32,
}

impl StoredSearchQuery {
    pub fn validate(&self) -> Result<(), HospitalError> {
        validate_point(self.lat, self.lon)?;
        validate_radius(self.radius)
    }
}

fn validate_point(lat: f64, lon: f64) -> Result<(), HospitalError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(HospitalError::Validation(
            "lat must be between -90 and 90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(HospitalError::Validation(
            "lon must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

fn validate_radius(radius: u32) -> Result<(), HospitalError> {
    if !(MIN_RADIUS..=MAX_RADIUS).contains(&radius) {
        return Err(HospitalError::Validation(format!(
            "radius must be between {} and {}",
            MIN_RADIUS, MAX_RADIUS
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub reviewer: String,
    pub comment: String,
    pub rating: f64,
}

impl ReviewRequest {
    /// Validates and trims the review into its stored form.
    pub fn into_stored(self) -> Result<StoredReview, HospitalError> {
        if !self.rating.is_finite() || !(0.0..=MAX_RATING).contains(&self.rating) {
            return Err(HospitalError::Validation(format!(
                "rating must be between 0 and {}",
                MAX_RATING
            )));
        }

        let reviewer = self.reviewer.trim();
        if reviewer.is_empty() {
            return Err(HospitalError::Validation(
                "reviewer must not be blank".to_string(),
            ));
        }
        if reviewer.chars().count() > MAX_REVIEWER_LENGTH {
            return Err(HospitalError::Validation(format!(
                "reviewer must be at most {} characters",
                MAX_REVIEWER_LENGTH
            )));
        }

        let comment = self.comment.trim();
        if comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err(HospitalError::Validation(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        Ok(StoredReview {
            reviewer: reviewer.to_string(),
            comment: comment.to_string(),
            rating: self.rating,
        })
    }
}

#[derive(Debug, Error)]
pub enum HospitalError {
    #[error("{0}")]
    Validation(String),

    #[error("Hospital not found")]
    NotFound,

    #[error(transparent)]
    GeoSearch(#[from] GeoSearchError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<HospitalError> for AppError {
    fn from(err: HospitalError) -> Self {
        match err {
            HospitalError::Validation(msg) => AppError::ValidationError(msg),
            HospitalError::NotFound => AppError::NotFound("Hospital not found".to_string()),
            HospitalError::GeoSearch(GeoSearchError::Status { status }) => AppError::Upstream {
                status,
                message: "Failed to fetch nearby hospitals from TomTom API".to_string(),
            },
            HospitalError::GeoSearch(e) => AppError::ExternalService(e.to_string()),
            HospitalError::Database(DbError::NotFound) => {
                AppError::NotFound("Hospital not found".to_string())
            }
            HospitalError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
