use axum::extract::Extension;
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

/// A care feature that is routed and authenticated but has no backend yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CareFeature {
    HealthRecords,
    Appointments,
    Telemedicine,
}

impl CareFeature {
    pub fn label(&self) -> &'static str {
        match self {
            CareFeature::HealthRecords => "Health records",
            CareFeature::Appointments => "Appointments",
            CareFeature::Telemedicine => "Telemedicine",
        }
    }

    fn not_implemented(&self, user: &User) -> AppError {
        debug!("{} requested by {}", self.label(), user.uid);
        AppError::NotImplemented(format!("{} is not implemented yet", self.label()))
    }
}

pub async fn list_health_records(Extension(user): Extension<User>) -> AppError {
    CareFeature::HealthRecords.not_implemented(&user)
}

pub async fn create_health_record(Extension(user): Extension<User>) -> AppError {
    CareFeature::HealthRecords.not_implemented(&user)
}

pub async fn list_appointments(Extension(user): Extension<User>) -> AppError {
    CareFeature::Appointments.not_implemented(&user)
}

pub async fn book_appointment(Extension(user): Extension<User>) -> AppError {
    CareFeature::Appointments.not_implemented(&user)
}

pub async fn list_sessions(Extension(user): Extension<User>) -> AppError {
    CareFeature::Telemedicine.not_implemented(&user)
}

pub async fn create_session(Extension(user): Extension<User>) -> AppError {
    CareFeature::Telemedicine.not_implemented(&user)
}
