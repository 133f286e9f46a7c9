// All `_at` columns hold unix timestamps in milliseconds.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{hospitals, users};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserEntity {
    pub id: i64,
    pub firebase_uid: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub firebase_uid: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub role: &'a str,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = hospitals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HospitalEntity {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub distance: Option<f64>,
    pub rating: Option<f64>,
    pub reviews: Option<String>,
    pub lookup_key: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = hospitals)]
pub(crate) struct NewHospital<'a> {
    pub name: &'a str,
    pub address: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub distance: Option<f64>,
    pub rating: Option<f64>,
    pub reviews: Option<&'a str>,
    pub lookup_key: &'a str,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A hospital as reported by the geosearch provider, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalCandidate {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub distance: Option<f64>,
}

/// One element of the JSON array kept in `hospitals.reviews`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReview {
    pub reviewer: String,
    pub comment: String,
    pub rating: f64,
}
