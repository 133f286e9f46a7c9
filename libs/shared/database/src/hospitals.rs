use std::collections::HashSet;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::{debug, warn};

use crate::models::{HospitalCandidate, HospitalEntity, NewHospital, StoredReview};
use crate::schema::hospitals::dsl;
use crate::{now_millis, DbError};

/// Normalized identity of a hospital: case- and whitespace-insensitive name
/// and address plus coordinates rounded to roughly one metre.
pub fn lookup_key(name: &str, address: &str, lat: f64, lng: f64) -> String {
    format!(
        "{}|{}|{:.5}|{:.5}",
        normalize_text(name),
        normalize_text(address),
        normalize_coordinate(lat),
        normalize_coordinate(lng)
    )
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_coordinate(c: f64) -> f64 {
    let rounded = (c * 100_000.0).round() / 100_000.0;
    // -0.0 and 0.0 must produce the same key
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Inserts the candidate if no hospital with the same lookup key exists,
/// otherwise refreshes the stored distance. The returned entity carries the
/// candidate's distance and coordinates even when the stored row was first
/// discovered with slightly different ones.
pub fn upsert_hospital(
    conn: &mut SqliteConnection,
    candidate: &HospitalCandidate,
) -> Result<HospitalEntity, DbError> {
    let key = lookup_key(&candidate.name, &candidate.address, candidate.lat, candidate.lng);
    let now = now_millis();

    let existing = dsl::hospitals
        .filter(dsl::lookup_key.eq(key.as_str()))
        .select(HospitalEntity::as_select())
        .first(conn)
        .optional()?;

    match existing {
        Some(hospital) => {
            if hospital.distance != candidate.distance {
                diesel::update(dsl::hospitals.find(hospital.id))
                    .set((dsl::distance.eq(candidate.distance), dsl::updated_at.eq(now)))
                    .execute(conn)?;
            }
            Ok(HospitalEntity {
                lat: candidate.lat,
                lng: candidate.lng,
                distance: candidate.distance,
                updated_at: now,
                ..hospital
            })
        }
        None => {
            debug!("Storing newly discovered hospital: {}", candidate.name);
            let new_hospital = NewHospital {
                name: &candidate.name,
                address: &candidate.address,
                lat: candidate.lat,
                lng: candidate.lng,
                distance: candidate.distance,
                rating: None,
                reviews: None,
                lookup_key: &key,
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(dsl::hospitals)
                .values(&new_hospital)
                .execute(conn)?;

            dsl::hospitals
                .filter(dsl::lookup_key.eq(key.as_str()))
                .select(HospitalEntity::as_select())
                .first(conn)
                .map_err(Into::into)
        }
    }
}

/// Upserts all candidates in one transaction. The result keeps the input
/// order; candidates that resolve to an already returned row are dropped.
pub fn upsert_hospitals(
    conn: &mut SqliteConnection,
    candidates: &[HospitalCandidate],
) -> Result<Vec<HospitalEntity>, DbError> {
    conn.immediate_transaction(|conn| {
        let mut seen = HashSet::new();
        let mut stored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let hospital = upsert_hospital(conn, candidate)?;
            if seen.insert(hospital.id) {
                stored.push(hospital);
            }
        }
        Ok(stored)
    })
}

pub fn get_hospital(conn: &mut SqliteConnection, id: i64) -> Result<Option<HospitalEntity>, DbError> {
    dsl::hospitals
        .find(id)
        .select(HospitalEntity::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

/// Hospitals whose coordinates fall inside the given bounding box.
pub fn list_hospitals_in_bbox(
    conn: &mut SqliteConnection,
    south_west: (f64, f64),
    north_east: (f64, f64),
) -> Result<Vec<HospitalEntity>, DbError> {
    let (min_lat, min_lng) = south_west;
    let (max_lat, max_lng) = north_east;

    let mut query = dsl::hospitals
        .filter(dsl::lat.between(min_lat, max_lat))
        .select(HospitalEntity::as_select())
        .into_boxed();

    // A box crossing the antimeridian wraps around.
    if min_lng <= max_lng {
        query = query.filter(dsl::lng.between(min_lng, max_lng));
    } else {
        query = query.filter(dsl::lng.ge(min_lng).or(dsl::lng.le(max_lng)));
    }

    query.order(dsl::id.asc()).load(conn).map_err(Into::into)
}

pub fn count_hospitals(conn: &mut SqliteConnection) -> Result<i64, DbError> {
    dsl::hospitals.count().get_result(conn).map_err(Into::into)
}

/// Appends a review and recomputes the mean rating. Runs in an immediate
/// transaction so concurrent reviews of one hospital are serialized.
pub fn add_review(
    conn: &mut SqliteConnection,
    hospital_id: i64,
    review: StoredReview,
) -> Result<HospitalEntity, DbError> {
    conn.immediate_transaction(|conn| {
        let hospital = dsl::hospitals
            .find(hospital_id)
            .select(HospitalEntity::as_select())
            .first(conn)
            .optional()?
            .ok_or(DbError::NotFound)?;

        let mut reviews = parse_reviews(hospital.reviews.as_deref())?;
        reviews.push(review);

        let rating = mean_rating(&reviews);
        let encoded = serde_json::to_string(&reviews)?;
        let now = now_millis();

        diesel::update(dsl::hospitals.find(hospital_id))
            .set((
                dsl::reviews.eq(Some(encoded.as_str())),
                dsl::rating.eq(rating),
                dsl::updated_at.eq(now),
            ))
            .execute(conn)?;

        debug!(
            "Hospital {} now has {} review(s), rating {:?}",
            hospital_id,
            reviews.len(),
            rating
        );

        Ok(HospitalEntity {
            reviews: Some(encoded),
            rating,
            updated_at: now,
            ..hospital
        })
    })
}

/// Strict parse of the stored review blob. An empty or missing blob is an
/// empty list.
pub fn parse_reviews(raw: Option<&str>) -> Result<Vec<StoredReview>, DbError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw).map_err(Into::into),
    }
}

/// Lenient variant for read paths: a malformed blob is logged and shown as
/// no reviews.
pub fn decode_reviews(hospital: &HospitalEntity) -> Vec<StoredReview> {
    parse_reviews(hospital.reviews.as_deref()).unwrap_or_else(|e| {
        warn!("Ignoring malformed reviews of hospital {}: {}", hospital.id, e);
        Vec::new()
    })
}

pub fn mean_rating(reviews: &[StoredReview]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let total: f64 = reviews.iter().map(|r| r.rating).sum();
    Some(total / reviews.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: f64) -> StoredReview {
        StoredReview {
            reviewer: "Asha".to_string(),
            comment: "Clean wards".to_string(),
            rating,
        }
    }

    #[test]
    fn test_lookup_key_ignores_case_and_spacing() {
        let a = lookup_key("Apollo  Hospitals", "Greams Road, Chennai", 13.0674, 80.2785);
        let b = lookup_key(" apollo hospitals", "GREAMS ROAD,  Chennai ", 13.067401, 80.278499);
        assert_eq!(a, b);
    }

    #[test]
    fn test_lookup_key_distinguishes_locations() {
        let a = lookup_key("City Clinic", "Main St", 10.0, 20.0);
        let b = lookup_key("City Clinic", "Main St", 10.001, 20.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_lookup_key_signed_zero() {
        assert_eq!(lookup_key("a", "b", -0.000001, 0.0), lookup_key("a", "b", 0.0, 0.0));
    }

    #[test]
    fn test_mean_rating() {
        assert_eq!(mean_rating(&[]), None);
        assert_eq!(mean_rating(&[review(4.0), review(2.0)]), Some(3.0));
        assert_eq!(mean_rating(&[review(5.0), review(4.0), review(4.5)]), Some(4.5));
    }

    #[test]
    fn test_parse_reviews() {
        assert!(parse_reviews(None).unwrap().is_empty());
        assert!(parse_reviews(Some("  ")).unwrap().is_empty());

        let parsed =
            parse_reviews(Some(r#"[{"reviewer":"Asha","comment":"ok","rating":3.5}]"#)).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].rating, 3.5);

        assert!(parse_reviews(Some("[{'reviewer': 'python repr'}]")).is_err());
    }
}
