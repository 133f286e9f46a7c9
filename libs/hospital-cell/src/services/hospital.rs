use std::sync::Arc;

use tracing::{debug, info};

use shared_database::hospitals;
use shared_database::Database;

use crate::models::{
    Hospital, HospitalError, NearbyHospitalsResponse, NearbyQuery, ReviewRequest, ReviewResponse,
    StoredSearchQuery,
};
use crate::services::geo::{self, Coordinate};
use crate::services::TomTomClient;

pub struct HospitalService {
    db: Database,
    geosearch: Arc<TomTomClient>,
}

impl HospitalService {
    pub fn new(db: Database, geosearch: Arc<TomTomClient>) -> Self {
        Self { db, geosearch }
    }

    /// Queries the geosearch provider and stores every hospital it reports.
    /// The response keeps provider order.
    pub async fn nearby(&self, query: NearbyQuery) -> Result<NearbyHospitalsResponse, HospitalError> {
        query.validate()?;

        let candidates = self
            .geosearch
            .search_hospitals(query.lat, query.lon, query.radius, query.limit)
            .await?;

        if candidates.is_empty() {
            debug!("No hospitals near ({}, {})", query.lat, query.lon);
            return Ok(NearbyHospitalsResponse {
                hospitals: Vec::new(),
            });
        }

        let stored = self
            .db
            .run(move |conn| hospitals::upsert_hospitals(conn, &candidates))
            .await?;

        info!(
            "Nearby search at ({}, {}) returned {} hospital(s)",
            query.lat,
            query.lon,
            stored.len()
        );

        Ok(NearbyHospitalsResponse {
            hospitals: stored.into_iter().map(Hospital::from).collect(),
        })
    }

    /// Hospitals already stored within the radius, nearest first. The
    /// returned distance is measured from the query point.
    pub async fn stored_near(
        &self,
        query: StoredSearchQuery,
    ) -> Result<NearbyHospitalsResponse, HospitalError> {
        query.validate()?;

        let center = Coordinate {
            lat: query.lat,
            lng: query.lon,
        };
        let radius = f64::from(query.radius);
        let bbox = geo::bbox_around(&center, radius);

        let in_box = self
            .db
            .run(move |conn| {
                hospitals::list_hospitals_in_bbox(
                    conn,
                    (bbox.south_west.lat, bbox.south_west.lng),
                    (bbox.north_east.lat, bbox.north_east.lng),
                )
            })
            .await?;

        let mut found: Vec<Hospital> = in_box
            .into_iter()
            .filter_map(|entity| {
                let d = geo::distance(
                    &center,
                    &Coordinate {
                        lat: entity.lat,
                        lng: entity.lng,
                    },
                );
                (d <= radius).then(|| Hospital {
                    distance: Some(d),
                    ..Hospital::from(entity)
                })
            })
            .collect();

        found.sort_by(|a, b| {
            a.distance
                .unwrap_or(f64::MAX)
                .total_cmp(&b.distance.unwrap_or(f64::MAX))
        });

        debug!(
            "Stored search at ({}, {}) radius={} matched {} hospital(s)",
            query.lat,
            query.lon,
            query.radius,
            found.len()
        );

        Ok(NearbyHospitalsResponse { hospitals: found })
    }

    pub async fn get(&self, id: i64) -> Result<Hospital, HospitalError> {
        self.db
            .run(move |conn| hospitals::get_hospital(conn, id))
            .await?
            .map(Hospital::from)
            .ok_or(HospitalError::NotFound)
    }

    pub async fn add_review(
        &self,
        id: i64,
        request: ReviewRequest,
    ) -> Result<ReviewResponse, HospitalError> {
        let review = request.into_stored()?;
        debug!("Adding review by {} to hospital {}", review.reviewer, id);

        let updated = self
            .db
            .run(move |conn| hospitals::add_review(conn, id, review))
            .await
            .map_err(|e| match e {
                shared_database::DbError::NotFound => HospitalError::NotFound,
                other => HospitalError::Database(other),
            })?;

        info!("Hospital {} rating is now {:?}", id, updated.rating);

        Ok(ReviewResponse {
            message: "Review added successfully".to_string(),
            hospital: Hospital::from(updated),
        })
    }
}
