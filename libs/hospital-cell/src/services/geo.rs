// Mean radius of the earth in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// `south_west.lng > north_east.lng` means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

/// Great-circle distance in metres (haversine).
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let a = (dlat / 2.0).sin() * (dlat / 2.0).sin()
        + lat1.cos() * lat2.cos() * (dlng / 2.0).sin() * (dlng / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Smallest latitude/longitude box containing every point within
/// `radius_m` of `center`.
pub fn bbox_around(center: &Coordinate, radius_m: f64) -> Bbox {
    let angular = radius_m / EARTH_RADIUS_M;
    let dlat = angular.to_degrees();
    let min_lat = center.lat - dlat;
    let max_lat = center.lat + dlat;

    // The circle reaches a pole, so it spans every longitude.
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return Bbox {
            south_west: Coordinate { lat: min_lat.max(-90.0), lng: -180.0 },
            north_east: Coordinate { lat: max_lat.min(90.0), lng: 180.0 },
        };
    }

    let ratio = angular.sin() / center.lat.to_radians().cos();
    if ratio >= 1.0 {
        return Bbox {
            south_west: Coordinate { lat: min_lat, lng: -180.0 },
            north_east: Coordinate { lat: max_lat, lng: 180.0 },
        };
    }

    let dlng = ratio.asin().to_degrees();
    Bbox {
        south_west: Coordinate { lat: min_lat, lng: wrap_longitude(center.lng - dlng) },
        north_east: Coordinate { lat: max_lat, lng: wrap_longitude(center.lng + dlng) },
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if lng < -180.0 {
        lng + 360.0
    } else if lng > 180.0 {
        lng - 360.0
    } else {
        lng
    }
}
