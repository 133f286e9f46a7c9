pub mod geo;
pub mod hospital;
pub mod tomtom;

pub use hospital::HospitalService;
pub use tomtom::{GeoSearchError, TomTomClient};
