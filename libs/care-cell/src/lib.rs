pub mod handlers;
pub mod router;

pub use router::{appointment_routes, health_record_routes, telemedicine_routes};
