//! HTTP API handlers for triage-server

pub mod health;
pub mod imaging;
pub mod interview;
pub mod records;
pub mod screening;
pub mod sync;
pub mod triage;

pub use health::health_routes;
pub use imaging::imaging_routes;
pub use interview::interview_routes;
pub use records::record_routes;
pub use screening::screening_routes;
pub use sync::sync_routes;
pub use triage::triage_routes;
