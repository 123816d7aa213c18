//! Business profile collection: validation, persistence, and REST routes.

pub mod collector;
pub mod model;
pub mod routes;
pub mod validation;

pub use collector::ProfileCollector;
pub use model::{BusinessProfile, CompanySize, ProfileDraft};
