//! Core relationship and aggregation logic for cityfare.
//! This crate is the single source of truth for cross-entity invariants
//! between cities and the restaurants that reference them.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod report;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::city::{City, CityValidationError};
pub use model::restaurant::{Restaurant, RestaurantValidationError};
pub use repo::city_repo::CityRepo;
pub use repo::restaurant_repo::RestaurantRepo;
pub use repo::{RepoError, RepoResult, CITIES, RESTAURANTS};
pub use report::city_counts::{
    restaurant_counts_by_city, CityRestaurantCount, ReportError, ReportResult,
};
pub use service::relation_service::{
    ReferenceViolation, RelationError, RelationResult, RelationService,
};
pub use store::{
    Accumulator, DocId, DocumentStore, Filter, Patch, Pipeline, ProjectField,
    SqliteDocumentStore, Stage, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
