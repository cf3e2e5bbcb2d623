//! Typed repositories over the document persistence port.
//!
//! # Responsibility
//! - Map city/restaurant records to and from JSON document bodies.
//! - Enforce per-entity required-field validation before any write.
//!
//! # Invariants
//! - Repositories never enforce cross-entity integrity; that protocol
//!   belongs to the relationship service.
//! - Malformed stored documents surface as `InvalidDocument`, never masked.

use crate::model::city::CityValidationError;
use crate::model::restaurant::RestaurantValidationError;
use crate::store::{DocId, StoreError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod city_repo;
pub mod restaurant_repo;

/// Collection name for city documents.
pub const CITIES: &str = "cities";
/// Collection name for restaurant documents.
pub const RESTAURANTS: &str = "restaurants";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for typed persistence operations.
#[derive(Debug)]
pub enum RepoError {
    CityValidation(CityValidationError),
    RestaurantValidation(RestaurantValidationError),
    NotFound { collection: String, id: DocId },
    InvalidDocument(String),
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CityValidation(err) => write!(f, "{err}"),
            Self::RestaurantValidation(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "no document in `{collection}` with id {id}")
            }
            Self::InvalidDocument(details) => {
                write!(f, "invalid persisted document: {details}")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CityValidation(err) => Some(err),
            Self::RestaurantValidation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidDocument(_) => None,
        }
    }
}

impl From<CityValidationError> for RepoError {
    fn from(value: CityValidationError) -> Self {
        Self::CityValidation(value)
    }
}

impl From<RestaurantValidationError> for RepoError {
    fn from(value: RestaurantValidationError) -> Self {
        Self::RestaurantValidation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { collection, id } => Self::NotFound { collection, id },
            other => Self::Store(other),
        }
    }
}

/// Decodes one stored document body into a typed record.
pub(crate) fn decode_document<T: DeserializeOwned>(
    collection: &str,
    body: Value,
) -> RepoResult<T> {
    serde_json::from_value(body).map_err(|err| {
        RepoError::InvalidDocument(format!("undecodable `{collection}` document: {err}"))
    })
}
