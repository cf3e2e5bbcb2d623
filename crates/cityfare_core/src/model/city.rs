//! City domain model.
//!
//! # Responsibility
//! - Define the city record including its restaurant reference set.
//! - Validate required fields before any write path persists a city.
//!
//! # Invariants
//! - `name` and `country` are non-empty after trimming.
//! - `restaurants` holds restaurant ids without duplicates; insertion order
//!   is irrelevant, so a `BTreeSet` keeps reads deterministic.

use crate::store::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted city record.
///
/// The `restaurants` set is derived data maintained exclusively by the
/// relationship service; repositories never mutate it on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Stable id assigned by the document store.
    pub id: DocId,
    pub name: String,
    pub country: String,
    /// Reverse references to restaurants that claim this city.
    #[serde(default)]
    pub restaurants: BTreeSet<DocId>,
}

impl City {
    /// Returns whether this city currently tracks the given restaurant.
    pub fn references(&self, restaurant_id: DocId) -> bool {
        self.restaurants.contains(&restaurant_id)
    }
}

/// Required-field validation failure for city writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityValidationError {
    EmptyName,
    EmptyCountry,
}

impl Display for CityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "city name must not be empty"),
            Self::EmptyCountry => write!(f, "city country must not be empty"),
        }
    }
}

impl Error for CityValidationError {}

/// Validates city required fields for create paths.
pub fn validate_city_fields(name: &str, country: &str) -> Result<(), CityValidationError> {
    if name.trim().is_empty() {
        return Err(CityValidationError::EmptyName);
    }
    if country.trim().is_empty() {
        return Err(CityValidationError::EmptyCountry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_city_fields, CityValidationError};

    #[test]
    fn validation_rejects_empty_name() {
        assert_eq!(
            validate_city_fields("  ", "Spain"),
            Err(CityValidationError::EmptyName)
        );
    }

    #[test]
    fn validation_rejects_empty_country() {
        assert_eq!(
            validate_city_fields("Madrid", ""),
            Err(CityValidationError::EmptyCountry)
        );
    }

    #[test]
    fn validation_accepts_filled_fields() {
        assert!(validate_city_fields("Madrid", "Spain").is_ok());
    }
}
