//! Restaurant domain model.
//!
//! # Responsibility
//! - Define the restaurant record and its single city reference.
//! - Validate required fields before any write path persists a restaurant.
//!
//! # Invariants
//! - `name` is non-empty after trimming.
//! - `city` always names exactly one city id; the address is optional.

use crate::store::DocId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted restaurant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    /// Stable id assigned by the document store.
    pub id: DocId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Forward reference to the owning city.
    pub city: DocId,
}

/// Required-field validation failure for restaurant writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestaurantValidationError {
    EmptyName,
}

impl Display for RestaurantValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "restaurant name must not be empty"),
        }
    }
}

impl Error for RestaurantValidationError {}

/// Validates restaurant required fields for create paths.
pub fn validate_restaurant_fields(name: &str) -> Result<(), RestaurantValidationError> {
    if name.trim().is_empty() {
        return Err(RestaurantValidationError::EmptyName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_restaurant_fields, RestaurantValidationError};

    #[test]
    fn validation_rejects_empty_name() {
        assert_eq!(
            validate_restaurant_fields(" "),
            Err(RestaurantValidationError::EmptyName)
        );
    }

    #[test]
    fn validation_accepts_filled_name() {
        assert!(validate_restaurant_fields("La Giralda").is_ok());
    }
}
