//! Restaurant-count-per-city report.
//!
//! # Responsibility
//! - Group restaurants by their city reference and join city attributes.
//! - Project the result to a flat, id-free output shape.
//!
//! # Invariants
//! - Cities with zero restaurants never appear: the group runs over the
//!   restaurants collection.
//! - Rows whose city vanished are dropped by the unwind stage rather than
//!   surfaced with missing attributes.
//! - Result ordering is unspecified; callers needing determinism sort by
//!   `city_name`.

use crate::repo::{CITIES, RESTAURANTS};
use crate::store::{Accumulator, DocumentStore, Pipeline, ProjectField, StoreError};
use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ReportResult<T> = Result<T, ReportError>;

/// Report error for aggregation runs.
#[derive(Debug)]
pub enum ReportError {
    Store(StoreError),
    InvalidRow(String),
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidRow(details) => write!(f, "invalid report row: {details}"),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidRow(_) => None,
        }
    }
}

impl From<StoreError> for ReportError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// One output row: city attributes joined with its restaurant count.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CityRestaurantCount {
    pub city_name: String,
    pub country: String,
    pub total_restaurants: u64,
}

/// Counts restaurants per city, joined with city name and country.
pub fn restaurant_counts_by_city<S: DocumentStore>(
    store: &S,
) -> ReportResult<Vec<CityRestaurantCount>> {
    let pipeline = Pipeline::new()
        .group("city", vec![Accumulator::count("total_restaurants")])
        .lookup(CITIES, "city", "id", "city_info")
        .unwind("city_info")
        .project(vec![
            ProjectField::new("city_name", "city_info.name"),
            ProjectField::new("country", "city_info.country"),
            ProjectField::new("total_restaurants", "total_restaurants"),
        ]);

    let rows = store.aggregate(RESTAURANTS, &pipeline)?;
    let counts: Vec<CityRestaurantCount> = rows
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|err| ReportError::InvalidRow(err.to_string()))
        })
        .collect::<ReportResult<_>>()?;

    info!(
        "event=restaurant_counts module=report status=ok rows={}",
        counts.len()
    );
    Ok(counts)
}
