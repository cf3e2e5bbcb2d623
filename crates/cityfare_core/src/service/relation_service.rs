//! Relationship protocol between cities and restaurants.
//!
//! # Responsibility
//! - Own link/unlink/cascade/delete operations across both collections.
//! - Detect referential drift introduced by out-of-band edits.
//!
//! # Invariants
//! - This service is the only component that mutates a city's restaurant
//!   reference set.
//! - Multi-step operations run inside a scoped transaction when the store
//!   supports one; otherwise restaurant-side deletions complete before the
//!   city-side step, so a crash mid-sequence leaves at worst a stale
//!   reference, never a live reference to a vanished entity.
//! - No operation performs a partial mutation after a failed id resolution.

use crate::model::city::City;
use crate::model::restaurant::Restaurant;
use crate::repo::city_repo::CityRepo;
use crate::repo::restaurant_repo::RestaurantRepo;
use crate::repo::RepoError;
use crate::store::{DocId, DocumentStore, StoreError};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RelationResult<T> = Result<T, RelationError>;

/// One restaurant whose forward reference names a missing city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceViolation {
    pub restaurant: DocId,
    pub missing_city: DocId,
}

impl Display for ReferenceViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "restaurant {} references missing city {}",
            self.restaurant, self.missing_city
        )
    }
}

/// Service error for relationship operations.
#[derive(Debug)]
pub enum RelationError {
    /// The targeted city id does not resolve.
    CityNotFound(DocId),
    /// The targeted restaurant id does not resolve.
    RestaurantNotFound(DocId),
    /// One or more restaurants point at cities that no longer exist.
    ReferentialIntegrity(Vec<ReferenceViolation>),
    /// A transaction-wrapped operation rolled back; nothing was applied.
    TransactionAborted {
        operation: &'static str,
        source: Box<RelationError>,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for RelationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CityNotFound(id) => write!(f, "city not found: {id}"),
            Self::RestaurantNotFound(id) => write!(f, "restaurant not found: {id}"),
            Self::ReferentialIntegrity(violations) => {
                write!(f, "referential integrity violated:")?;
                for violation in violations {
                    write!(f, " [{violation}]")?;
                }
                Ok(())
            }
            Self::TransactionAborted { operation, source } => {
                write!(f, "operation `{operation}` rolled back: {source}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RelationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TransactionAborted { source, .. } => Some(source.as_ref()),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RelationError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<StoreError> for RelationError {
    fn from(value: StoreError) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Relationship manager over one shared document store.
pub struct RelationService<'a, S: DocumentStore> {
    store: &'a S,
    cities: CityRepo<'a, S>,
    restaurants: RestaurantRepo<'a, S>,
}

impl<'a, S: DocumentStore> RelationService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            cities: CityRepo::new(store),
            restaurants: RestaurantRepo::new(store),
        }
    }

    /// Adds a restaurant to a city's reference set.
    ///
    /// Idempotent: re-linking an already-linked pair changes nothing. Fails
    /// without mutation when either id does not resolve.
    pub fn link_restaurant(
        &self,
        city_id: DocId,
        restaurant_id: DocId,
    ) -> RelationResult<City> {
        self.require_city("link_restaurant", city_id)?;
        self.require_restaurant("link_restaurant", restaurant_id)?;

        let city = self.cities.add_restaurant_ref(city_id, restaurant_id)?;
        info!(
            "event=link_restaurant module=relation status=ok city={city_id} restaurant={restaurant_id}"
        );
        Ok(city)
    }

    /// Removes a restaurant from a city's reference set.
    ///
    /// Idempotent: unlinking an absent pair is a no-op, not an error.
    pub fn unlink_restaurant(
        &self,
        city_id: DocId,
        restaurant_id: DocId,
    ) -> RelationResult<City> {
        self.require_city("unlink_restaurant", city_id)?;
        self.require_restaurant("unlink_restaurant", restaurant_id)?;

        let city = self.cities.remove_restaurant_ref(city_id, restaurant_id)?;
        info!(
            "event=unlink_restaurant module=relation status=ok city={city_id} restaurant={restaurant_id}"
        );
        Ok(city)
    }

    /// Deletes a city and every restaurant referencing it.
    ///
    /// Restaurants are removed before the city record so a failure partway
    /// through never leaves a restaurant pointing at a vanished city.
    /// Returns the number of restaurants removed.
    pub fn delete_city_cascade(&self, city_id: DocId) -> RelationResult<usize> {
        self.require_city("delete_city_cascade", city_id)?;

        let result = if self.store.supports_scoped_transactions() {
            self.store
                .scoped_transaction(|_store| self.cascade_steps(city_id))
                .map_err(|err| RelationError::TransactionAborted {
                    operation: "delete_city_cascade",
                    source: Box::new(err),
                })
        } else {
            self.cascade_steps(city_id)
        };

        match &result {
            Ok(deleted) => info!(
                "event=delete_city_cascade module=relation status=ok city={city_id} restaurants_deleted={deleted}"
            ),
            Err(err) => error!(
                "event=delete_city_cascade module=relation status=error city={city_id} error={err}"
            ),
        }
        result
    }

    /// Deletes a restaurant and unlinks it from its city's reference set.
    ///
    /// The restaurant record goes first: a stale reference-set entry is a
    /// detectable, repairable state, while a live restaurant missing from
    /// its city's set would silently break the reverse index.
    pub fn delete_restaurant(&self, restaurant_id: DocId) -> RelationResult<()> {
        let Some(restaurant) = self.restaurants.get_restaurant(restaurant_id)? else {
            error!(
                "event=delete_restaurant module=relation status=error restaurant={restaurant_id} error_code=restaurant_not_found"
            );
            return Err(RelationError::RestaurantNotFound(restaurant_id));
        };

        let city_id = restaurant.city;
        if self.cities.get_city(city_id)?.is_none() {
            let violation = ReferenceViolation {
                restaurant: restaurant_id,
                missing_city: city_id,
            };
            error!(
                "event=delete_restaurant module=relation status=error restaurant={restaurant_id} city={city_id} error_code=referential_integrity"
            );
            return Err(RelationError::ReferentialIntegrity(vec![violation]));
        }

        let result = if self.store.supports_scoped_transactions() {
            self.store
                .scoped_transaction(|_store| self.delete_restaurant_steps(city_id, restaurant_id))
                .map_err(|err| RelationError::TransactionAborted {
                    operation: "delete_restaurant",
                    source: Box::new(err),
                })
        } else {
            self.delete_restaurant_steps(city_id, restaurant_id)
        };

        match &result {
            Ok(()) => info!(
                "event=delete_restaurant module=relation status=ok restaurant={restaurant_id} city={city_id}"
            ),
            Err(err) => error!(
                "event=delete_restaurant module=relation status=error restaurant={restaurant_id} city={city_id} error={err}"
            ),
        }
        result
    }

    /// Reports every restaurant whose city reference does not resolve.
    ///
    /// Invokable independently of the mutating operations to detect drift
    /// from out-of-band edits.
    pub fn verify_integrity(&self) -> RelationResult<()> {
        let known_cities: BTreeSet<DocId> = self
            .cities
            .list_cities()?
            .into_iter()
            .map(|city| city.id)
            .collect();

        let violations: Vec<ReferenceViolation> = self
            .restaurants
            .list_restaurants()?
            .into_iter()
            .filter(|restaurant| !known_cities.contains(&restaurant.city))
            .map(|restaurant| ReferenceViolation {
                restaurant: restaurant.id,
                missing_city: restaurant.city,
            })
            .collect();

        if violations.is_empty() {
            info!("event=verify_integrity module=relation status=ok");
            return Ok(());
        }

        warn!(
            "event=verify_integrity module=relation status=error violations={}",
            violations.len()
        );
        Err(RelationError::ReferentialIntegrity(violations))
    }

    /// Resolves a restaurant together with its owning city.
    ///
    /// A dangling city reference surfaces as `ReferentialIntegrity` instead
    /// of a bare not-found, because the restaurant itself exists.
    pub fn restaurant_with_city(
        &self,
        restaurant_id: DocId,
    ) -> RelationResult<(Restaurant, City)> {
        let Some(restaurant) = self.restaurants.get_restaurant(restaurant_id)? else {
            return Err(RelationError::RestaurantNotFound(restaurant_id));
        };

        let Some(city) = self.cities.get_city(restaurant.city)? else {
            return Err(RelationError::ReferentialIntegrity(vec![
                ReferenceViolation {
                    restaurant: restaurant_id,
                    missing_city: restaurant.city,
                },
            ]));
        };

        Ok((restaurant, city))
    }

    fn cascade_steps(&self, city_id: DocId) -> RelationResult<usize> {
        let deleted = self.restaurants.delete_by_city(city_id)?;
        self.cities.delete_city(city_id)?;
        Ok(deleted)
    }

    fn delete_restaurant_steps(
        &self,
        city_id: DocId,
        restaurant_id: DocId,
    ) -> RelationResult<()> {
        self.restaurants.delete_restaurant(restaurant_id)?;
        self.cities.remove_restaurant_ref(city_id, restaurant_id)?;
        Ok(())
    }

    fn require_city(&self, operation: &'static str, city_id: DocId) -> RelationResult<()> {
        if self.cities.get_city(city_id)?.is_none() {
            error!(
                "event={operation} module=relation status=error city={city_id} error_code=city_not_found"
            );
            return Err(RelationError::CityNotFound(city_id));
        }
        Ok(())
    }

    fn require_restaurant(
        &self,
        operation: &'static str,
        restaurant_id: DocId,
    ) -> RelationResult<()> {
        if self.restaurants.get_restaurant(restaurant_id)?.is_none() {
            error!(
                "event={operation} module=relation status=error restaurant={restaurant_id} error_code=restaurant_not_found"
            );
            return Err(RelationError::RestaurantNotFound(restaurant_id));
        }
        Ok(())
    }
}
