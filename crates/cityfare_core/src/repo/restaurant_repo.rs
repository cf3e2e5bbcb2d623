//! Restaurant repository.
//!
//! # Responsibility
//! - Provide typed CRUD access to the `restaurants` collection.
//! - Validate required restaurant fields before delegating to the port.
//!
//! # Invariants
//! - `find_by_city` is the derived-view query over the forward reference;
//!   it never consults a city's stored reference set.
//! - Creation validates fields only; whether the referenced city exists is
//!   the relationship service's concern.

use crate::model::restaurant::{validate_restaurant_fields, Restaurant};
use crate::repo::{decode_document, RepoResult, RESTAURANTS};
use crate::store::{DocId, DocumentStore, Filter};
use serde_json::json;

/// Typed wrapper for restaurant documents.
pub struct RestaurantRepo<'a, S: DocumentStore> {
    store: &'a S,
}

impl<'a, S: DocumentStore> RestaurantRepo<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates one restaurant pointing at the given city id.
    pub fn create_restaurant(
        &self,
        name: &str,
        address: Option<&str>,
        city: DocId,
    ) -> RepoResult<Restaurant> {
        validate_restaurant_fields(name)?;

        let body = json!({
            "name": name,
            "address": address,
            "city": city.to_string(),
        });
        let id = self.store.create(RESTAURANTS, body)?;

        Ok(Restaurant {
            id,
            name: name.to_string(),
            address: address.map(str::to_string),
            city,
        })
    }

    /// Gets one restaurant by stable id.
    pub fn get_restaurant(&self, id: DocId) -> RepoResult<Option<Restaurant>> {
        match self.store.find_by_id(RESTAURANTS, id)? {
            Some(body) => Ok(Some(decode_document(RESTAURANTS, body)?)),
            None => Ok(None),
        }
    }

    /// Finds the first restaurant with the given name.
    pub fn find_restaurant_by_name(&self, name: &str) -> RepoResult<Option<Restaurant>> {
        let mut matches = self
            .store
            .find_many(RESTAURANTS, &Filter::eq("name", name))?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(decode_document(RESTAURANTS, matches.remove(0))?))
    }

    /// Lists every restaurant.
    pub fn list_restaurants(&self) -> RepoResult<Vec<Restaurant>> {
        self.store
            .find_many(RESTAURANTS, &Filter::all())?
            .into_iter()
            .map(|body| decode_document(RESTAURANTS, body))
            .collect()
    }

    /// Lists the restaurants whose forward reference names the given city.
    pub fn find_by_city(&self, city_id: DocId) -> RepoResult<Vec<Restaurant>> {
        self.store
            .find_many(RESTAURANTS, &Filter::eq("city", city_id.to_string()))?
            .into_iter()
            .map(|body| decode_document(RESTAURANTS, body))
            .collect()
    }

    /// Deletes one restaurant; `true` when something was removed.
    pub fn delete_restaurant(&self, id: DocId) -> RepoResult<bool> {
        Ok(self.store.delete_by_id(RESTAURANTS, id)?)
    }

    /// Deletes every restaurant referencing the given city, returns count.
    pub fn delete_by_city(&self, city_id: DocId) -> RepoResult<usize> {
        Ok(self
            .store
            .delete_many(RESTAURANTS, &Filter::eq("city", city_id.to_string()))?)
    }

    /// Deletes every restaurant and returns the count.
    pub fn delete_all_restaurants(&self) -> RepoResult<usize> {
        Ok(self.store.delete_many(RESTAURANTS, &Filter::all())?)
    }
}
