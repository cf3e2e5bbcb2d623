//! City repository.
//!
//! # Responsibility
//! - Provide typed CRUD access to the `cities` collection.
//! - Validate required city fields before delegating to the port.
//!
//! # Invariants
//! - The `restaurants` reference set is only mutated through
//!   `add_restaurant_ref` / `remove_restaurant_ref`, which are plumbing for
//!   the relationship service and use atomic set semantics.

use crate::model::city::{validate_city_fields, City};
use crate::repo::{decode_document, RepoResult, CITIES};
use crate::store::{DocId, DocumentStore, Filter, Patch};
use serde_json::json;
use std::collections::BTreeSet;

/// Typed wrapper for city documents.
pub struct CityRepo<'a, S: DocumentStore> {
    store: &'a S,
}

impl<'a, S: DocumentStore> CityRepo<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates one city with an empty restaurant reference set.
    pub fn create_city(&self, name: &str, country: &str) -> RepoResult<City> {
        validate_city_fields(name, country)?;

        let body = json!({
            "name": name,
            "country": country,
            "restaurants": [],
        });
        let id = self.store.create(CITIES, body)?;

        Ok(City {
            id,
            name: name.to_string(),
            country: country.to_string(),
            restaurants: BTreeSet::new(),
        })
    }

    /// Gets one city by stable id.
    pub fn get_city(&self, id: DocId) -> RepoResult<Option<City>> {
        match self.store.find_by_id(CITIES, id)? {
            Some(body) => Ok(Some(decode_document(CITIES, body)?)),
            None => Ok(None),
        }
    }

    /// Finds the first city with the given name.
    pub fn find_city_by_name(&self, name: &str) -> RepoResult<Option<City>> {
        let mut matches = self.store.find_many(CITIES, &Filter::eq("name", name))?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(decode_document(CITIES, matches.remove(0))?))
    }

    /// Lists every city.
    pub fn list_cities(&self) -> RepoResult<Vec<City>> {
        self.store
            .find_many(CITIES, &Filter::all())?
            .into_iter()
            .map(|body| decode_document(CITIES, body))
            .collect()
    }

    /// Adds one restaurant id to a city's reference set (idempotent).
    ///
    /// Relationship-service plumbing; other callers must go through
    /// `RelationService::link_restaurant`.
    pub fn add_restaurant_ref(&self, city_id: DocId, restaurant_id: DocId) -> RepoResult<City> {
        let patch = Patch::add_to_set("restaurants", restaurant_id.to_string());
        let body = self.store.update_by_id(CITIES, city_id, &patch)?;
        decode_document(CITIES, body)
    }

    /// Removes one restaurant id from a city's reference set (idempotent).
    ///
    /// Relationship-service plumbing; other callers must go through
    /// `RelationService::unlink_restaurant`.
    pub fn remove_restaurant_ref(&self, city_id: DocId, restaurant_id: DocId) -> RepoResult<City> {
        let patch = Patch::pull("restaurants", restaurant_id.to_string());
        let body = self.store.update_by_id(CITIES, city_id, &patch)?;
        decode_document(CITIES, body)
    }

    /// Deletes one city; `true` when something was removed.
    pub fn delete_city(&self, id: DocId) -> RepoResult<bool> {
        Ok(self.store.delete_by_id(CITIES, id)?)
    }

    /// Deletes every city and returns the count.
    pub fn delete_all_cities(&self) -> RepoResult<usize> {
        Ok(self.store.delete_many(CITIES, &Filter::all())?)
    }
}
