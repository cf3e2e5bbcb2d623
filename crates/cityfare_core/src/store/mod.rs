//! Document persistence port and its SQLite implementation.
//!
//! # Responsibility
//! - Define collection-level CRUD, patch and aggregation contracts over
//!   untyped JSON documents.
//! - Keep storage details out of repositories and services.
//!
//! # Invariants
//! - Documents are JSON objects; the store injects the assigned id into the
//!   body under `"id"` so joins can match on it.
//! - Set mutations (`add_to_set` / `pull`) are atomic at the storage layer.
//! - The port has no knowledge of the city/restaurant relationship.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod pipeline;
pub mod query;
mod sqlite;

pub use pipeline::{Accumulator, Pipeline, ProjectField, Stage};
pub use query::{Filter, Patch};
pub use sqlite::SqliteDocumentStore;

use serde_json::Value;

/// Stable identifier for every stored document.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type DocId = Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic error for document persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound { collection: String, id: DocId },
    InvalidDocument(String),
    InvalidPatch(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found in `{collection}`: {id}")
            }
            Self::InvalidDocument(details) => write!(f, "invalid document: {details}"),
            Self::InvalidPatch(details) => write!(f, "invalid patch: {details}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence port over named collections of JSON documents.
///
/// Each single-document operation is atomic on its own; multi-step callers
/// that need all-or-nothing semantics must probe
/// `supports_scoped_transactions` and wrap the steps in `scoped_transaction`.
pub trait DocumentStore {
    /// Inserts one document and returns its assigned id.
    fn create(&self, collection: &str, body: Value) -> StoreResult<DocId>;
    /// Loads one document by id, `None` when absent.
    fn find_by_id(&self, collection: &str, id: DocId) -> StoreResult<Option<Value>>;
    /// Loads every document matching the filter; empty when none match.
    fn find_many(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>>;
    /// Applies a patch atomically and returns the updated document.
    fn update_by_id(&self, collection: &str, id: DocId, patch: &Patch) -> StoreResult<Value>;
    /// Deletes one document; `true` when something was removed.
    fn delete_by_id(&self, collection: &str, id: DocId) -> StoreResult<bool>;
    /// Deletes every document matching the filter and returns the count.
    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<usize>;
    /// Runs an aggregation pipeline rooted at the given collection.
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Value>>;

    /// Whether `scoped_transaction` provides real all-or-nothing semantics.
    fn supports_scoped_transactions(&self) -> bool {
        false
    }

    /// Runs `block` as one unit of work where supported.
    ///
    /// The default executes the block without atomicity; callers that require
    /// rollback must check `supports_scoped_transactions` first and fall back
    /// to failure-ordering rules when it is `false`.
    fn scoped_transaction<T, E>(&self, block: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
    {
        block(self)
    }
}
