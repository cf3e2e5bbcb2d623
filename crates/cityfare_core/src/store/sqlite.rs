//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON document bodies in the `documents` table.
//! - Evaluate filters and pipeline stages over collection scans.
//! - Provide savepoint-backed atomicity for patches and scoped units.
//!
//! # Invariants
//! - The connection must be migrated before a store is constructed.
//! - `update_by_id` is read-patch-write inside one savepoint, so concurrent
//!   set mutations on the same document cannot lose updates.
//! - Savepoints nest, so patches issued inside `scoped_transaction` roll
//!   back with the enclosing unit.

use crate::store::pipeline::{apply_group, apply_lookup, apply_project, apply_unwind};
use crate::store::{DocId, DocumentStore, Filter, Patch, Pipeline, Stage, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

/// Document store over a migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    ///
    /// Fails when the `documents` table is absent, which means the caller
    /// skipped `open_db`/`open_db_in_memory`.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        conn.prepare("SELECT 1 FROM documents LIMIT 1;")?;
        Ok(Self { conn })
    }

    fn patch_within_savepoint(
        &self,
        collection: &str,
        id: DocId,
        patch: &Patch,
    ) -> StoreResult<Value> {
        let Some(mut doc) = self.find_by_id(collection, id)? else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            });
        };

        patch.apply(&mut doc)?;

        self.conn.execute(
            "UPDATE documents
             SET body = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?2 AND id = ?3;",
            params![doc.to_string(), collection, id.to_string()],
        )?;

        Ok(doc)
    }

    fn delete_ids_within_savepoint(&self, collection: &str, ids: &[DocId]) -> StoreResult<usize> {
        let mut deleted = 0;
        for id in ids {
            let changed = self.conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id.to_string()],
            )?;
            deleted += changed;
        }
        Ok(deleted)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn create(&self, collection: &str, mut body: Value) -> StoreResult<DocId> {
        let id = Uuid::new_v4();
        let Some(map) = body.as_object_mut() else {
            return Err(StoreError::InvalidDocument(format!(
                "create into `{collection}` requires a JSON object body"
            )));
        };
        map.insert("id".to_string(), Value::String(id.to_string()));

        self.conn.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id.to_string(), body.to_string()],
        )?;

        Ok(id)
    }

    fn find_by_id(&self, collection: &str, id: DocId) -> StoreResult<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(raw) => Ok(Some(parse_body(collection, id, &raw)?)),
            None => Ok(None),
        }
    }

    fn find_many(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![collection])?;
        let mut docs = Vec::new();

        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            let id = parse_doc_id(collection, &id_text)?;
            let raw: String = row.get(1)?;
            let doc = parse_body(collection, id, &raw)?;
            if filter.matches(&doc) {
                docs.push(doc);
            }
        }

        Ok(docs)
    }

    fn update_by_id(&self, collection: &str, id: DocId, patch: &Patch) -> StoreResult<Value> {
        self.conn.execute_batch("SAVEPOINT patch_document;")?;
        let result = self.patch_within_savepoint(collection, id, patch);
        match &result {
            Ok(_) => self.conn.execute_batch("RELEASE patch_document;")?,
            Err(_) => {
                let _ = self
                    .conn
                    .execute_batch("ROLLBACK TO patch_document; RELEASE patch_document;");
            }
        }
        result
    }

    fn delete_by_id(&self, collection: &str, id: DocId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<usize> {
        let ids: Vec<DocId> = self
            .find_many(collection, filter)?
            .iter()
            .map(|doc| doc_id_of(collection, doc))
            .collect::<StoreResult<_>>()?;

        self.conn.execute_batch("SAVEPOINT delete_documents;")?;
        let result = self.delete_ids_within_savepoint(collection, &ids);
        match &result {
            Ok(_) => self.conn.execute_batch("RELEASE delete_documents;")?,
            Err(_) => {
                let _ = self
                    .conn
                    .execute_batch("ROLLBACK TO delete_documents; RELEASE delete_documents;");
            }
        }
        result
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Value>> {
        let mut docs = self.find_many(collection, &Filter::all())?;

        for stage in pipeline.stages() {
            docs = match stage {
                Stage::Group { key, accumulators } => apply_group(&docs, key, accumulators),
                Stage::Lookup {
                    from,
                    local_field,
                    foreign_field,
                    output_field,
                } => {
                    let foreign = self.find_many(from, &Filter::all())?;
                    apply_lookup(docs, &foreign, local_field, foreign_field, output_field)
                }
                Stage::Unwind { field } => apply_unwind(docs, field),
                Stage::Project { fields } => apply_project(docs, fields),
            };
        }

        Ok(docs)
    }

    fn supports_scoped_transactions(&self) -> bool {
        true
    }

    fn scoped_transaction<T, E>(&self, block: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.conn
            .execute_batch("SAVEPOINT scoped_unit;")
            .map_err(|err| E::from(StoreError::from(err)))?;

        match block(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("RELEASE scoped_unit;")
                    .map_err(|err| E::from(StoreError::from(err)))?;
                Ok(value)
            }
            Err(err) => {
                let _ = self
                    .conn
                    .execute_batch("ROLLBACK TO scoped_unit; RELEASE scoped_unit;");
                Err(err)
            }
        }
    }
}

/// Extracts the embedded `"id"` field of a stored document.
fn doc_id_of(collection: &str, doc: &Value) -> StoreResult<DocId> {
    let id_text = doc
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            StoreError::InvalidDocument(format!(
                "document in `{collection}` is missing its embedded id"
            ))
        })?;
    Uuid::parse_str(id_text).map_err(|_| {
        StoreError::InvalidDocument(format!(
            "invalid embedded id `{id_text}` in collection `{collection}`"
        ))
    })
}

fn parse_doc_id(collection: &str, id_text: &str) -> StoreResult<DocId> {
    Uuid::parse_str(id_text).map_err(|_| {
        StoreError::InvalidDocument(format!(
            "invalid id value `{id_text}` in collection `{collection}`"
        ))
    })
}

fn parse_body(collection: &str, id: DocId, raw: &str) -> StoreResult<Value> {
    serde_json::from_str(raw).map_err(|err| {
        StoreError::InvalidDocument(format!(
            "unreadable body for `{collection}`/{id}: {err}"
        ))
    })
}
