//! Aggregation pipeline stages and their evaluators.
//!
//! # Responsibility
//! - Model the four supported stages: group, lookup, unwind, project.
//! - Evaluate the pure stages over in-memory document batches.
//!
//! # Invariants
//! - Stages run strictly in declaration order.
//! - `unwind` drops documents whose field is missing, null or an empty
//!   array; scalar values pass through unchanged.
//! - Evaluators never mutate the source collection.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Ordered sequence of aggregation stages.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

/// One aggregation stage.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Buckets documents by a top-level key and applies accumulators.
    ///
    /// Each output document carries the key under its original field name
    /// plus one field per accumulator.
    Group {
        key: String,
        accumulators: Vec<Accumulator>,
    },
    /// Attaches matching documents from another collection as an array field.
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        output_field: String,
    },
    /// Flattens an array field into one output document per element.
    Unwind { field: String },
    /// Reshapes documents to exactly the listed output fields.
    Project { fields: Vec<ProjectField> },
}

/// Per-group computation for the group stage.
#[derive(Debug, Clone)]
pub struct Accumulator {
    pub output_field: String,
    pub op: AccumulatorOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorOp {
    /// Number of documents in the bucket.
    Count,
}

impl Accumulator {
    /// Document count written to `output_field`.
    pub fn count(output_field: impl Into<String>) -> Self {
        Self {
            output_field: output_field.into(),
            op: AccumulatorOp::Count,
        }
    }
}

/// One projected output field, read from a dotted source path.
#[derive(Debug, Clone)]
pub struct ProjectField {
    pub output_field: String,
    pub source_path: String,
}

impl ProjectField {
    pub fn new(output_field: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            output_field: output_field.into(),
            source_path: source_path.into(),
        }
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, key: impl Into<String>, accumulators: Vec<Accumulator>) -> Self {
        self.stages.push(Stage::Group {
            key: key.into(),
            accumulators,
        });
        self
    }

    pub fn lookup(
        mut self,
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        output_field: impl Into<String>,
    ) -> Self {
        self.stages.push(Stage::Lookup {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            output_field: output_field.into(),
        });
        self
    }

    pub fn unwind(mut self, field: impl Into<String>) -> Self {
        self.stages.push(Stage::Unwind {
            field: field.into(),
        });
        self
    }

    pub fn project(mut self, fields: Vec<ProjectField>) -> Self {
        self.stages.push(Stage::Project { fields });
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// Buckets documents by `key` and emits one document per bucket.
///
/// Bucket order follows the serialized key, so output is deterministic for a
/// given input set even though callers must not rely on any ordering.
pub(crate) fn apply_group(docs: &[Value], key: &str, accumulators: &[Accumulator]) -> Vec<Value> {
    let mut buckets: BTreeMap<String, (Value, u64)> = BTreeMap::new();

    for doc in docs {
        let key_value = doc.get(key).cloned().unwrap_or(Value::Null);
        let bucket = buckets
            .entry(key_value.to_string())
            .or_insert((key_value, 0));
        bucket.1 += 1;
    }

    buckets
        .into_values()
        .map(|(key_value, count)| {
            let mut out = Map::new();
            out.insert(key.to_string(), key_value);
            for accumulator in accumulators {
                match accumulator.op {
                    AccumulatorOp::Count => {
                        out.insert(accumulator.output_field.clone(), Value::from(count));
                    }
                }
            }
            Value::Object(out)
        })
        .collect()
}

/// Joins `foreign` documents onto each input document as an array field.
pub(crate) fn apply_lookup(
    docs: Vec<Value>,
    foreign: &[Value],
    local_field: &str,
    foreign_field: &str,
    output_field: &str,
) -> Vec<Value> {
    docs.into_iter()
        .map(|mut doc| {
            let local_value = doc.get(local_field).cloned().unwrap_or(Value::Null);
            let matched: Vec<Value> = foreign
                .iter()
                .filter(|candidate| {
                    candidate.get(foreign_field).unwrap_or(&Value::Null) == &local_value
                })
                .cloned()
                .collect();
            if let Some(map) = doc.as_object_mut() {
                map.insert(output_field.to_string(), Value::Array(matched));
            }
            doc
        })
        .collect()
}

/// Flattens an array field into one output document per element.
pub(crate) fn apply_unwind(docs: Vec<Value>, field: &str) -> Vec<Value> {
    let mut out = Vec::new();

    for mut doc in docs {
        match doc.get(field).cloned() {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    let mut unwound = doc.clone();
                    if let Some(map) = unwound.as_object_mut() {
                        map.insert(field.to_string(), item);
                    }
                    out.push(unwound);
                }
            }
            Some(scalar) => {
                if let Some(map) = doc.as_object_mut() {
                    map.insert(field.to_string(), scalar);
                }
                out.push(doc);
            }
        }
    }

    out
}

/// Reshapes each document to exactly the projected fields.
///
/// A missing source path omits the output field rather than writing null.
pub(crate) fn apply_project(docs: Vec<Value>, fields: &[ProjectField]) -> Vec<Value> {
    docs.into_iter()
        .map(|doc| {
            let mut out = Map::new();
            for field in fields {
                if let Some(value) = path_value(&doc, &field.source_path) {
                    out.insert(field.output_field.clone(), value.clone());
                }
            }
            Value::Object(out)
        })
        .collect()
}

/// Resolves a dotted path (`"city_info.name"`) inside a document.
fn path_value<'doc>(doc: &'doc Value, path: &str) -> Option<&'doc Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::{apply_group, apply_lookup, apply_project, apply_unwind, Accumulator, ProjectField};
    use serde_json::json;

    #[test]
    fn group_counts_documents_per_key() {
        let docs = vec![
            json!({"city": "madrid"}),
            json!({"city": "madrid"}),
            json!({"city": "milano"}),
        ];
        let grouped = apply_group(&docs, "city", &[Accumulator::count("total")]);

        assert_eq!(grouped.len(), 2);
        assert!(grouped.contains(&json!({"city": "madrid", "total": 2})));
        assert!(grouped.contains(&json!({"city": "milano", "total": 1})));
    }

    #[test]
    fn group_buckets_missing_keys_under_null() {
        let docs = vec![json!({"city": "madrid"}), json!({})];
        let grouped = apply_group(&docs, "city", &[Accumulator::count("total")]);

        assert_eq!(grouped.len(), 2);
        assert!(grouped.contains(&json!({"city": null, "total": 1})));
    }

    #[test]
    fn lookup_attaches_matching_foreign_docs() {
        let docs = vec![json!({"city": "c1"}), json!({"city": "c9"})];
        let foreign = vec![json!({"id": "c1", "name": "Madrid"})];
        let joined = apply_lookup(docs, &foreign, "city", "id", "city_info");

        assert_eq!(
            joined[0],
            json!({"city": "c1", "city_info": [{"id": "c1", "name": "Madrid"}]})
        );
        assert_eq!(joined[1], json!({"city": "c9", "city_info": []}));
    }

    #[test]
    fn unwind_drops_empty_and_missing_arrays() {
        let docs = vec![
            json!({"city_info": [{"name": "Madrid"}]}),
            json!({"city_info": []}),
            json!({}),
        ];
        let unwound = apply_unwind(docs, "city_info");

        assert_eq!(unwound, vec![json!({"city_info": {"name": "Madrid"}})]);
    }

    #[test]
    fn unwind_emits_one_doc_per_element() {
        let docs = vec![json!({"tag": "x", "items": [1, 2]})];
        let unwound = apply_unwind(docs, "items");

        assert_eq!(
            unwound,
            vec![json!({"tag": "x", "items": 1}), json!({"tag": "x", "items": 2})]
        );
    }

    #[test]
    fn project_reads_dotted_paths_and_drops_missing_sources() {
        let docs = vec![json!({"city_info": {"name": "Madrid"}, "total": 2})];
        let projected = apply_project(
            docs,
            &[
                ProjectField::new("city_name", "city_info.name"),
                ProjectField::new("total_restaurants", "total"),
                ProjectField::new("country", "city_info.country"),
            ],
        );

        assert_eq!(
            projected,
            vec![json!({"city_name": "Madrid", "total_restaurants": 2})]
        );
    }
}
