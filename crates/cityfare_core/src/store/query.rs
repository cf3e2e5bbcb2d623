//! Structured filters and patches over JSON documents.
//!
//! # Responsibility
//! - Express equality/membership predicates for `find_many`/`delete_many`.
//! - Express field replacement and set-add/set-remove mutations for
//!   `update_by_id`.
//!
//! # Invariants
//! - A filter is a conjunction: every clause must match.
//! - `add_to_set` never produces duplicates; `pull` of an absent value is a
//!   no-op. Both reject non-array targets instead of corrupting them.

use crate::store::{StoreError, StoreResult};
use serde_json::Value;

/// Conjunction of field predicates. `Filter::all()` matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Filter {
    /// Matches every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Single equality predicate on a top-level field.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    /// Adds an equality predicate.
    ///
    /// When the document field holds an array, equality means containment,
    /// so reference-set fields can be queried by member.
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a membership predicate: the field value must be one of `values`.
    pub fn and_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.clauses.push(Clause::In {
            field: field.into(),
            values,
        });
        self
    }

    /// Evaluates this filter against one document.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(doc))
    }
}

impl Clause {
    fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::Eq { field, value } => match field_value(doc, field) {
                Value::Array(items) => items.contains(value),
                stored => stored == value,
            },
            Self::In { field, values } => values.contains(field_value(doc, field)),
        }
    }
}

/// Ordered sequence of mutations applied to one document.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    ops: Vec<PatchOp>,
}

#[derive(Debug, Clone)]
enum PatchOp {
    Set { field: String, value: Value },
    AddToSet { field: String, value: Value },
    Pull { field: String, value: Value },
}

impl Patch {
    /// Single field replacement.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(field, value)
    }

    /// Single set-add on an array-valued field.
    pub fn add_to_set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_add_to_set(field, value)
    }

    /// Single set-remove on an array-valued field.
    pub fn pull(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_pull(field, value)
    }

    /// Appends a field replacement.
    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Set {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a set-add; re-adding a present value is a no-op.
    pub fn and_add_to_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::AddToSet {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a set-remove; removing an absent value is a no-op.
    pub fn and_pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Pull {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Applies every operation in order to `doc`.
    pub fn apply(&self, doc: &mut Value) -> StoreResult<()> {
        let Some(map) = doc.as_object_mut() else {
            return Err(StoreError::InvalidPatch(
                "patch target must be a JSON object".to_string(),
            ));
        };

        for op in &self.ops {
            match op {
                PatchOp::Set { field, value } => {
                    map.insert(field.clone(), value.clone());
                }
                PatchOp::AddToSet { field, value } => {
                    match map.get_mut(field) {
                        None | Some(Value::Null) => {
                            map.insert(field.clone(), Value::Array(vec![value.clone()]));
                        }
                        Some(Value::Array(items)) => {
                            if !items.contains(value) {
                                items.push(value.clone());
                            }
                        }
                        Some(_) => {
                            return Err(StoreError::InvalidPatch(format!(
                                "add_to_set target `{field}` is not an array"
                            )));
                        }
                    };
                }
                PatchOp::Pull { field, value } => {
                    match map.get_mut(field) {
                        None | Some(Value::Null) => {}
                        Some(Value::Array(items)) => {
                            items.retain(|item| item != value);
                        }
                        Some(_) => {
                            return Err(StoreError::InvalidPatch(format!(
                                "pull target `{field}` is not an array"
                            )));
                        }
                    };
                }
            }
        }

        Ok(())
    }
}

/// Resolves a top-level field, treating a missing field as JSON null.
fn field_value<'doc>(doc: &'doc Value, field: &str) -> &'doc Value {
    doc.get(field).unwrap_or(&Value::Null)
}
