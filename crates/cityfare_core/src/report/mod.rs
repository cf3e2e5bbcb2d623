//! Derived reporting over the document collections.
//!
//! # Responsibility
//! - Build and run read-only aggregation pipelines.
//! - Never mutate collection state.

pub mod city_counts;
