//! Domain model for the city/restaurant relationship.
//!
//! # Responsibility
//! - Define the two related entity shapes used by core business logic.
//! - Keep required-field validation next to the data it guards.
//!
//! # Invariants
//! - Every entity is identified by a stable `DocId` assigned on creation.
//! - A restaurant always carries exactly one city reference; a city carries
//!   a duplicate-free set of restaurant references.

pub mod city;
pub mod restaurant;
