//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into relationship-level protocols.
//! - Keep callers decoupled from storage and document details.

pub mod relation_service;
