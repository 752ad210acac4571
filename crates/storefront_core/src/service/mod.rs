//! Catalog use-case services.
//!
//! # Responsibility
//! - Turn validated requests into store calls and reconciliation runs.
//! - Keep callers (HTTP handlers, CLI) away from storage details.

pub mod attribute_service;
pub mod product_service;
