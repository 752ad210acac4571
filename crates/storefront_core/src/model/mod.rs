//! Catalog domain model.
//!
//! # Responsibility
//! - Define products, attribute entities and product-attribute links.
//! - Own input validation and label normalization rules.
//!
//! # Invariants
//! - Every stored record is identified by a v4 `Uuid` generated in core.
//! - Attribute entities are created and read by core, never mutated.

pub mod attribute;
pub mod product;
