//! Core catalog logic for the storefront.
//!
//! Owns product persistence, colour/material reconciliation and offset
//! pagination. Front ends (HTTP, CLI) call into `service` only.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod reconcile;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StorefrontConfig};
pub use context::RequestContext;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attribute::{AttributeEntity, AttributeKind, ReconciliationTask};
pub use model::product::{Product, ProductDraft, ProductId, ProductPatch, ValidationError};
pub use pagination::{paginate, parse_page_params, PageDefaults, PaginationResult};
pub use reconcile::{ReconcileError, ReconcileReport, ReconciliationPool};
pub use repo::attribute_repo::{AttributeStore, LinkStore, SqliteAttributeRepository};
pub use repo::product_repo::{ProductStore, SqliteProductRepository};
pub use repo::{RepoError, RepoResult};
pub use service::attribute_service::AttributeService;
pub use service::product_service::{ProductService, ProductServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
