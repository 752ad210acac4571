//! Colour/material attribute model.
//!
//! # Responsibility
//! - Describe attribute entities, product links and reconciliation tasks.
//! - Normalize free-text labels into storage keys.
//!
//! # Invariants
//! - Colour keys are trimmed, whitespace-collapsed and lowercased.
//! - Material keys are trimmed and whitespace-collapsed; case is kept and
//!   storage matches materials case-insensitively.
//! - A blank label never reaches storage.

use super::product::ProductId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

pub type AttributeId = Uuid;

/// Attribute collection a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Keyed by hex-like colour token.
    Colour,
    /// Keyed by material name.
    Material,
}

impl AttributeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Colour => "colour",
            Self::Material => "material",
        }
    }
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable colour or material record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntity {
    pub id: AttributeId,
    /// Colour hex or material name as stored.
    pub label: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub last_updated: Option<i64>,
}

/// One product-to-attribute edge.
///
/// Several links may point at the same (product, attribute) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributeLink {
    pub id: Uuid,
    pub kind: AttributeKind,
    pub product_id: ProductId,
    pub attribute_id: AttributeId,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Unit of work for the reconciliation pool: resolve `label`, then link it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationTask {
    pub kind: AttributeKind,
    pub label: String,
    pub product_id: ProductId,
}

impl ReconciliationTask {
    pub fn new(kind: AttributeKind, label: impl Into<String>, product_id: ProductId) -> Self {
        Self {
            kind,
            label: label.into(),
            product_id,
        }
    }

    /// Builds the task list for one product: colours first, then materials.
    pub fn for_product(product_id: ProductId, colours: &[String], materials: &[String]) -> Vec<Self> {
        colours
            .iter()
            .map(|label| Self::new(AttributeKind::Colour, label.as_str(), product_id))
            .chain(
                materials
                    .iter()
                    .map(|label| Self::new(AttributeKind::Material, label.as_str(), product_id)),
            )
            .collect()
    }
}

/// Normalizes one label into its storage key.
///
/// Returns `None` for blank input.
pub fn normalize_label(kind: AttributeKind, label: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(label.trim(), " ");
    if collapsed.is_empty() {
        return None;
    }
    match kind {
        AttributeKind::Colour => Some(collapsed.to_lowercase()),
        AttributeKind::Material => Some(collapsed.into_owned()),
    }
}
