//! Product domain model and request validation.
//!
//! # Responsibility
//! - Define the stored product shape and the create/update request shapes.
//! - Validate request input before any storage call.
//! - Merge update requests onto stored products with patch semantics.
//!
//! # Invariants
//! - Decimal fields (`price`, `rating`, `discount_rate`) are stored as
//!   plain decimal text.
//! - `stock` and `review_count` are never negative.
//! - An update field that is absent or blank keeps the stored value.

use super::attribute::{normalize_label, AttributeKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid decimal regex"));

pub type ProductId = Uuid;

/// Input validation failure. Raised before storage is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankName,
    InvalidDecimal { field: &'static str, value: String },
    NegativeCount { field: &'static str, value: i32 },
    InvalidCategoryId(String),
    InvalidProductId(String),
    BlankAttributeLabel { kind: AttributeKind, index: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "product name must not be blank"),
            Self::InvalidDecimal { field, value } => {
                write!(f, "{field} must be a non-negative decimal, got `{value}`")
            }
            Self::NegativeCount { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
            Self::InvalidCategoryId(value) => write!(f, "invalid category id `{value}`"),
            Self::InvalidProductId(value) => write!(f, "invalid product id `{value}`"),
            Self::BlankAttributeLabel { kind, index } => {
                write!(f, "{kind} label at position {index} is blank")
            }
        }
    }
}

impl Error for ValidationError {}

/// Stored product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: String,
    pub stock: i32,
    pub sub_category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub rating: String,
    pub review_count: i32,
    pub discount_rate: String,
    pub keywords: Option<String>,
    pub is_active: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds; `None` until the first update.
    pub last_updated: Option<i64>,
}

/// Validated insert parameters for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: String,
    pub stock: i32,
    pub sub_category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub keywords: Option<String>,
}

/// Validated full-row update parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUpdate {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: String,
    pub stock: i32,
    pub sub_category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub rating: String,
    pub review_count: i32,
    pub discount_rate: String,
    pub keywords: Option<String>,
    pub is_active: bool,
}

/// Create request as decoded from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: String,
    pub stock: i32,
    /// Raw sub-category id; must parse as a UUID.
    pub sub_category_id: String,
    pub brand: Option<String>,
    pub keywords: Option<String>,
    pub colours: Vec<String>,
    pub materials: Vec<String>,
}

impl ProductDraft {
    /// Validates the draft and produces insert parameters with a fresh id.
    ///
    /// Attribute labels are checked too, so a bad label fails the request
    /// before the product row is written.
    pub fn validate(&self) -> Result<NewProduct, ValidationError> {
        let name = non_blank(Some(self.name.as_str())).ok_or(ValidationError::BlankName)?;
        let price = decimal("price", self.price.as_str())?;
        non_negative("stock", self.stock)?;
        let sub_category_id = parse_category_id(self.sub_category_id.as_str())?;
        validate_labels(AttributeKind::Colour, &self.colours)?;
        validate_labels(AttributeKind::Material, &self.materials)?;

        Ok(NewProduct {
            id: Uuid::new_v4(),
            name,
            description: non_blank(self.description.as_deref()),
            image_url: non_blank(self.image_url.as_deref()),
            price,
            stock: self.stock,
            sub_category_id: Some(sub_category_id),
            brand: non_blank(self.brand.as_deref()),
            keywords: non_blank(self.keywords.as_deref()),
        })
    }
}

/// Update request. Absent, blank or zero fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<String>,
    pub stock: Option<i32>,
    pub sub_category_id: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<i32>,
    pub discount_rate: Option<String>,
    pub keywords: Option<String>,
    pub is_active: Option<bool>,
    pub colours: Vec<String>,
    pub materials: Vec<String>,
}

impl ProductPatch {
    /// Merges this patch onto `existing`, validating only supplied fields.
    pub fn merge_onto(&self, existing: &Product) -> Result<ProductUpdate, ValidationError> {
        let price = match non_blank(self.price.as_deref()) {
            Some(value) => decimal("price", value.as_str())?,
            None => existing.price.clone(),
        };
        let rating = match non_blank(self.rating.as_deref()) {
            Some(value) => decimal("rating", value.as_str())?,
            None => existing.rating.clone(),
        };
        let discount_rate = match non_blank(self.discount_rate.as_deref()) {
            Some(value) => decimal("discount_rate", value.as_str())?,
            None => existing.discount_rate.clone(),
        };
        let stock = match non_zero(self.stock) {
            Some(value) => non_negative("stock", value)?,
            None => existing.stock,
        };
        let review_count = match non_zero(self.review_count) {
            Some(value) => non_negative("review_count", value)?,
            None => existing.review_count,
        };
        let sub_category_id = match non_blank(self.sub_category_id.as_deref()) {
            Some(value) => Some(parse_category_id(value.as_str())?),
            None => existing.sub_category_id,
        };
        validate_labels(AttributeKind::Colour, &self.colours)?;
        validate_labels(AttributeKind::Material, &self.materials)?;

        Ok(ProductUpdate {
            id: existing.id,
            name: non_blank(self.name.as_deref()).unwrap_or_else(|| existing.name.clone()),
            description: non_blank(self.description.as_deref())
                .or_else(|| existing.description.clone()),
            image_url: non_blank(self.image_url.as_deref()).or_else(|| existing.image_url.clone()),
            price,
            stock,
            sub_category_id,
            brand: non_blank(self.brand.as_deref()).or_else(|| existing.brand.clone()),
            rating,
            review_count,
            discount_rate,
            keywords: non_blank(self.keywords.as_deref()).or_else(|| existing.keywords.clone()),
            is_active: self.is_active.unwrap_or(existing.is_active),
        })
    }
}

/// Parses a raw product id from the caller.
pub fn parse_product_id(value: &str) -> Result<ProductId, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::InvalidProductId(value.to_string()))
}

/// Rejects blank labels, reporting the first offending position.
pub fn validate_labels(kind: AttributeKind, labels: &[String]) -> Result<(), ValidationError> {
    match labels
        .iter()
        .position(|label| normalize_label(kind, label).is_none())
    {
        Some(index) => Err(ValidationError::BlankAttributeLabel { kind, index }),
        None => Ok(()),
    }
}

/// Parses a raw sub-category id from the caller.
pub fn parse_category_id(value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::InvalidCategoryId(value.to_string()))
}

fn decimal(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if DECIMAL_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidDecimal {
            field,
            value: value.to_string(),
        })
    }
}

fn non_negative(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeCount { field, value });
    }
    Ok(value)
}

/// Zero counts in a patch mean "not supplied".
fn non_zero(value: Option<i32>) -> Option<i32> {
    value.filter(|count| *count != 0)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
