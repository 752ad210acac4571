//! Product use-case service.
//!
//! # Responsibility
//! - Create and update products, then reconcile their colour/material links.
//! - Serve paginated product listings and per-product attribute listings.
//!
//! # Invariants
//! - All request validation happens before the first storage call.
//! - Update uses patch semantics: absent, blank or zero fields keep stored
//!   values.
//! - A product write is not rolled back when reconciliation fails; the
//!   error carries the product id so the caller can retry
//!   `reconcile_attributes`.

use crate::config::StorefrontConfig;
use crate::context::RequestContext;
use crate::model::attribute::{AttributeEntity, AttributeKind, ReconciliationTask};
use crate::model::product::{
    parse_category_id, validate_labels, Product, ProductDraft, ProductId, ProductPatch,
    ValidationError,
};
use crate::pagination::{paginate, PageDefaults, PaginationResult};
use crate::reconcile::{ReconcileError, ReconcileReport, ReconciliationPool};
use crate::repo::attribute_repo::{AttributeStore, LinkStore};
use crate::repo::product_repo::ProductStore;
use crate::repo::RepoError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for product use cases.
#[derive(Debug)]
pub enum ProductServiceError {
    /// Request input rejected before storage was touched.
    Validation(ValidationError),
    /// Target product does not exist.
    ProductNotFound(ProductId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Product row is persisted but its attribute links are incomplete.
    Reconciliation {
        product_id: ProductId,
        source: ReconcileError,
    },
}

impl Display for ProductServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ProductNotFound(id) => write!(f, "product not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Reconciliation { product_id, source } => write!(
                f,
                "product {product_id} saved but attribute reconciliation failed: {source}"
            ),
        }
    }
}

impl Error for ProductServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Reconciliation { source, .. } => Some(source),
            Self::ProductNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for ProductServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ProductServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ProductServiceResult<T> = Result<T, ProductServiceError>;

/// Product service over product, attribute and link stores.
pub struct ProductService<'s, P, A, L>
where
    P: ProductStore + ?Sized,
    A: AttributeStore + ?Sized,
    L: LinkStore + ?Sized,
{
    products: &'s P,
    links: &'s L,
    pool: ReconciliationPool<'s, A, L>,
    page_defaults: PageDefaults,
}

impl<'s, P, A, L> ProductService<'s, P, A, L>
where
    P: ProductStore + ?Sized,
    A: AttributeStore + ?Sized,
    L: LinkStore + ?Sized,
{
    /// Creates a service; worker count and page defaults come from `config`.
    pub fn new(
        products: &'s P,
        attributes: &'s A,
        links: &'s L,
        config: &StorefrontConfig,
    ) -> Self {
        Self {
            products,
            links,
            pool: ReconciliationPool::new(attributes, links, config.reconcile_workers),
            page_defaults: config.page_defaults(),
        }
    }

    /// Validates and stores a new product, then links its colours/materials.
    pub fn create_product(
        &self,
        ctx: &RequestContext,
        draft: &ProductDraft,
    ) -> ProductServiceResult<Product> {
        let new_product = draft.validate()?;
        let product = self.products.create_product(&new_product)?;
        info!(
            "event=product_create module=service status=ok product={} actor={}",
            product.id,
            ctx.actor_label()
        );

        self.run_reconciliation(ctx, product.id, &draft.colours, &draft.materials)?;
        Ok(product)
    }

    /// Merges `patch` onto the stored product, saves it, then links any
    /// supplied colours/materials.
    pub fn update_product(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        patch: &ProductPatch,
    ) -> ProductServiceResult<Product> {
        let existing = self
            .products
            .get_product(product_id)
            .map_err(|err| product_error(err, product_id))?;
        let update = patch.merge_onto(&existing)?;
        let product = self
            .products
            .update_product(&update)
            .map_err(|err| product_error(err, product_id))?;
        info!(
            "event=product_update module=service status=ok product={} actor={}",
            product.id,
            ctx.actor_label()
        );

        self.run_reconciliation(ctx, product.id, &patch.colours, &patch.materials)?;
        Ok(product)
    }

    /// Links labels to an existing product; used to retry after a partial
    /// failure of create/update.
    pub fn reconcile_attributes(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        colours: &[String],
        materials: &[String],
    ) -> ProductServiceResult<ReconcileReport> {
        validate_labels(AttributeKind::Colour, colours)?;
        validate_labels(AttributeKind::Material, materials)?;
        self.products
            .get_product(product_id)
            .map_err(|err| product_error(err, product_id))?;
        self.run_reconciliation(ctx, product_id, colours, materials)
    }

    pub fn get_product(&self, product_id: ProductId) -> ProductServiceResult<Product> {
        self.products
            .get_product(product_id)
            .map_err(|err| product_error(err, product_id))
    }

    /// Deletes a product; its link rows go with it.
    pub fn delete_product(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
    ) -> ProductServiceResult<()> {
        self.products
            .delete_product(product_id)
            .map_err(|err| product_error(err, product_id))?;
        info!(
            "event=product_delete module=service status=ok product={product_id} actor={}",
            ctx.actor_label()
        );
        Ok(())
    }

    pub fn list_products(
        &self,
        page: i32,
        page_size: i32,
    ) -> ProductServiceResult<PaginationResult<Vec<Product>>> {
        let total = self.products.count_products()?;
        let result = paginate(total, page, page_size, self.page_defaults, |offset, limit| {
            self.products.list_products(offset, limit)
        })?;
        Ok(result)
    }

    /// Lists products of one sub-category given its raw id.
    pub fn list_products_by_category(
        &self,
        category_id: &str,
        page: i32,
        page_size: i32,
    ) -> ProductServiceResult<PaginationResult<Vec<Product>>> {
        let category_id = parse_category_id(category_id)?;
        let total = self.products.count_products_by_category(category_id)?;
        let result = paginate(total, page, page_size, self.page_defaults, |offset, limit| {
            self.products
                .list_products_by_category(category_id, offset, limit)
        })?;
        Ok(result)
    }

    /// Lists the colours or materials linked to one product, one entry per
    /// link row.
    pub fn list_product_attributes(
        &self,
        kind: AttributeKind,
        product_id: ProductId,
        page: i32,
        page_size: i32,
    ) -> ProductServiceResult<PaginationResult<Vec<AttributeEntity>>> {
        let total = self.links.count_for_product(kind, product_id)?;
        let result = paginate(total, page, page_size, self.page_defaults, |offset, limit| {
            self.links.list_for_product(kind, product_id, offset, limit)
        })?;
        Ok(result)
    }

    fn run_reconciliation(
        &self,
        ctx: &RequestContext,
        product_id: ProductId,
        colours: &[String],
        materials: &[String],
    ) -> ProductServiceResult<ReconcileReport> {
        let tasks = ReconciliationTask::for_product(product_id, colours, materials);
        self.pool.reconcile(tasks, ctx).map_err(|source| {
            error!(
                "event=product_reconcile module=service status=error product={product_id} error={source}"
            );
            ProductServiceError::Reconciliation { product_id, source }
        })
    }
}

fn product_error(err: RepoError, product_id: ProductId) -> ProductServiceError {
    if err.is_not_found() {
        ProductServiceError::ProductNotFound(product_id)
    } else {
        ProductServiceError::Repo(err)
    }
}
