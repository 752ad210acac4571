//! Colour/material catalogue listings.

use crate::config::StorefrontConfig;
use crate::model::attribute::{AttributeEntity, AttributeKind};
use crate::pagination::{paginate, PageDefaults, PaginationResult};
use crate::repo::attribute_repo::AttributeStore;
use crate::repo::RepoResult;

/// Read-only service over the attribute collections.
pub struct AttributeService<'s, A: AttributeStore + ?Sized> {
    store: &'s A,
    page_defaults: PageDefaults,
}

impl<'s, A: AttributeStore + ?Sized> AttributeService<'s, A> {
    pub fn new(store: &'s A, config: &StorefrontConfig) -> Self {
        Self {
            store,
            page_defaults: config.page_defaults(),
        }
    }

    /// Lists one attribute collection ordered by label.
    pub fn list(
        &self,
        kind: AttributeKind,
        page: i32,
        page_size: i32,
    ) -> RepoResult<PaginationResult<Vec<AttributeEntity>>> {
        let total = self.store.count(kind)?;
        paginate(total, page, page_size, self.page_defaults, |offset, limit| {
            self.store.list(kind, offset, limit)
        })
    }

    pub fn list_colours(
        &self,
        page: i32,
        page_size: i32,
    ) -> RepoResult<PaginationResult<Vec<AttributeEntity>>> {
        self.list(AttributeKind::Colour, page, page_size)
    }

    pub fn list_materials(
        &self,
        page: i32,
        page_size: i32,
    ) -> RepoResult<PaginationResult<Vec<AttributeEntity>>> {
        self.list(AttributeKind::Material, page, page_size)
    }
}
