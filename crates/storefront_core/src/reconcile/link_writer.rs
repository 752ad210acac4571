//! Product-attribute link insertion.

use crate::model::attribute::{AttributeId, AttributeKind, ProductAttributeLink};
use crate::model::product::ProductId;
use crate::repo::attribute_repo::LinkStore;
use crate::repo::RepoResult;

/// Writes one link row per call; existing identical links are not checked.
pub struct LinkWriter<'s, L: LinkStore + ?Sized> {
    store: &'s L,
}

impl<'s, L: LinkStore + ?Sized> LinkWriter<'s, L> {
    pub fn new(store: &'s L) -> Self {
        Self { store }
    }

    pub fn link(
        &self,
        kind: AttributeKind,
        product_id: ProductId,
        attribute_id: AttributeId,
    ) -> RepoResult<ProductAttributeLink> {
        self.store.upsert_link(kind, product_id, attribute_id)
    }
}
