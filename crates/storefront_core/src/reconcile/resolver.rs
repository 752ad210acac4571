//! Get-or-create resolution of attribute labels.
//!
//! # Invariants
//! - Lookup uses the normalized key; `NotFound` is the only error that
//!   triggers creation.
//! - A `Conflict` on create means another writer won; the winner is re-fetched.

use crate::model::attribute::{normalize_label, AttributeEntity, AttributeKind};
use crate::repo::attribute_repo::AttributeStore;
use crate::repo::{RepoError, RepoResult};
use log::{debug, info};

/// Resolved entity plus whether this call inserted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub entity: AttributeEntity,
    pub created: bool,
}

/// Resolves labels to durable attribute entities.
pub struct AttributeResolver<'s, S: AttributeStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: AttributeStore + ?Sized> AttributeResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Returns the entity stored under `label`, creating it when absent.
    ///
    /// Errors other than `NotFound` on lookup are returned unchanged.
    pub fn resolve(&self, kind: AttributeKind, label: &str) -> RepoResult<AttributeEntity> {
        self.resolve_tracked(kind, label)
            .map(|resolution| resolution.entity)
    }

    /// Like `resolve`, but reports whether the entity was inserted here.
    /// A lost create race counts as found, not created.
    pub fn resolve_tracked(&self, kind: AttributeKind, label: &str) -> RepoResult<Resolution> {
        let key = normalize_label(kind, label)
            .ok_or_else(|| RepoError::InvalidData(format!("blank {kind} label")))?;

        match self.store.find_by_key(kind, &key) {
            Ok(entity) => {
                return Ok(Resolution {
                    entity,
                    created: false,
                })
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        match self.store.create(kind, &key) {
            Ok(entity) => {
                info!(
                    "event=attribute_create module=reconcile status=ok kind={kind} id={}",
                    entity.id
                );
                Ok(Resolution {
                    entity,
                    created: true,
                })
            }
            Err(RepoError::Conflict { .. }) => {
                debug!("event=attribute_create module=reconcile status=refetch kind={kind}");
                self.store
                    .find_by_key(kind, &key)
                    .map(|entity| Resolution {
                        entity,
                        created: false,
                    })
            }
            Err(err) => Err(err),
        }
    }
}
