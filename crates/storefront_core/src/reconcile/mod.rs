//! Attribute reconciliation: resolve colour/material labels and link them
//! to a product with a bounded worker pool.
//!
//! # Responsibility
//! - `AttributeResolver`: get-or-create one label.
//! - `LinkWriter`: insert one product link.
//! - `ReconciliationPool`: fan tasks out to workers, fan the first failure in.
//!
//! # Invariants
//! - At most one error is surfaced per pool run; later ones are dropped.
//! - No task starts after a failure has been recorded.
//! - The pool returns only after every worker thread has exited.

use crate::model::attribute::ReconciliationTask;
use crate::model::product::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod link_writer;
pub mod pool;
pub mod resolver;

pub use link_writer::LinkWriter;
pub use pool::ReconciliationPool;
pub use resolver::{AttributeResolver, Resolution};

/// Successful pool run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// One per task; duplicate labels each get their own link.
    pub links_created: usize,
    /// Entities inserted by this run; labels found or lost to a concurrent
    /// writer are not counted.
    pub attributes_created: usize,
}

/// First failure observed during a pool run.
#[derive(Debug)]
pub enum ReconcileError {
    /// A task was rejected before any worker started.
    InvalidTask {
        task: ReconciliationTask,
        source: ValidationError,
    },
    /// Resolving or linking one task failed in storage.
    Task {
        task: ReconciliationTask,
        source: RepoError,
    },
    /// The request deadline passed before the queue drained.
    DeadlineExceeded,
    /// A worker thread panicked.
    WorkerPanicked,
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTask { task, source } => {
                write!(f, "invalid {} task `{}`: {source}", task.kind, task.label)
            }
            Self::Task { task, source } => write!(
                f,
                "failed to reconcile {} `{}` for product {}: {source}",
                task.kind, task.label, task.product_id
            ),
            Self::DeadlineExceeded => write!(f, "attribute reconciliation deadline exceeded"),
            Self::WorkerPanicked => write!(f, "attribute reconciliation worker panicked"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTask { source, .. } => Some(source),
            Self::Task { source, .. } => Some(source),
            Self::DeadlineExceeded | Self::WorkerPanicked => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory attribute/link store with knobs for failure injection.

    use crate::model::attribute::{
        AttributeEntity, AttributeId, AttributeKind, ProductAttributeLink,
    };
    use crate::model::product::ProductId;
    use crate::repo::attribute_repo::{AttributeStore, LinkStore};
    use crate::repo::{RepoError, RepoResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Default)]
    pub struct FakeCatalog {
        entities: Mutex<HashMap<(AttributeKind, String), AttributeEntity>>,
        links: Mutex<Vec<ProductAttributeLink>>,
        create_calls: AtomicUsize,
        lookup_calls: AtomicUsize,
        /// Create stores the entity but reports a conflict, as if another
        /// writer got there first.
        race_on_create: bool,
        fail_lookup_for: Option<String>,
        panic_on: Option<String>,
        lookup_delay: Option<Duration>,
    }

    impl FakeCatalog {
        /// Every create loses a race against an invisible writer.
        pub fn racing() -> Self {
            Self {
                race_on_create: true,
                ..Self::default()
            }
        }

        /// Lookups of `key` fail with `RepoError::InvalidData`.
        pub fn failing_lookup(key: &str) -> Self {
            Self {
                fail_lookup_for: Some(key.to_string()),
                ..Self::default()
            }
        }

        /// Lookups of `key` panic.
        pub fn panicking(key: &str) -> Self {
            Self {
                panic_on: Some(key.to_string()),
                ..Self::default()
            }
        }

        /// Every lookup sleeps for `delay` first.
        pub fn slow(delay: Duration) -> Self {
            Self {
                lookup_delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn create_calls(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }

        pub fn lookup_calls(&self) -> usize {
            self.lookup_calls.load(Ordering::SeqCst)
        }

        pub fn entity(&self, kind: AttributeKind, key: &str) -> Option<AttributeEntity> {
            self.entities
                .lock()
                .unwrap()
                .get(&(kind, key.to_string()))
                .cloned()
        }

        pub fn links_for(&self, product_id: ProductId) -> Vec<ProductAttributeLink> {
            self.links
                .lock()
                .unwrap()
                .iter()
                .filter(|link| link.product_id == product_id)
                .cloned()
                .collect()
        }
    }

    impl AttributeStore for FakeCatalog {
        fn find_by_key(&self, kind: AttributeKind, key: &str) -> RepoResult<AttributeEntity> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.lookup_delay {
                std::thread::sleep(delay);
            }
            if self.panic_on.as_deref() == Some(key) {
                panic!("injected panic for {key}");
            }
            if self.fail_lookup_for.as_deref() == Some(key) {
                return Err(RepoError::InvalidData(format!("lookup failed: {key}")));
            }
            self.entity(kind, key).ok_or_else(|| RepoError::NotFound {
                entity: kind.as_str(),
                key: key.to_string(),
            })
        }

        fn create(&self, kind: AttributeKind, label: &str) -> RepoResult<AttributeEntity> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let mut entities = self.entities.lock().unwrap();
            let key = (kind, label.to_string());
            if entities.contains_key(&key) {
                return Err(RepoError::Conflict {
                    entity: kind.as_str(),
                    key: label.to_string(),
                });
            }
            let entity = AttributeEntity {
                id: Uuid::new_v4(),
                label: label.to_string(),
                created_at: 1,
                last_updated: None,
            };
            entities.insert(key, entity.clone());
            if self.race_on_create {
                return Err(RepoError::Conflict {
                    entity: kind.as_str(),
                    key: entity.label,
                });
            }
            Ok(entity)
        }

        fn count(&self, kind: AttributeKind) -> RepoResult<i64> {
            let entities = self.entities.lock().unwrap();
            Ok(entities.keys().filter(|(k, _)| *k == kind).count() as i64)
        }

        fn list(
            &self,
            kind: AttributeKind,
            offset: i32,
            limit: i32,
        ) -> RepoResult<Vec<AttributeEntity>> {
            let entities = self.entities.lock().unwrap();
            let mut matching: Vec<_> = entities
                .iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|(_, entity)| entity.clone())
                .collect();
            matching.sort_by(|a, b| a.label.cmp(&b.label));
            Ok(matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }
    }

    impl LinkStore for FakeCatalog {
        fn upsert_link(
            &self,
            kind: AttributeKind,
            product_id: ProductId,
            attribute_id: AttributeId,
        ) -> RepoResult<ProductAttributeLink> {
            let link = ProductAttributeLink {
                id: Uuid::new_v4(),
                kind,
                product_id,
                attribute_id,
                created_at: 1,
            };
            self.links.lock().unwrap().push(link.clone());
            Ok(link)
        }

        fn count_for_product(&self, kind: AttributeKind, product_id: ProductId) -> RepoResult<i64> {
            Ok(self
                .links_for(product_id)
                .iter()
                .filter(|link| link.kind == kind)
                .count() as i64)
        }

        fn list_for_product(
            &self,
            kind: AttributeKind,
            product_id: ProductId,
            offset: i32,
            limit: i32,
        ) -> RepoResult<Vec<AttributeEntity>> {
            let entities = self.entities.lock().unwrap();
            Ok(self
                .links_for(product_id)
                .iter()
                .filter(|link| link.kind == kind)
                .filter_map(|link| {
                    entities
                        .values()
                        .find(|entity| entity.id == link.attribute_id)
                        .cloned()
                })
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }
    }
}
