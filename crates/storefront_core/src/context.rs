//! Request-scoped caller data passed explicitly into use cases.

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Per-request data passed into product use cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated caller, when the outer layer resolved one.
    pub actor_id: Option<Uuid>,
    /// Point after which reconciliation workers stop taking new tasks.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Actor id rendered for log lines.
    pub fn actor_label(&self) -> String {
        self.actor_id
            .map_or_else(|| "anonymous".to_string(), |id| id.to_string())
    }
}
