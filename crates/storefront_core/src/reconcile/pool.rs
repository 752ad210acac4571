//! Bounded worker pool for reconciliation tasks.
//!
//! # Responsibility
//! - Run resolve + link for every task on a fixed number of worker threads.
//! - Stop handing out work once any task fails or the deadline passes.
//! - Surface exactly one failure to the caller.
//!
//! # Invariants
//! - Workers share one bounded multi-consumer queue fed by a producer thread.
//! - The first failure is kept in a single-write slot; later ones are logged
//!   and dropped.
//! - Tasks already running when a failure is recorded finish normally; no
//!   new task starts afterwards.
//! - `reconcile` blocks until the producer and every worker have exited.

use super::{AttributeResolver, LinkWriter, ReconcileError, ReconcileReport};
use crate::context::RequestContext;
use crate::model::attribute::{normalize_label, ProductAttributeLink, ReconciliationTask};
use crate::model::product::ValidationError;
use crate::repo::attribute_repo::{AttributeStore, LinkStore};
use crate::repo::RepoResult;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

/// Shared state of one `reconcile` call.
#[derive(Default)]
struct RunState {
    first_error: OnceCell<ReconcileError>,
    aborted: AtomicBool,
    links_created: AtomicUsize,
    attributes_created: AtomicUsize,
}

impl RunState {
    fn record_failure(&self, err: ReconcileError) {
        self.aborted.store(true, Ordering::Release);
        if let Err(dropped) = self.first_error.set(err) {
            debug!("event=reconcile_task module=reconcile status=dropped error={dropped}");
        }
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

/// Runs reconciliation tasks on `workers` threads per call.
pub struct ReconciliationPool<'s, A, L>
where
    A: AttributeStore + ?Sized,
    L: LinkStore + ?Sized,
{
    resolver: AttributeResolver<'s, A>,
    writer: LinkWriter<'s, L>,
    workers: usize,
}

impl<'s, A, L> ReconciliationPool<'s, A, L>
where
    A: AttributeStore + ?Sized,
    L: LinkStore + ?Sized,
{
    /// Creates a pool; `workers` below 1 is raised to 1.
    pub fn new(attributes: &'s A, links: &'s L, workers: usize) -> Self {
        Self {
            resolver: AttributeResolver::new(attributes),
            writer: LinkWriter::new(links),
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolves and links every task, returning the first failure if any.
    ///
    /// Labels are validated up front, so a blank label fails before any
    /// storage call. Link rows written before a failure are kept.
    pub fn reconcile(
        &self,
        tasks: Vec<ReconciliationTask>,
        ctx: &RequestContext,
    ) -> Result<ReconcileReport, ReconcileError> {
        if tasks.is_empty() {
            return Ok(ReconcileReport::default());
        }
        if let Some(index) = tasks
            .iter()
            .position(|task| normalize_label(task.kind, &task.label).is_none())
        {
            let task = tasks[index].clone();
            return Err(ReconcileError::InvalidTask {
                source: ValidationError::BlankAttributeLabel {
                    kind: task.kind,
                    index,
                },
                task,
            });
        }

        let started_at = Instant::now();
        let total = tasks.len();
        let worker_count = self.workers.min(total);
        info!(
            "event=reconcile_start module=reconcile status=start tasks={total} workers={worker_count} actor={}",
            ctx.actor_label()
        );

        let state = RunState::default();
        let (sender, receiver) = bounded::<ReconciliationTask>(worker_count);

        thread::scope(|scope| {
            let state = &state;
            let producer = scope.spawn(move || produce(tasks, sender, state));

            let handles: Vec<_> = (0..worker_count)
                .map(|worker_id| {
                    let queue = receiver.clone();
                    scope.spawn(move || self.run_worker(worker_id, queue, state, ctx))
                })
                .collect();
            // Workers hold the only receivers so the producer sees a closed
            // queue once they have all exited.
            drop(receiver);

            for handle in handles {
                if handle.join().is_err() {
                    state.record_failure(ReconcileError::WorkerPanicked);
                }
            }
            if producer.join().is_err() {
                state.record_failure(ReconcileError::WorkerPanicked);
            }
        });

        let RunState {
            first_error,
            links_created,
            attributes_created,
            ..
        } = state;
        let report = ReconcileReport {
            links_created: links_created.into_inner(),
            attributes_created: attributes_created.into_inner(),
        };

        match first_error.into_inner() {
            Some(err) => {
                warn!(
                    "event=reconcile_done module=reconcile status=error duration_ms={} links={} total={total} error={err}",
                    started_at.elapsed().as_millis(),
                    report.links_created
                );
                Err(err)
            }
            None => {
                info!(
                    "event=reconcile_done module=reconcile status=ok duration_ms={} links={} created={}",
                    started_at.elapsed().as_millis(),
                    report.links_created,
                    report.attributes_created
                );
                Ok(report)
            }
        }
    }

    fn run_worker(
        &self,
        worker_id: usize,
        queue: Receiver<ReconciliationTask>,
        state: &RunState,
        ctx: &RequestContext,
    ) {
        for task in queue.iter() {
            if state.is_aborted() {
                break;
            }
            if ctx.is_expired() {
                state.record_failure(ReconcileError::DeadlineExceeded);
                break;
            }

            debug!(
                "event=reconcile_task module=reconcile status=start worker={worker_id} kind={} product={}",
                task.kind, task.product_id
            );
            match self.process(&task) {
                Ok((link, created)) => {
                    state.links_created.fetch_add(1, Ordering::Relaxed);
                    if created {
                        state.attributes_created.fetch_add(1, Ordering::Relaxed);
                    }
                    debug!(
                        "event=reconcile_task module=reconcile status=ok worker={worker_id} link={}",
                        link.id
                    );
                }
                Err(source) => {
                    warn!(
                        "event=reconcile_task module=reconcile status=error worker={worker_id} kind={} error={source}",
                        task.kind
                    );
                    state.record_failure(ReconcileError::Task { task, source });
                    break;
                }
            }
        }
    }

    fn process(&self, task: &ReconciliationTask) -> RepoResult<(ProductAttributeLink, bool)> {
        let resolution = self.resolver.resolve_tracked(task.kind, &task.label)?;
        let link = self
            .writer
            .link(task.kind, task.product_id, resolution.entity.id)?;
        Ok((link, resolution.created))
    }
}

fn produce(tasks: Vec<ReconciliationTask>, queue: Sender<ReconciliationTask>, state: &RunState) {
    for task in tasks {
        if state.is_aborted() || queue.send(task).is_err() {
            break;
        }
    }
}
