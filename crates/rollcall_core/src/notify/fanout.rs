//! Unordered per-recipient dispatch over a bounded worker set.

use super::{DeliveryOutcome, Dispatcher, Notice};
use crate::model::recipient::RecipientId;
use crate::model::session::{SessionId, TargetSet};
use crate::repo::recipient_repo::EndpointRepository;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Tally of a finished dispatch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub no_endpoint: usize,
    pub invalidated: usize,
    pub failed: usize,
}

/// Upper bound on delivery threads started by one fan-out.
pub const MAX_NOTIFY_WORKERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskResult {
    Outcome(DeliveryOutcome),
    Failed,
}

/// Handle to the in-flight workers of one fan-out.
///
/// Dropping the batch detaches the workers; they keep draining the queue.
#[derive(Debug)]
pub struct DispatchBatch {
    session_id: SessionId,
    queued: usize,
    workers: Vec<JoinHandle<Vec<TaskResult>>>,
}

impl DispatchBatch {
    /// Number of recipients queued for delivery.
    pub fn len(&self) -> usize {
        self.queued
    }

    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    /// Number of delivery threads serving this batch.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Blocks until every worker finishes and tallies the outcomes.
    ///
    /// Recipients never reached (no worker could be spawned, or a worker
    /// panicked) count as `failed`.
    pub fn wait(self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let mut tallied = 0;
        for worker in self.workers {
            let Ok(results) = worker.join() else {
                continue;
            };
            tallied += results.len();
            for result in results {
                match result {
                    TaskResult::Outcome(DeliveryOutcome::Delivered) => summary.delivered += 1,
                    TaskResult::Outcome(DeliveryOutcome::NoEndpoint) => summary.no_endpoint += 1,
                    TaskResult::Outcome(DeliveryOutcome::PermanentlyInvalid) => {
                        summary.invalidated += 1
                    }
                    TaskResult::Failed => summary.failed += 1,
                }
            }
        }
        summary.failed += self.queued.saturating_sub(tallied);
        info!(
            "event=notify_batch module=notify status=ok session_id={} delivered={} no_endpoint={} invalidated={} failed={}",
            self.session_id,
            summary.delivered,
            summary.no_endpoint,
            summary.invalidated,
            summary.failed
        );
        summary
    }
}

/// Queues one delivery per target and starts up to [`MAX_NOTIFY_WORKERS`]
/// detached threads to drain the queue in no particular order.
///
/// Returns immediately. A delivery that sees `PermanentlyInvalid` asks
/// `endpoints` to drop the recipient's registration.
pub fn fan_out(
    dispatcher: Arc<dyn Dispatcher>,
    endpoints: Arc<dyn EndpointRepository + Send + Sync>,
    session_id: SessionId,
    targets: &TargetSet,
    notice: Notice,
) -> DispatchBatch {
    let queued = targets.len();
    let queue: Arc<Mutex<VecDeque<RecipientId>>> =
        Arc::new(Mutex::new(targets.iter().cloned().collect()));
    let notice = Arc::new(notice);
    let worker_count = queued.min(MAX_NOTIFY_WORKERS);
    let mut workers = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
        let dispatcher = Arc::clone(&dispatcher);
        let endpoints = Arc::clone(&endpoints);
        let notice = Arc::clone(&notice);
        let queue = Arc::clone(&queue);
        let spawned = thread::Builder::new()
            .name("rollcall-notify".to_string())
            .spawn(move || {
                let mut results = Vec::new();
                while let Some(recipient_id) = next_recipient(&queue) {
                    results.push(deliver_one(
                        dispatcher.as_ref(),
                        endpoints.as_ref(),
                        session_id,
                        &recipient_id,
                        &notice,
                    ));
                }
                results
            });
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(err) => warn!(
                "event=notify_spawn module=notify status=error session_id={} error={}",
                session_id, err
            ),
        }
    }
    debug!(
        "event=notify_fan_out module=notify status=ok session_id={} queued={} workers={}",
        session_id,
        queued,
        workers.len()
    );

    DispatchBatch {
        session_id,
        queued,
        workers,
    }
}

fn next_recipient(queue: &Mutex<VecDeque<RecipientId>>) -> Option<RecipientId> {
    // A poisoned queue still holds valid ids; keep draining.
    match queue.lock() {
        Ok(mut pending) => pending.pop_front(),
        Err(poisoned) => poisoned.into_inner().pop_front(),
    }
}

fn deliver_one(
    dispatcher: &dyn Dispatcher,
    endpoints: &(dyn EndpointRepository + Send + Sync),
    session_id: SessionId,
    recipient_id: &RecipientId,
    notice: &Notice,
) -> TaskResult {
    match dispatcher.send(recipient_id, notice) {
        Ok(DeliveryOutcome::PermanentlyInvalid) => {
            match endpoints.deregister_endpoint(recipient_id) {
                Ok(removed) => info!(
                    "event=endpoint_deregister module=notify status=ok session_id={} recipient_id={} removed={}",
                    session_id, recipient_id, removed
                ),
                Err(err) => warn!(
                    "event=endpoint_deregister module=notify status=error session_id={} recipient_id={} error={}",
                    session_id, recipient_id, err
                ),
            }
            TaskResult::Outcome(DeliveryOutcome::PermanentlyInvalid)
        }
        Ok(outcome) => {
            debug!(
                "event=notify_send module=notify status=ok session_id={} recipient_id={} outcome={:?}",
                session_id, recipient_id, outcome
            );
            TaskResult::Outcome(outcome)
        }
        Err(err) => {
            warn!(
                "event=notify_send module=notify status=error session_id={} recipient_id={} error={}",
                session_id, recipient_id, err
            );
            TaskResult::Failed
        }
    }
}
