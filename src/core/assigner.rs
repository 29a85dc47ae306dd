//! Kitchen work assignment: load balancing, promotion and reassignment.
//!
//! The assigner has no background loop. Order management calls
//! [`KitchenAssigner::rebalance`] after it touches the pending pool, item
//! endpoints call [`KitchenAssigner::reassign`] after a rejection, and anything
//! that may free a worker's active slot calls [`KitchenAssigner::promote_next`].
//!
//! A pass is not wrapped in a cross-row transaction. Each item write is a
//! conditional update that lands on its own, so a pass that fails half way
//! leaves some items assigned and the rest pending. Re-running `rebalance` is
//! always safe: it only touches items still in the pending pool and converges
//! them toward balance.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::MutexGuard;

use super::audit::{build_audit_event, AuditAction, AuditSink};
use super::error::DispatchError;
use super::model::{
    ItemGuard, ItemId, ItemKind, ItemState, ItemTransition, WorkItem, WorkerId, WorkerLoad,
};
use super::roster::resolve_eligible;
use super::store::{ItemFilter, ItemOrder, WorkItemStore, WorkerRoster};
use crate::util::clock::now;

/// Per-worker capacity used when nothing else is configured.
pub const DEFAULT_CAPACITY_PER_WORKER: u32 = 4;
/// Role whose enabled accounts form the fallback roster.
pub const DEFAULT_COOK_ROLE: &str = "COCINERO";

/// Values steering assignment decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentPolicy {
    /// Maximum open items (`Assigned` + `Preparing`) a worker may hold.
    pub capacity_per_worker: u32,
    /// Role used when the active roster is empty.
    pub cook_role: String,
    /// Serialize passes within this process.
    pub serialize_passes: bool,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self {
            capacity_per_worker: DEFAULT_CAPACITY_PER_WORKER,
            cook_role: DEFAULT_COOK_ROLE.to_string(),
            serialize_passes: true,
        }
    }
}

/// What a [`KitchenAssigner::rebalance`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceReport {
    /// Workers considered, in resolution order.
    pub eligible: Vec<WorkerId>,
    /// Size of the pending pool when the pass started.
    pub pending: usize,
    /// `(item, worker)` pairs assigned by this pass.
    pub assigned: Vec<(ItemId, WorkerId)>,
    /// `(item, worker)` pairs promoted into the active slot by this pass.
    pub promoted: Vec<(ItemId, WorkerId)>,
}

/// Outcome of [`KitchenAssigner::reassign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reassignment {
    /// The item now belongs to this worker.
    Assigned(WorkerId),
    /// The item is missing, not a dish, or no longer pending and unassigned.
    NotReassignable,
    /// Nobody besides the excluded worker is eligible.
    NoEligibleWorker,
    /// Every other eligible worker is at capacity.
    AtCapacity,
}

impl Reassignment {
    /// Boolean success indicator.
    pub const fn succeeded(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Worker that received the item, if any.
    pub const fn worker(&self) -> Option<WorkerId> {
        match self {
            Self::Assigned(worker) => Some(*worker),
            _ => None,
        }
    }
}

/// Push-based load balancer distributing dish items across kitchen workers.
pub struct KitchenAssigner<S, R> {
    policy: AssignmentPolicy,
    store: Arc<S>,
    roster: Arc<R>,
    /// Held for the duration of every pass when `serialize_passes` is set.
    pass_lock: Option<Arc<tokio::sync::Mutex<()>>>,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
}

impl<S, R> Clone for KitchenAssigner<S, R> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            store: Arc::clone(&self.store),
            roster: Arc::clone(&self.roster),
            pass_lock: self.pass_lock.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S, R> KitchenAssigner<S, R> {
    /// Create an assigner over a store and a roster.
    pub fn new(policy: AssignmentPolicy, store: Arc<S>, roster: Arc<R>) -> Self {
        let pass_lock = policy
            .serialize_passes
            .then(|| Arc::new(tokio::sync::Mutex::new(())));
        Self {
            policy,
            store,
            roster,
            pass_lock,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// Policy in effect.
    pub const fn policy(&self) -> &AssignmentPolicy {
        &self.policy
    }

    /// Underlying item store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Underlying roster.
    pub const fn roster(&self) -> &Arc<R> {
        &self.roster
    }

    async fn pass(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.pass_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    fn record(
        &self,
        item: &WorkItem,
        worker: Option<WorkerId>,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit
                .lock()
                .record(build_audit_event(item, worker, action, detail));
        }
    }
}

impl<S, R> KitchenAssigner<S, R>
where
    S: WorkItemStore,
    R: WorkerRoster,
{
    /// Workers eligible for kitchen work right now.
    pub async fn eligible_workers(&self) -> Result<Vec<WorkerId>, DispatchError> {
        resolve_eligible(self.roster.as_ref(), &self.policy.cook_role).await
    }

    /// Open-item snapshot for `workers`, least loaded first.
    ///
    /// The sort is stable, so workers with equal load keep the order they were
    /// given in.
    pub async fn loads(&self, workers: &[WorkerId]) -> Result<Vec<WorkerLoad>, DispatchError> {
        let counts = self.store.open_counts(workers).await?;
        let mut loads: Vec<WorkerLoad> = workers
            .iter()
            .map(|&worker_id| WorkerLoad {
                worker_id,
                open: counts.get(&worker_id).copied().unwrap_or(0),
            })
            .collect();
        loads.sort_by_key(|load| load.open);
        Ok(loads)
    }

    /// Distribute the pending pool across eligible workers, then fill every
    /// empty active slot.
    ///
    /// Loads are read once at the start of the pass. Items are handed out
    /// oldest first to the least loaded worker until it reaches capacity, then
    /// to the next one.
    pub async fn rebalance(&self) -> Result<RebalanceReport, DispatchError> {
        let _pass = self.pass().await;
        tracing::info!("rebalance started");

        let workers = self.eligible_workers().await?;
        let mut report = RebalanceReport {
            eligible: workers.clone(),
            ..RebalanceReport::default()
        };
        if workers.is_empty() {
            tracing::info!("rebalance skipped: no kitchen workers available");
            return Ok(report);
        }

        let mut pool: VecDeque<WorkItem> = self
            .store
            .find_items(&ItemFilter::unassigned_dishes())
            .await?
            .into();
        report.pending = pool.len();
        tracing::info!(pending = pool.len(), workers = workers.len(), "pending pool loaded");

        let loads = self.loads(&workers).await?;
        for load in &loads {
            if pool.is_empty() {
                break;
            }
            let capacity = load.headroom(self.policy.capacity_per_worker);
            tracing::debug!(worker = load.worker_id, open = load.open, capacity, "worker capacity");

            let mut granted = 0;
            while granted < capacity {
                let Some(item) = pool.pop_front() else {
                    break;
                };
                let transition = ItemTransition::assign(load.worker_id, now());
                if self
                    .store
                    .update_item(item.id, ItemGuard::pending(), &transition)
                    .await?
                {
                    granted += 1;
                    report.assigned.push((item.id, load.worker_id));
                    tracing::info!(item = item.id, worker = load.worker_id, "item assigned");
                    self.record(&item, Some(load.worker_id), AuditAction::Assign, None);
                } else {
                    tracing::warn!(item = item.id, "item left the pending pool mid-pass, skipping");
                }
            }
        }

        for load in &loads {
            if let Some(item) = self.promote_in_pass(load.worker_id).await? {
                report.promoted.push((item, load.worker_id));
            }
        }

        tracing::info!(
            assigned = report.assigned.len(),
            promoted = report.promoted.len(),
            left = pool.len(),
            "rebalance finished"
        );
        Ok(report)
    }

    /// Move `worker`'s oldest assigned dish into its active slot if the slot is
    /// empty. Returns the promoted item.
    pub async fn promote_next(&self, worker: WorkerId) -> Result<Option<ItemId>, DispatchError> {
        let _pass = self.pass().await;
        self.promote_in_pass(worker).await
    }

    async fn promote_in_pass(&self, worker: WorkerId) -> Result<Option<ItemId>, DispatchError> {
        let preparing = self
            .store
            .count_items(&ItemFilter::held_by(worker).in_state(ItemState::Preparing))
            .await?;
        if preparing > 0 {
            return Ok(None);
        }

        let next = self
            .store
            .find_items(
                &ItemFilter::held_by(worker)
                    .in_state(ItemState::Assigned)
                    .of_kind(ItemKind::Dish)
                    .ordered_by(ItemOrder::AssignedAsc)
                    .limit(1),
            )
            .await?
            .into_iter()
            .next();
        let Some(item) = next else {
            return Ok(None);
        };

        let transition = ItemTransition {
            state: ItemState::Preparing,
            assigned_at: Some(item.assigned_at.unwrap_or_else(now)),
            ..item.transition()
        };
        let guard = ItemGuard::held(ItemState::Assigned, worker);
        if !self.store.update_item(item.id, guard, &transition).await? {
            tracing::warn!(item = item.id, worker, "promotion lost a race, item moved");
            return Ok(None);
        }

        tracing::info!(item = item.id, worker, "item promoted to preparing");
        self.record(&item, Some(worker), AuditAction::Promote, None);
        Ok(Some(item.id))
    }

    /// Hand a rejected item to a worker other than `exclude`.
    ///
    /// The caller must already have returned the item to the pending pool.
    /// Failures are reported through [`Reassignment`]; only store errors are
    /// returned as `Err`.
    pub async fn reassign(
        &self,
        item_id: ItemId,
        exclude: WorkerId,
    ) -> Result<Reassignment, DispatchError> {
        let _pass = self.pass().await;

        let item = match self.store.find_item(item_id).await? {
            Some(item) if item.is_assignable() => item,
            _ => {
                tracing::debug!(item = item_id, "reassign skipped: item not in pending pool");
                return Ok(Reassignment::NotReassignable);
            }
        };

        let mut workers = self.eligible_workers().await?;
        workers.retain(|&id| id != exclude);
        if workers.is_empty() {
            tracing::warn!(item = item_id, exclude, "reassign failed: no other worker eligible");
            return Ok(Reassignment::NoEligibleWorker);
        }

        let loads = self.loads(&workers).await?;
        let Some(target) = loads
            .iter()
            .find(|load| load.open < self.policy.capacity_per_worker)
            .map(|load| load.worker_id)
        else {
            tracing::warn!(item = item_id, exclude, "reassign failed: every worker at capacity");
            return Ok(Reassignment::AtCapacity);
        };

        let transition = ItemTransition::assign(target, now());
        if !self
            .store
            .update_item(item_id, ItemGuard::pending(), &transition)
            .await?
        {
            tracing::warn!(item = item_id, "reassign lost a race, item already taken");
            return Ok(Reassignment::NotReassignable);
        }

        tracing::info!(item = item_id, from = exclude, to = target, "item reassigned");
        self.record(
            &item,
            Some(target),
            AuditAction::Reassign,
            Some(format!("rejected by worker {exclude}")),
        );
        self.promote_in_pass(target).await?;
        Ok(Reassignment::Assigned(target))
    }

    /// Return an item `worker` holds to the pending pool, then refill the
    /// worker's active slot.
    pub async fn release_to_pool(
        &self,
        item_id: ItemId,
        worker: WorkerId,
    ) -> Result<WorkItem, DispatchError> {
        let _pass = self.pass().await;
        let item = self.held_item(item_id, worker, ItemState::Pending).await?;

        let transition = ItemTransition::release();
        if !self
            .store
            .update_item(item_id, ItemGuard::from(&item), &transition)
            .await?
        {
            return Err(self.moved_on(item_id, ItemState::Pending).await);
        }

        tracing::info!(item = item_id, worker, "item released to pending pool");
        self.record(&item, Some(worker), AuditAction::Release, None);
        self.promote_in_pass(worker).await?;
        Ok(apply(item, &transition))
    }

    /// Mark the dish in `worker`'s active slot as ready, then refill the slot.
    ///
    /// Only a `Preparing` item can finish; queued `Assigned` dishes must be
    /// promoted first.
    pub async fn finish(&self, item_id: ItemId, worker: WorkerId) -> Result<WorkItem, DispatchError> {
        let _pass = self.pass().await;
        let item = self.held_item(item_id, worker, ItemState::Ready).await?;
        if item.state != ItemState::Preparing {
            return Err(DispatchError::InvalidTransition {
                item: item_id,
                from: item.state,
                to: ItemState::Ready,
            });
        }

        let transition = ItemTransition {
            state: ItemState::Ready,
            finished_at: Some(now()),
            ..item.transition()
        };
        if !self
            .store
            .update_item(item_id, ItemGuard::from(&item), &transition)
            .await?
        {
            return Err(self.moved_on(item_id, ItemState::Ready).await);
        }

        tracing::info!(item = item_id, worker, "item ready");
        self.record(&item, Some(worker), AuditAction::Ready, None);
        self.promote_in_pass(worker).await?;
        Ok(apply(item, &transition))
    }

    /// Load an open dish held by `worker`, or explain why it cannot move to `to`.
    async fn held_item(
        &self,
        item_id: ItemId,
        worker: WorkerId,
        to: ItemState,
    ) -> Result<WorkItem, DispatchError> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or(DispatchError::ItemNotFound(item_id))?;
        if item.kind != ItemKind::Dish {
            return Err(DispatchError::NotKitchenItem(item_id));
        }
        if item.worker_id != Some(worker) {
            return Err(DispatchError::NotHolder {
                item: item_id,
                worker,
            });
        }
        if !item.state.is_open() {
            return Err(DispatchError::InvalidTransition {
                item: item_id,
                from: item.state,
                to,
            });
        }
        Ok(item)
    }

    /// Error for a conditional write that found the item changed.
    async fn moved_on(&self, item_id: ItemId, to: ItemState) -> DispatchError {
        match self.store.find_item(item_id).await {
            Ok(Some(current)) => DispatchError::InvalidTransition {
                item: item_id,
                from: current.state,
                to,
            },
            Ok(None) => DispatchError::ItemNotFound(item_id),
            Err(err) => err,
        }
    }
}

fn apply(item: WorkItem, transition: &ItemTransition) -> WorkItem {
    WorkItem {
        state: transition.state,
        worker_id: transition.worker_id,
        assigned_at: transition.assigned_at,
        finished_at: transition.finished_at,
        ..item
    }
}
