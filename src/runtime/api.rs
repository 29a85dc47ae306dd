//! Request/response models and handlers behind the kitchen station endpoints.
//!
//! Handlers are transport-agnostic: the host maps its HTTP or socket routes
//! onto these functions and serializes the returned models.

use serde::{Deserialize, Serialize};

use crate::core::{
    DispatchError, ItemFilter, ItemId, ItemOrder, ItemState, KitchenAssigner, RebalanceReport,
    Reassignment, WorkItem, WorkItemStore, WorkerId, WorkerRoster,
};

/// Result of a worker rejecting an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectResponse {
    /// Item as it stands after the rejection and reassignment attempt.
    pub item: WorkItem,
    /// Reassignment outcome.
    pub reassignment: Reassignment,
}

/// Snapshot of one worker's station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerBoard {
    /// Worker the board belongs to.
    pub worker_id: WorkerId,
    /// Item in the active slot.
    pub current: Option<WorkItem>,
    /// Assigned items waiting, oldest assignment first.
    pub queue: Vec<WorkItem>,
    /// Open item count.
    pub open: u32,
}

/// Reject an item: return it to the pending pool and try to hand it to
/// someone else. When nobody can take it, it waits for the next rebalance.
pub async fn reject_item<S, R>(
    assigner: &KitchenAssigner<S, R>,
    item_id: ItemId,
    worker: WorkerId,
) -> Result<RejectResponse, DispatchError>
where
    S: WorkItemStore,
    R: WorkerRoster,
{
    let released = assigner.release_to_pool(item_id, worker).await?;
    let reassignment = assigner.reassign(item_id, worker).await?;
    if !reassignment.succeeded() {
        tracing::info!(item = item_id, outcome = ?reassignment, "rejected item left in pending pool");
    }
    let item = assigner
        .store()
        .find_item(item_id)
        .await?
        .unwrap_or(released);
    Ok(RejectResponse { item, reassignment })
}

/// Mark an item ready.
pub async fn mark_ready<S, R>(
    assigner: &KitchenAssigner<S, R>,
    item_id: ItemId,
    worker: WorkerId,
) -> Result<WorkItem, DispatchError>
where
    S: WorkItemStore,
    R: WorkerRoster,
{
    assigner.finish(item_id, worker).await
}

/// Put a worker on the active roster and redistribute pending work.
pub async fn check_in<S, R>(
    assigner: &KitchenAssigner<S, R>,
    worker: WorkerId,
) -> Result<RebalanceReport, DispatchError>
where
    S: WorkItemStore,
    R: WorkerRoster,
{
    assigner.roster().set_active(worker, true).await?;
    tracing::info!(worker, "worker checked in");
    assigner.rebalance().await
}

/// Take a worker off the active roster. Items the worker holds stay with them.
pub async fn check_out<S, R>(
    assigner: &KitchenAssigner<S, R>,
    worker: WorkerId,
) -> Result<RebalanceReport, DispatchError>
where
    S: WorkItemStore,
    R: WorkerRoster,
{
    assigner.roster().set_active(worker, false).await?;
    tracing::info!(worker, "worker checked out");
    assigner.rebalance().await
}

/// Build the station view for `worker`.
pub async fn worker_board<S, R>(
    assigner: &KitchenAssigner<S, R>,
    worker: WorkerId,
) -> Result<WorkerBoard, DispatchError>
where
    S: WorkItemStore,
    R: WorkerRoster,
{
    let store = assigner.store();
    let current = store
        .find_items(
            &ItemFilter::held_by(worker)
                .in_state(ItemState::Preparing)
                .ordered_by(ItemOrder::AssignedAsc)
                .limit(1),
        )
        .await?
        .into_iter()
        .next();
    let queue = store
        .find_items(
            &ItemFilter::held_by(worker)
                .in_state(ItemState::Assigned)
                .ordered_by(ItemOrder::AssignedAsc),
        )
        .await?;
    let open = store
        .open_counts(&[worker])
        .await?
        .get(&worker)
        .copied()
        .unwrap_or(0);
    Ok(WorkerBoard {
        worker_id: worker,
        current,
        queue,
        open,
    })
}
