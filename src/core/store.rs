//! Interfaces the assigner consumes from the persistence layer.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;

use super::error::DispatchError;
use super::model::{ItemGuard, ItemId, ItemKind, ItemState, ItemTransition, WorkItem, WorkerId};

/// Which holder an item query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Holder {
    /// Any holder, including none.
    #[default]
    Any,
    /// Items nobody holds.
    Unassigned,
    /// Items held by this worker.
    Worker(WorkerId),
}

/// Result ordering for item queries. Ties are broken by item id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemOrder {
    /// Oldest `created_at` first.
    #[default]
    CreatedAsc,
    /// Oldest `assigned_at` first, items without one last.
    AssignedAsc,
}

/// Filter for [`WorkItemStore::find_items`] and [`WorkItemStore::count_items`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Accepted states; empty accepts all.
    pub states: Vec<ItemState>,
    /// Holder restriction.
    pub holder: Holder,
    /// Kind restriction.
    pub kind: Option<ItemKind>,
    /// Result order.
    pub order: ItemOrder,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl ItemFilter {
    /// Pending dishes nobody holds, oldest first. The rebalance pool.
    pub fn unassigned_dishes() -> Self {
        Self {
            states: vec![ItemState::Pending],
            holder: Holder::Unassigned,
            kind: Some(ItemKind::Dish),
            order: ItemOrder::CreatedAsc,
            limit: None,
        }
    }

    /// Everything `worker` holds.
    pub fn held_by(worker: WorkerId) -> Self {
        Self {
            holder: Holder::Worker(worker),
            ..Self::default()
        }
    }

    /// Restrict to a single state.
    #[must_use]
    pub fn in_state(mut self, state: ItemState) -> Self {
        self.states = vec![state];
        self
    }

    /// Restrict to a kind.
    #[must_use]
    pub const fn of_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Change the result order.
    #[must_use]
    pub const fn ordered_by(mut self, order: ItemOrder) -> Self {
        self.order = order;
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `item` passes the state, holder and kind restrictions.
    pub fn matches(&self, item: &WorkItem) -> bool {
        if !self.states.is_empty() && !self.states.contains(&item.state) {
            return false;
        }
        let holder_ok = match self.holder {
            Holder::Any => true,
            Holder::Unassigned => item.worker_id.is_none(),
            Holder::Worker(id) => item.worker_id == Some(id),
        };
        holder_ok && self.kind.map_or(true, |kind| item.kind == kind)
    }

    /// Comparator implementing [`ItemOrder`] for in-process backends.
    pub fn compare(&self, a: &WorkItem, b: &WorkItem) -> Ordering {
        let primary = match self.order {
            ItemOrder::CreatedAsc => a.created_at.cmp(&b.created_at),
            ItemOrder::AssignedAsc => match (a.assigned_at, b.assigned_at) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then(a.id.cmp(&b.id))
    }
}

/// Read/write access to persisted work items.
///
/// Every write goes through [`WorkItemStore::update_item`], which only applies
/// when the item still has the state and holder the caller last observed. Two
/// writers racing on the same item therefore never both win.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Look up one item.
    async fn find_item(&self, id: ItemId) -> Result<Option<WorkItem>, DispatchError>;

    /// Items matching `filter`, in the filter's order.
    async fn find_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, DispatchError>;

    /// Number of items matching `filter`. Order and limit are ignored.
    async fn count_items(&self, filter: &ItemFilter) -> Result<u64, DispatchError>;

    /// Open item count (`Assigned` + `Preparing`) for each of `workers`.
    /// Workers without open items may be absent from the map.
    async fn open_counts(
        &self,
        workers: &[WorkerId],
    ) -> Result<HashMap<WorkerId, u32>, DispatchError>;

    /// Write `transition` if the item currently matches `guard`.
    ///
    /// Returns `false` when the item is missing or has moved on.
    async fn update_item(
        &self,
        id: ItemId,
        guard: ItemGuard,
        transition: &ItemTransition,
    ) -> Result<bool, DispatchError>;
}

/// Read access to the set of workers the kitchen may hand work to.
#[async_trait]
pub trait WorkerRoster: Send + Sync {
    /// Workers marked active on the kitchen roster, ascending id.
    async fn active_workers(&self) -> Result<Vec<WorkerId>, DispatchError>;

    /// Enabled staff accounts holding `role` (ASCII case-insensitive), ascending id.
    async fn enabled_with_role(&self, role: &str) -> Result<Vec<WorkerId>, DispatchError>;

    /// Mark a worker on or off shift, creating the roster row if needed.
    async fn set_active(&self, worker: WorkerId, active: bool) -> Result<(), DispatchError>;
}
