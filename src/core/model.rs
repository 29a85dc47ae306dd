//! Work items, workers and the state machine they move through.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a single order line item.
pub type ItemId = i64;
/// Identifier of the order owning an item.
pub type OrderId = i64;
/// Identifier of a staff account that can hold kitchen work.
pub type WorkerId = i64;

/// Category tag of an order line.
///
/// Only [`ItemKind::Dish`] items are routed through the kitchen assigner;
/// drinks belong to the bar flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// Prepared by the kitchen.
    Dish,
    /// Prepared by the bar.
    Drink,
}

impl ItemKind {
    /// Persisted tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dish => "DISH",
            Self::Drink => "DRINK",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISH" => Ok(Self::Dish),
            "DRINK" => Ok(Self::Drink),
            other => Err(format!("unknown item kind `{other}`")),
        }
    }
}

/// Lifecycle of a work item.
///
/// `Pending → Assigned → Preparing → Ready`, with `Pending` re-entered when a
/// worker rejects an item it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    /// Waiting in the unassigned pool.
    Pending,
    /// Queued on a worker.
    Assigned,
    /// In the worker's active slot.
    Preparing,
    /// Finished. Terminal.
    Ready,
}

impl ItemState {
    /// States that count toward a worker's load.
    pub const OPEN: [Self; 2] = [Self::Assigned, Self::Preparing];

    /// Persisted tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
        }
    }

    /// Whether an item in this state is held by a worker.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Assigned | Self::Preparing)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ASSIGNED" => Ok(Self::Assigned),
            "PREPARING" => Ok(Self::Preparing),
            "READY" => Ok(Self::Ready),
            other => Err(format!("unknown item state `{other}`")),
        }
    }
}

/// A line item within an order, as seen by the kitchen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Item identifier.
    pub id: ItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// Dish or drink.
    pub kind: ItemKind,
    /// Current lifecycle state.
    pub state: ItemState,
    /// Worker currently holding the item.
    pub worker_id: Option<WorkerId>,
    /// When the item was last handed to a worker.
    pub assigned_at: Option<DateTime<Utc>>,
    /// Creation time; defines queue order.
    pub created_at: DateTime<Utc>,
    /// When the item became ready.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// Whether the item sits in the unassigned pool and the kitchen may take it.
    pub fn is_assignable(&self) -> bool {
        self.state == ItemState::Pending && self.worker_id.is_none() && self.kind == ItemKind::Dish
    }

    /// The mutable fields of this item as they currently are.
    pub const fn transition(&self) -> ItemTransition {
        ItemTransition {
            state: self.state,
            worker_id: self.worker_id,
            assigned_at: self.assigned_at,
            finished_at: self.finished_at,
        }
    }
}

/// Item as handed over by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkItem {
    /// Owning order.
    pub order_id: OrderId,
    /// Dish or drink.
    pub kind: ItemKind,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewWorkItem {
    /// A dish line for `order_id` created at `created_at`.
    pub const fn dish(order_id: OrderId, created_at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            kind: ItemKind::Dish,
            created_at,
        }
    }

    /// A drink line for `order_id` created at `created_at`.
    pub const fn drink(order_id: OrderId, created_at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            kind: ItemKind::Drink,
            created_at,
        }
    }
}

/// Full set of fields the assigner is allowed to write on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemTransition {
    /// New state.
    pub state: ItemState,
    /// New holder.
    pub worker_id: Option<WorkerId>,
    /// New assignment time.
    pub assigned_at: Option<DateTime<Utc>>,
    /// New completion time.
    pub finished_at: Option<DateTime<Utc>>,
}

impl ItemTransition {
    /// Hand a pending item to `worker`.
    pub const fn assign(worker: WorkerId, at: DateTime<Utc>) -> Self {
        Self {
            state: ItemState::Assigned,
            worker_id: Some(worker),
            assigned_at: Some(at),
            finished_at: None,
        }
    }

    /// Return an item to the unassigned pool.
    pub const fn release() -> Self {
        Self {
            state: ItemState::Pending,
            worker_id: None,
            assigned_at: None,
            finished_at: None,
        }
    }
}

/// What a conditional write expects to find before it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemGuard {
    /// Expected state.
    pub state: ItemState,
    /// Expected holder.
    pub worker_id: Option<WorkerId>,
}

impl ItemGuard {
    /// Item still in the unassigned pool.
    pub const fn pending() -> Self {
        Self {
            state: ItemState::Pending,
            worker_id: None,
        }
    }

    /// Item still held by `worker` in `state`.
    pub const fn held(state: ItemState, worker: WorkerId) -> Self {
        Self {
            state,
            worker_id: Some(worker),
        }
    }

    /// Whether `item` still looks the way the guard expects.
    pub fn admits(&self, item: &WorkItem) -> bool {
        item.state == self.state && item.worker_id == self.worker_id
    }
}

impl From<&WorkItem> for ItemGuard {
    fn from(item: &WorkItem) -> Self {
        Self {
            state: item.state,
            worker_id: item.worker_id,
        }
    }
}

/// Staff account as far as the fallback roster rule cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAccount {
    /// Account id, doubles as worker id.
    pub id: WorkerId,
    /// Role name.
    pub role: String,
    /// Account enabled.
    pub enabled: bool,
}

/// Snapshot of one worker's open work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLoad {
    /// Worker.
    pub worker_id: WorkerId,
    /// Items held in `Assigned` or `Preparing`.
    pub open: u32,
}

impl WorkerLoad {
    /// Free slots left under `capacity`.
    pub const fn headroom(&self, capacity: u32) -> u32 {
        capacity.saturating_sub(self.open)
    }
}
