//! In-memory work item store and roster.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    DispatchError, ItemFilter, ItemGuard, ItemId, ItemState, ItemTransition, NewWorkItem,
    StaffAccount, WorkItem, WorkItemStore, WorkerId, WorkerRoster,
};

#[derive(Default)]
struct State {
    items: BTreeMap<ItemId, WorkItem>,
    next_id: ItemId,
    roster: BTreeMap<WorkerId, bool>,
    staff: BTreeMap<WorkerId, StaffAccount>,
}

/// Store keeping items, roster and staff behind one mutex.
///
/// Implements both [`WorkItemStore`] and [`WorkerRoster`], so one `Arc` can be
/// handed to the assigner twice. The lock is never held across an await.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending, unassigned item as the order service would.
    pub fn insert_item(&self, item: NewWorkItem) -> WorkItem {
        let mut state = self.state.lock();
        state.next_id += 1;
        let stored = WorkItem {
            id: state.next_id,
            order_id: item.order_id,
            kind: item.kind,
            state: ItemState::Pending,
            worker_id: None,
            assigned_at: None,
            created_at: item.created_at,
            finished_at: None,
        };
        state.items.insert(stored.id, stored.clone());
        stored
    }

    /// Insert an item exactly as given, replacing any item with the same id.
    /// Used to seed fixtures that start mid-lifecycle.
    pub fn put_item(&self, item: WorkItem) {
        let mut state = self.state.lock();
        state.next_id = state.next_id.max(item.id);
        state.items.insert(item.id, item);
    }

    /// Register or replace a staff account.
    pub fn add_staff(&self, account: StaffAccount) {
        self.state.lock().staff.insert(account.id, account);
    }

    /// Set a roster row without going through the async trait.
    pub fn set_roster(&self, worker: WorkerId, active: bool) {
        self.state.lock().roster.insert(worker, active);
    }

    /// Snapshot of one item.
    pub fn item(&self, id: ItemId) -> Option<WorkItem> {
        self.state.lock().items.get(&id).cloned()
    }

    /// Snapshot of every item, ascending id.
    pub fn items(&self) -> Vec<WorkItem> {
        self.state.lock().items.values().cloned().collect()
    }
}

#[async_trait]
impl WorkItemStore for InMemoryStore {
    async fn find_item(&self, id: ItemId) -> Result<Option<WorkItem>, DispatchError> {
        Ok(self.item(id))
    }

    async fn find_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, DispatchError> {
        let mut found: Vec<WorkItem> = {
            let state = self.state.lock();
            state
                .items
                .values()
                .filter(|item| filter.matches(item))
                .cloned()
                .collect()
        };
        found.sort_by(|a, b| filter.compare(a, b));
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn count_items(&self, filter: &ItemFilter) -> Result<u64, DispatchError> {
        let state = self.state.lock();
        Ok(state.items.values().filter(|item| filter.matches(item)).count() as u64)
    }

    async fn open_counts(
        &self,
        workers: &[WorkerId],
    ) -> Result<HashMap<WorkerId, u32>, DispatchError> {
        let state = self.state.lock();
        let mut counts = HashMap::with_capacity(workers.len());
        for item in state.items.values() {
            if !item.state.is_open() {
                continue;
            }
            if let Some(worker) = item.worker_id.filter(|w| workers.contains(w)) {
                *counts.entry(worker).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn update_item(
        &self,
        id: ItemId,
        guard: ItemGuard,
        transition: &ItemTransition,
    ) -> Result<bool, DispatchError> {
        let mut state = self.state.lock();
        let Some(item) = state.items.get_mut(&id) else {
            return Ok(false);
        };
        if !guard.admits(item) {
            return Ok(false);
        }
        item.state = transition.state;
        item.worker_id = transition.worker_id;
        item.assigned_at = transition.assigned_at;
        item.finished_at = transition.finished_at;
        Ok(true)
    }
}

#[async_trait]
impl WorkerRoster for InMemoryStore {
    async fn active_workers(&self) -> Result<Vec<WorkerId>, DispatchError> {
        let state = self.state.lock();
        Ok(state
            .roster
            .iter()
            .filter(|(_, active)| **active)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn enabled_with_role(&self, role: &str) -> Result<Vec<WorkerId>, DispatchError> {
        let state = self.state.lock();
        Ok(state
            .staff
            .values()
            .filter(|account| account.enabled && account.role.eq_ignore_ascii_case(role))
            .map(|account| account.id)
            .collect())
    }

    async fn set_active(&self, worker: WorkerId, active: bool) -> Result<(), DispatchError> {
        self.set_roster(worker, active);
        Ok(())
    }
}
