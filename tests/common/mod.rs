//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use kitchen_dispatch::builders::AssignerBuilder;
use kitchen_dispatch::config::AssignerConfig;
use kitchen_dispatch::core::{
    ItemId, ItemState, KitchenAssigner, NewWorkItem, StaffAccount, WorkItem, WorkerId,
};
use kitchen_dispatch::infra::InMemoryStore;

pub type MemoryAssigner = KitchenAssigner<InMemoryStore, InMemoryStore>;

/// Fixed instant `secs` seconds after the test epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

pub fn config(capacity: u32) -> AssignerConfig {
    AssignerConfig {
        capacity_per_worker: capacity,
        ..AssignerConfig::default()
    }
}

pub fn in_memory(capacity: u32) -> (MemoryAssigner, Arc<InMemoryStore>) {
    AssignerBuilder::new(config(capacity))
        .build_in_memory()
        .unwrap()
}

pub fn on_shift(store: &InMemoryStore, workers: &[WorkerId]) {
    for &worker in workers {
        store.set_roster(worker, true);
    }
}

pub fn cook(store: &InMemoryStore, id: WorkerId, role: &str, enabled: bool) {
    store.add_staff(StaffAccount {
        id,
        role: role.to_string(),
        enabled,
    });
}

/// Insert `count` pending dishes, one second apart starting at `from`.
pub fn pending_dishes(store: &InMemoryStore, count: usize, from: i64) -> Vec<ItemId> {
    (0..count)
        .map(|n| {
            store
                .insert_item(NewWorkItem::dish(1, at(from + n as i64)))
                .id
        })
        .collect()
}

/// Insert a dish already held by `worker` in `state`.
pub fn held_dish(store: &InMemoryStore, worker: WorkerId, state: ItemState, secs: i64) -> WorkItem {
    let item = store.insert_item(NewWorkItem::dish(1, at(secs)));
    let held = WorkItem {
        state,
        worker_id: Some(worker),
        assigned_at: Some(at(secs)),
        ..item
    };
    store.put_item(held.clone());
    held
}

pub fn open_items(store: &InMemoryStore, worker: WorkerId) -> Vec<WorkItem> {
    store
        .items()
        .into_iter()
        .filter(|item| item.worker_id == Some(worker) && item.state.is_open())
        .collect()
}

pub fn in_state(store: &InMemoryStore, worker: WorkerId, state: ItemState) -> Vec<ItemId> {
    store
        .items()
        .into_iter()
        .filter(|item| item.worker_id == Some(worker) && item.state == state)
        .map(|item| item.id)
        .collect()
}

pub fn unassigned(store: &InMemoryStore) -> Vec<ItemId> {
    store
        .items()
        .into_iter()
        .filter(|item| item.state == ItemState::Pending && item.worker_id.is_none())
        .map(|item| item.id)
        .collect()
}

/// Capacity and single-active-slot invariants over every worker.
pub fn assert_invariants(store: &InMemoryStore, capacity: u32) {
    let items = store.items();
    let mut workers: Vec<WorkerId> = items.iter().filter_map(|item| item.worker_id).collect();
    workers.sort_unstable();
    workers.dedup();
    for worker in workers {
        let open = open_items(store, worker).len();
        assert!(
            open <= capacity as usize,
            "worker {worker} holds {open} open items, capacity {capacity}"
        );
        let preparing = in_state(store, worker, ItemState::Preparing).len();
        assert!(preparing <= 1, "worker {worker} has {preparing} active items");
    }
    for item in &items {
        assert_eq!(
            item.worker_id.is_some(),
            item.state.is_open() || item.state == ItemState::Ready,
            "holder/state mismatch on item {}",
            item.id
        );
    }
}
