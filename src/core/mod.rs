//! Core assignment abstractions and load accounting.

pub mod assigner;
pub mod audit;
pub mod error;
pub mod model;
pub mod roster;
pub mod store;

pub use assigner::{
    AssignmentPolicy, KitchenAssigner, RebalanceReport, Reassignment, DEFAULT_CAPACITY_PER_WORKER,
    DEFAULT_COOK_ROLE,
};
pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use error::{AppResult, DispatchError};
pub use model::{
    ItemGuard, ItemId, ItemKind, ItemState, ItemTransition, NewWorkItem, OrderId, StaffAccount,
    WorkItem, WorkerId, WorkerLoad,
};
pub use roster::resolve_eligible;
pub use store::{Holder, ItemFilter, ItemOrder, WorkItemStore, WorkerRoster};
