//! Error types for assignment operations.

use thiserror::Error;

use super::model::{ItemId, ItemState, WorkerId};

/// Errors produced by the assigner and its backends.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No item with this id exists.
    #[error("work item {0} not found")]
    ItemNotFound(ItemId),
    /// The item is not routed through the kitchen.
    #[error("work item {0} is not a kitchen item")]
    NotKitchenItem(ItemId),
    /// The item is not held by the worker acting on it.
    #[error("work item {item} is not held by worker {worker}")]
    NotHolder {
        /// Item acted on.
        item: ItemId,
        /// Worker that tried to act.
        worker: WorkerId,
    },
    /// The item's state does not allow the requested move.
    #[error("work item {item} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Item acted on.
        item: ItemId,
        /// State found.
        from: ItemState,
        /// State requested.
        to: ItemState,
    },
    /// Backend-specific failure with context.
    #[error("store error: {0}")]
    Store(String),
    /// Configuration rejected.
    #[error("config invalid: {0}")]
    Config(String),
    /// SQL backend failure.
    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
