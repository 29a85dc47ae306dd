//! Configuration models for the assigner and its store backend.

pub mod assigner;

pub use assigner::{AssignerConfig, StoreBackendConfig};
