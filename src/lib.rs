//! # Kitchen Dispatch
//!
//! Push-based assignment of kitchen work items to cooks.
//!
//! A restaurant's order service writes dish items into a pending pool. This
//! crate decides which cook gets which dish: it spreads the pool across the
//! cooks on shift, least loaded first, never above a per-cook capacity, and
//! keeps exactly one dish in each cook's active slot. When a cook rejects a
//! dish it goes to someone else.
//!
//! ## Core Problem Solved
//!
//! - **Fair distribution**: oldest dishes first, to the cook with the fewest open items
//! - **Bounded load**: no cook holds more than `capacity_per_worker` open items
//! - **Single active slot**: each cook prepares one dish at a time, the rest queue behind it
//! - **Rejections**: a rejected dish skips the cook who rejected it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kitchen_dispatch::builders::AssignerBuilder;
//! use kitchen_dispatch::config::AssignerConfig;
//! use kitchen_dispatch::core::NewWorkItem;
//! use kitchen_dispatch::runtime::{check_in, reject_item, worker_board};
//!
//! let (assigner, store) = AssignerBuilder::new(AssignerConfig::default()).build_in_memory()?;
//! store.insert_item(NewWorkItem::dish(1, chrono::Utc::now()));
//!
//! check_in(&assigner, 7).await?;          // rebalances
//! let board = worker_board(&assigner, 7).await?;
//! let outcome = reject_item(&assigner, board.current.unwrap().id, 7).await?;
//! ```
//!
//! With the `sqlite` feature (on by default) `AssignerBuilder::build_sqlite`
//! connects to the database named in `AssignerConfig::store`.
//!
//! For complete scenarios, see:
//! - `tests/rebalance_test.rs` - distribution and promotion
//! - `tests/reassign_test.rs` - rejection handling

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core assignment abstractions and load accounting.
pub mod core;
/// Configuration models for the assigner and store backends.
pub mod config;
/// Builders to construct assigners from configuration.
pub mod builders;
/// Infrastructure adapters for storage backends.
pub mod infra;
/// Station-facing API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
