//! API surface for kitchen stations.

pub mod api;

pub use api::{
    check_in, check_out, mark_ready, reject_item, worker_board, RejectResponse, WorkerBoard,
};
