//! Tests for error types

use kitchen_dispatch::core::{DispatchError, ItemState};

#[test]
fn test_item_not_found_error() {
    let err = DispatchError::ItemNotFound(42);
    assert_eq!(format!("{}", err), "work item 42 not found");
}

#[test]
fn test_not_holder_error() {
    let err = DispatchError::NotHolder { item: 3, worker: 9 };
    assert_eq!(format!("{}", err), "work item 3 is not held by worker 9");
}

#[test]
fn test_invalid_transition_error() {
    let err = DispatchError::InvalidTransition {
        item: 5,
        from: ItemState::Ready,
        to: ItemState::Pending,
    };
    assert_eq!(format!("{}", err), "work item 5 cannot move from READY to PENDING");
}

#[test]
fn test_store_error() {
    let err = DispatchError::Store("connection failed".to_string());
    assert_eq!(format!("{}", err), "store error: connection failed");
}

#[test]
fn test_errors_convert_into_anyhow() {
    fn edge() -> kitchen_dispatch::core::AppResult<()> {
        let checked: Result<(), DispatchError> =
            Err(DispatchError::Config("capacity_per_worker must be greater than 0".into()));
        checked?;
        Ok(())
    }
    let err = edge().unwrap_err();
    assert!(err.to_string().starts_with("config invalid"));
}
