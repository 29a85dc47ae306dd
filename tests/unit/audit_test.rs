//! Tests for audit sinks

use chrono::Utc;
use kitchen_dispatch::core::{
    build_audit_event, AuditAction, AuditSink, InMemoryAuditSink, ItemKind, ItemState, WorkItem,
};

fn item(id: i64) -> WorkItem {
    WorkItem {
        id,
        order_id: 100 + id,
        kind: ItemKind::Dish,
        state: ItemState::Assigned,
        worker_id: Some(7),
        assigned_at: Some(Utc::now()),
        created_at: Utc::now(),
        finished_at: None,
    }
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    sink.record(build_audit_event(&item(1), Some(7), AuditAction::Assign, None));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].item_id, 1);
    assert_eq!(events[0].order_id, 101);
    assert_eq!(events[0].action, AuditAction::Assign);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(&item(1), Some(7), AuditAction::Assign, None));
    sink.record(build_audit_event(&item(2), Some(7), AuditAction::Assign, None));
    sink.record(build_audit_event(&item(3), Some(7), AuditAction::Assign, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].item_id, 2); // First one popped
    assert_eq!(events[1].item_id, 3);
}

#[test]
fn test_zero_sized_sink_records_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(&item(1), None, AuditAction::Release, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        &item(4),
        Some(8),
        AuditAction::Reassign,
        Some("rejected by worker 7".to_string()),
    );

    assert_eq!(event.item_id, 4);
    assert_eq!(event.order_id, 104);
    assert_eq!(event.worker_id, Some(8));
    assert_eq!(event.action, AuditAction::Reassign);
    assert_eq!(event.detail.as_deref(), Some("rejected by worker 7"));
    assert_ne!(
        event.event_id,
        build_audit_event(&item(4), Some(8), AuditAction::Reassign, None).event_id
    );
}

#[test]
fn test_audit_action_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&AuditAction::Promote).unwrap(), "\"promote\"");
    assert_eq!(AuditAction::Ready.to_string(), "ready");
}
