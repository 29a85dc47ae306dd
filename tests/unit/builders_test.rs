//! Tests for builder modules

use chrono::Utc;
use kitchen_dispatch::builders::AssignerBuilder;
use kitchen_dispatch::config::{AssignerConfig, StoreBackendConfig};
use kitchen_dispatch::core::{AuditAction, NewWorkItem, TracingAuditSink};

#[test]
fn test_assigner_builder_defaults() {
    let builder = AssignerBuilder::new(AssignerConfig::default());
    assert_eq!(builder.config().capacity_per_worker, 4);
    assert!(builder.audit_log().is_some());

    let (assigner, _store) = builder.build_in_memory().unwrap();
    assert_eq!(assigner.policy().capacity_per_worker, 4);
    assert_eq!(assigner.policy().cook_role, "COCINERO");
}

#[test]
fn test_builder_without_audit_buffer() {
    let config = AssignerConfig {
        audit_buffer: 0,
        ..AssignerConfig::default()
    };
    assert!(AssignerBuilder::new(config).audit_log().is_none());
}

#[test]
fn test_custom_sink_replaces_audit_log() {
    let builder = AssignerBuilder::new(AssignerConfig::default()).with_audit(Box::new(TracingAuditSink));
    assert!(builder.audit_log().is_none());
    assert!(builder.build_in_memory().is_ok());
}

#[test]
fn test_builder_rejects_invalid_config() {
    let config = AssignerConfig {
        capacity_per_worker: 0,
        ..AssignerConfig::default()
    };
    assert!(AssignerBuilder::new(config).build_in_memory().is_err());
}

#[test]
fn test_in_memory_build_requires_in_memory_backend() {
    let config = AssignerConfig {
        store: StoreBackendConfig::Sqlite {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        },
        ..AssignerConfig::default()
    };
    assert!(AssignerBuilder::new(config).build_in_memory().is_err());
}

#[tokio::test]
async fn test_audit_log_sees_assigner_events() {
    let builder = AssignerBuilder::new(AssignerConfig::default());
    let log = builder.audit_log().unwrap();
    let (assigner, store) = builder.build_in_memory().unwrap();
    store.set_roster(1, true);
    store.insert_item(NewWorkItem::dish(1, Utc::now()));

    assigner.rebalance().await.unwrap();

    let actions: Vec<AuditAction> = log.lock().events().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::Assign, AuditAction::Promote]);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_build_runs_migrations() {
    let config = AssignerConfig {
        store: StoreBackendConfig::Sqlite {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        },
        ..AssignerConfig::default()
    };
    let (assigner, store) = AssignerBuilder::new(config).build_sqlite().await.unwrap();
    store.insert_item(NewWorkItem::dish(1, Utc::now())).await.unwrap();
    let report = assigner.rebalance().await.unwrap();
    assert!(report.eligible.is_empty());
    assert_eq!(report.pending, 0);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_build_requires_sqlite_backend() {
    assert!(AssignerBuilder::new(AssignerConfig::default())
        .build_sqlite()
        .await
        .is_err());
}
