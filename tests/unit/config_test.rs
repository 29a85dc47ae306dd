//! Tests for configuration validation and loading

use std::collections::HashMap;

use kitchen_dispatch::config::{AssignerConfig, StoreBackendConfig};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let config = AssignerConfig::default();
    assert_eq!(config.capacity_per_worker, 4);
    assert_eq!(config.cook_role, "COCINERO");
    assert!(config.serialize_passes);
    assert_eq!(config.store, StoreBackendConfig::InMemory);
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_capacity_rejected() {
    let config = AssignerConfig {
        capacity_per_worker: 0,
        ..AssignerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_blank_role_rejected() {
    let config = AssignerConfig {
        cook_role: "  ".into(),
        ..AssignerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_sqlite_backend_validation() {
    let config = AssignerConfig {
        store: StoreBackendConfig::Sqlite {
            url: String::new(),
            max_connections: 5,
        },
        ..AssignerConfig::default()
    };
    assert!(config.validate().is_err());

    let config = AssignerConfig {
        store: StoreBackendConfig::Sqlite {
            url: "sqlite::memory:".into(),
            max_connections: 0,
        },
        ..AssignerConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "capacity_per_worker": 6,
        "cook_role": "CHEF",
        "store": { "backend": "sqlite", "url": "sqlite://kitchen.db" }
    }"#;

    let config = AssignerConfig::from_json_str(json).unwrap();
    assert_eq!(config.capacity_per_worker, 6);
    assert_eq!(config.cook_role, "CHEF");
    assert!(config.serialize_passes);
    assert_eq!(
        config.store,
        StoreBackendConfig::Sqlite {
            url: "sqlite://kitchen.db".into(),
            max_connections: 5,
        }
    );
}

#[test]
fn test_config_from_json_rejects_invalid_values() {
    assert!(AssignerConfig::from_json_str(r#"{ "capacity_per_worker": 0 }"#).is_err());
    assert!(AssignerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup() {
    let config = AssignerConfig::from_lookup(lookup(&[
        ("KITCHEN_CAPACITY_PER_WORKER", " 3 "),
        ("KITCHEN_COOK_ROLE", "cocinero"),
        ("KITCHEN_SERIALIZE_PASSES", "off"),
        ("KITCHEN_AUDIT_BUFFER", "0"),
        ("KITCHEN_DATABASE_URL", "sqlite::memory:"),
        ("KITCHEN_DATABASE_MAX_CONNECTIONS", "1"),
    ]))
    .unwrap();

    assert_eq!(config.capacity_per_worker, 3);
    assert_eq!(config.cook_role, "cocinero");
    assert!(!config.serialize_passes);
    assert_eq!(config.audit_buffer, 0);
    assert_eq!(
        config.store,
        StoreBackendConfig::Sqlite {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        }
    );
}

#[test]
fn test_config_from_lookup_defaults_when_unset() {
    let config = AssignerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, AssignerConfig::default());
}

#[test]
fn test_config_from_lookup_rejects_bad_values() {
    assert!(AssignerConfig::from_lookup(lookup(&[("KITCHEN_CAPACITY_PER_WORKER", "many")])).is_err());
    assert!(AssignerConfig::from_lookup(lookup(&[("KITCHEN_CAPACITY_PER_WORKER", "0")])).is_err());
    assert!(AssignerConfig::from_lookup(lookup(&[("KITCHEN_SERIALIZE_PASSES", "maybe")])).is_err());
}

#[test]
fn test_policy_mirrors_config() {
    let config = AssignerConfig {
        capacity_per_worker: 2,
        cook_role: "CHEF".into(),
        serialize_passes: false,
        ..AssignerConfig::default()
    };
    let policy = config.policy();
    assert_eq!(policy.capacity_per_worker, 2);
    assert_eq!(policy.cook_role, "CHEF");
    assert!(!policy.serialize_passes);
}
