//! Builder to construct a [`KitchenAssigner`] from configuration.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{AssignerConfig, StoreBackendConfig};
use crate::core::{
    AuditSink, DispatchError, InMemoryAuditSink, KitchenAssigner, WorkItemStore, WorkerRoster,
};
use crate::infra::InMemoryStore;
#[cfg(feature = "sqlite")]
use crate::{core::AppResult, infra::SqliteStore};

/// Shared handle on the audit buffer the builder creates by default.
pub type AuditLog = Arc<Mutex<InMemoryAuditSink>>;

/// Builder for kitchen assigners.
pub struct AssignerBuilder {
    config: AssignerConfig,
    audit: Option<Box<dyn AuditSink>>,
    audit_log: Option<AuditLog>,
}

impl AssignerBuilder {
    /// Create a builder. A bounded in-memory audit log is attached when
    /// `audit_buffer` is non-zero.
    pub fn new(config: AssignerConfig) -> Self {
        let audit_log = (config.audit_buffer > 0)
            .then(|| Arc::new(Mutex::new(InMemoryAuditSink::new(config.audit_buffer))));
        Self {
            config,
            audit: None,
            audit_log,
        }
    }

    /// Replace the default audit log with a custom sink.
    #[must_use]
    pub fn with_audit(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self.audit_log = None;
        self
    }

    /// Access configuration.
    pub const fn config(&self) -> &AssignerConfig {
        &self.config
    }

    /// Default audit log, if one will be attached.
    pub fn audit_log(&self) -> Option<AuditLog> {
        self.audit_log.clone()
    }

    /// Build an assigner over caller-supplied backends.
    pub fn build_with<S, R>(
        self,
        store: Arc<S>,
        roster: Arc<R>,
    ) -> Result<KitchenAssigner<S, R>, DispatchError>
    where
        S: WorkItemStore,
        R: WorkerRoster,
    {
        self.config.validate().map_err(DispatchError::Config)?;
        let assigner = KitchenAssigner::new(self.config.policy(), store, roster);
        let sink: Option<Box<dyn AuditSink>> = match (self.audit, self.audit_log) {
            (Some(sink), _) => Some(sink),
            (None, Some(log)) => Some(Box::new(log)),
            (None, None) => None,
        };
        tracing::debug!(
            capacity = self.config.capacity_per_worker,
            role = %self.config.cook_role,
            serialize = self.config.serialize_passes,
            audit = sink.is_some(),
            "assigner built"
        );
        Ok(match sink {
            Some(sink) => assigner.with_audit(sink),
            None => assigner,
        })
    }

    /// Build an assigner over a fresh in-memory store, which also serves as
    /// the roster. The store handle is returned for seeding and inspection.
    pub fn build_in_memory(
        self,
    ) -> Result<(KitchenAssigner<InMemoryStore, InMemoryStore>, Arc<InMemoryStore>), DispatchError>
    {
        if self.config.store != StoreBackendConfig::InMemory {
            return Err(DispatchError::Config(
                "build_in_memory requires the in_memory store backend".into(),
            ));
        }
        let store = Arc::new(InMemoryStore::new());
        let assigner = self.build_with(Arc::clone(&store), Arc::clone(&store))?;
        Ok((assigner, store))
    }

    /// Connect to the configured SQLite database, run migrations and build an
    /// assigner over it.
    #[cfg(feature = "sqlite")]
    pub async fn build_sqlite(
        self,
    ) -> AppResult<(KitchenAssigner<SqliteStore, SqliteStore>, Arc<SqliteStore>)> {
        use anyhow::{anyhow, Context};

        let StoreBackendConfig::Sqlite {
            url,
            max_connections,
        } = &self.config.store
        else {
            return Err(anyhow!("build_sqlite requires the sqlite store backend"));
        };
        let store = Arc::new(
            SqliteStore::connect(url, *max_connections)
                .await
                .with_context(|| format!("connecting to {url}"))?,
        );
        let assigner = self.build_with(Arc::clone(&store), Arc::clone(&store))?;
        Ok((assigner, store))
    }
}
