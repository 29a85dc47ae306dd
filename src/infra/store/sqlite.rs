//! SQLite-backed store through sqlx.
//!
//! Queries are built at runtime; nothing is checked against a live database at
//! compile time. Timestamps are stored as integer milliseconds since the epoch.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::core::{
    DispatchError, Holder, ItemFilter, ItemGuard, ItemId, ItemKind, ItemOrder, ItemState,
    ItemTransition, NewWorkItem, StaffAccount, WorkItem, WorkItemStore, WorkerId, WorkerRoster,
};
use crate::util::clock::{from_millis, to_millis};

const ITEM_COLUMNS: &str =
    "id, order_id, kind, state, worker_id, assigned_at, created_at, finished_at";

/// Store over a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool for `url`, creating the database file if missing, and run
    /// migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DispatchError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(url, max_connections, "sqlite store ready");
        Ok(store)
    }

    /// Wrap an existing pool. Call [`SqliteStore::migrate`] before use.
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Schema statements, applied in order.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r"
CREATE TABLE IF NOT EXISTS kd_order_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    state TEXT NOT NULL,
    worker_id INTEGER,
    assigned_at INTEGER,
    created_at INTEGER NOT NULL,
    finished_at INTEGER
)",
            "CREATE INDEX IF NOT EXISTS idx_kd_order_items_pool ON kd_order_items (state, worker_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_kd_order_items_worker ON kd_order_items (worker_id, state)",
            r"
CREATE TABLE IF NOT EXISTS kd_kitchen_roster (
    worker_id INTEGER PRIMARY KEY,
    active INTEGER NOT NULL DEFAULT 0
)",
            r"
CREATE TABLE IF NOT EXISTS kd_staff (
    id INTEGER PRIMARY KEY,
    role TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1
)",
        ]
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), DispatchError> {
        for statement in Self::migrations() {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert a pending, unassigned item as the order service would.
    pub async fn insert_item(&self, item: NewWorkItem) -> Result<WorkItem, DispatchError> {
        let result = sqlx::query(
            "INSERT INTO kd_order_items (order_id, kind, state, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(item.order_id)
        .bind(item.kind.as_str())
        .bind(ItemState::Pending.as_str())
        .bind(to_millis(&item.created_at))
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        self.find_item(id)
            .await?
            .ok_or_else(|| DispatchError::Store(format!("inserted item {id} vanished")))
    }

    /// Register or replace a staff account.
    pub async fn add_staff(&self, account: &StaffAccount) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO kd_staff (id, role, enabled) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET role = excluded.role, enabled = excluded.enabled",
        )
        .bind(account.id)
        .bind(&account.role)
        .bind(account.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn item_from_row(row: &SqliteRow) -> Result<WorkItem, DispatchError> {
    let kind: String = row.try_get("kind")?;
    let state: String = row.try_get("state")?;
    let assigned_at: Option<i64> = row.try_get("assigned_at")?;
    let created_at: i64 = row.try_get("created_at")?;
    let finished_at: Option<i64> = row.try_get("finished_at")?;
    Ok(WorkItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        kind: ItemKind::from_str(&kind).map_err(DispatchError::Store)?,
        state: ItemState::from_str(&state).map_err(DispatchError::Store)?,
        worker_id: row.try_get("worker_id")?,
        assigned_at: assigned_at.map(timestamp).transpose()?,
        created_at: timestamp(created_at)?,
        finished_at: finished_at.map(timestamp).transpose()?,
    })
}

fn timestamp(ms: i64) -> Result<DateTime<Utc>, DispatchError> {
    from_millis(ms).ok_or_else(|| DispatchError::Store(format!("timestamp {ms} out of range")))
}

fn push_conditions(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ItemFilter) {
    if !filter.states.is_empty() {
        qb.push(" AND state IN (");
        let mut states = qb.separated(", ");
        for state in &filter.states {
            states.push_bind(state.as_str());
        }
        states.push_unseparated(")");
    }
    match filter.holder {
        Holder::Any => {}
        Holder::Unassigned => {
            qb.push(" AND worker_id IS NULL");
        }
        Holder::Worker(worker) => {
            qb.push(" AND worker_id = ").push_bind(worker);
        }
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
}

#[async_trait]
impl WorkItemStore for SqliteStore {
    async fn find_item(&self, id: ItemId) -> Result<Option<WorkItem>, DispatchError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM kd_order_items WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, DispatchError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM kd_order_items WHERE 1 = 1"
        ));
        push_conditions(&mut qb, filter);
        match filter.order {
            ItemOrder::CreatedAsc => qb.push(" ORDER BY created_at ASC, id ASC"),
            ItemOrder::AssignedAsc => {
                qb.push(" ORDER BY assigned_at IS NULL, assigned_at ASC, id ASC")
            }
        };
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn count_items(&self, filter: &ItemFilter) -> Result<u64, DispatchError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM kd_order_items WHERE 1 = 1");
        push_conditions(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn open_counts(
        &self,
        workers: &[WorkerId],
    ) -> Result<HashMap<WorkerId, u32>, DispatchError> {
        if workers.is_empty() {
            return Ok(HashMap::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT worker_id, COUNT(*) AS n FROM kd_order_items WHERE state IN (",
        );
        let mut states = qb.separated(", ");
        for state in ItemState::OPEN {
            states.push_bind(state.as_str());
        }
        states.push_unseparated(") AND worker_id IN (");
        let mut ids = qb.separated(", ");
        for worker in workers {
            ids.push_bind(*worker);
        }
        ids.push_unseparated(") GROUP BY worker_id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            let worker: WorkerId = row.try_get("worker_id")?;
            let n: i64 = row.try_get("n")?;
            counts.insert(worker, u32::try_from(n).unwrap_or(u32::MAX));
        }
        Ok(counts)
    }

    async fn update_item(
        &self,
        id: ItemId,
        guard: ItemGuard,
        transition: &ItemTransition,
    ) -> Result<bool, DispatchError> {
        let result = sqlx::query(
            "UPDATE kd_order_items \
             SET state = ?, worker_id = ?, assigned_at = ?, finished_at = ? \
             WHERE id = ? AND state = ? AND worker_id IS ?",
        )
        .bind(transition.state.as_str())
        .bind(transition.worker_id)
        .bind(transition.assigned_at.as_ref().map(to_millis))
        .bind(transition.finished_at.as_ref().map(to_millis))
        .bind(id)
        .bind(guard.state.as_str())
        .bind(guard.worker_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl WorkerRoster for SqliteStore {
    async fn active_workers(&self) -> Result<Vec<WorkerId>, DispatchError> {
        let rows =
            sqlx::query("SELECT worker_id FROM kd_kitchen_roster WHERE active = 1 ORDER BY worker_id")
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|row| row.try_get("worker_id").map_err(DispatchError::from))
            .collect()
    }

    async fn enabled_with_role(&self, role: &str) -> Result<Vec<WorkerId>, DispatchError> {
        let rows = sqlx::query(
            "SELECT id FROM kd_staff WHERE enabled = 1 AND role = ? COLLATE NOCASE ORDER BY id",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get("id").map_err(DispatchError::from))
            .collect()
    }

    async fn set_active(&self, worker: WorkerId, active: bool) -> Result<(), DispatchError> {
        sqlx::query(
            "INSERT INTO kd_kitchen_roster (worker_id, active) VALUES (?, ?) \
             ON CONFLICT(worker_id) DO UPDATE SET active = excluded.active",
        )
        .bind(worker)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
