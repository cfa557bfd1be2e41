//! PostgreSQL snapshot store.
//!
//! Rows are written in batches with a single multi-row INSERT per chunk.
//! `upsert_snapshot` mode replaces rows on the full natural key, which must be
//! backed by a matching unique index. A unique violation whose index omits
//! `fetched_at` is a legacy schema that silently destroys history; the store
//! resolves the violated index's column set from the catalog and surfaces that
//! case as a schema mismatch with remediation guidance.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, info};

use crate::domain::{AccountSnapshot, ProtocolSnapshot, WriteMode};
use crate::error::{Result, SnapError};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// A row type the store knows how to batch-write
pub trait SnapshotRecord: Send + Sync {
    /// Column list, in bind order
    fn columns() -> &'static [&'static str];
    /// Natural-key columns, used as the upsert conflict target
    fn key_columns() -> &'static [&'static str];
    /// Bind this row's values in `columns()` order
    fn push_bind(&self, row: &mut Separated<'_, '_, Postgres, &'static str>);
}

impl SnapshotRecord for ProtocolSnapshot {
    fn columns() -> &'static [&'static str] {
        &[
            "address",
            "protocol_id",
            "chain",
            "portfolio_usd",
            "raw",
            "fetched_at",
        ]
    }

    fn key_columns() -> &'static [&'static str] {
        &["address", "protocol_id", "fetched_at"]
    }

    fn push_bind(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.address.clone())
            .push_bind(self.protocol_id.clone())
            .push_bind(self.chain.clone())
            .push_bind(self.portfolio_usd)
            .push_bind(self.raw.clone())
            .push_bind(self.fetched_at);
    }
}

impl SnapshotRecord for AccountSnapshot {
    fn columns() -> &'static [&'static str] {
        &[
            "address",
            "snapshot_type",
            "equity_usd",
            "positions_count",
            "raw",
            "fetched_at",
        ]
    }

    fn key_columns() -> &'static [&'static str] {
        &["address", "snapshot_type", "fetched_at"]
    }

    fn push_bind(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.address.clone())
            .push_bind(self.snapshot_type.clone())
            .push_bind(self.equity_usd)
            .push_bind(self.positions_count)
            .push_bind(self.raw.clone())
            .push_bind(self.fetched_at);
    }
}

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    batch_size: usize,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn connect(database_url: &str, max_connections: u32, batch_size: usize) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool, batch_size })
    }

    /// Create a store from an existing connection pool (zero-cost reuse)
    pub fn from_pool(pool: PgPool, batch_size: usize) -> Self {
        Self { pool, batch_size }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Write protocol snapshot rows under the given mode
    pub async fn write_protocols(
        &self,
        table: &str,
        rows: &[ProtocolSnapshot],
        mode: WriteMode,
    ) -> Result<()> {
        self.write_batched(table, rows, mode).await
    }

    /// Write account snapshot rows under the given mode
    pub async fn write_accounts(
        &self,
        table: &str,
        rows: &[AccountSnapshot],
        mode: WriteMode,
    ) -> Result<()> {
        self.write_batched(table, rows, mode).await
    }

    async fn write_batched<R: SnapshotRecord>(
        &self,
        table: &str,
        rows: &[R],
        mode: WriteMode,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        // Chunking bounds statement size only; a failed chunk fails the call.
        for chunk in rows.chunks(self.batch_size) {
            self.write_chunk(table, chunk, mode).await?;
        }

        debug!(table, rows = rows.len(), mode = %mode, "snapshot rows written");
        Ok(())
    }

    async fn write_chunk<R: SnapshotRecord>(
        &self,
        table: &str,
        chunk: &[R],
        mode: WriteMode,
    ) -> Result<()> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            table,
            R::columns().join(", ")
        ));
        qb.push_values(chunk, |mut b, row| row.push_bind(&mut b));

        if mode == WriteMode::UpsertSnapshot {
            qb.push(format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                R::key_columns().join(", "),
                update_assignments::<R>()
            ));
        }

        match qb.build().execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.diagnose_write_error(err).await),
        }
    }

    /// Turn a unique violation against a legacy (no `fetched_at`) index into a
    /// schema mismatch; everything else passes through unchanged.
    async fn diagnose_write_error(&self, err: sqlx::Error) -> SnapError {
        let constraint = match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                db.constraint().map(str::to_string)
            }
            _ => None,
        };

        let Some(constraint) = constraint else {
            return SnapError::Database(err);
        };

        match self.index_columns(&constraint).await {
            Ok(columns) if is_legacy_snapshot_key(&columns) => SnapError::SchemaMismatch {
                constraint,
                columns: columns.join(", "),
            },
            _ => SnapError::Database(err),
        }
    }

    /// Column set of a unique index/constraint by name. Unique violations
    /// report the backing index, so the lookup goes through pg_index rather
    /// than pg_constraint (which misses plain UNIQUE indexes).
    async fn index_columns(&self, index_name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT a.attname
            FROM pg_index x
            JOIN pg_class i ON i.oid = x.indexrelid
            JOIN pg_attribute a ON a.attrelid = x.indrelid AND a.attnum = ANY (x.indkey)
            WHERE i.relname = $1
            ORDER BY a.attnum
            "#,
        )
        .bind(index_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("attname")).collect())
    }
}

/// Unique key over snapshot columns that omits fetched_at: every new run
/// collides with the previous one, so history cannot accumulate.
fn is_legacy_snapshot_key(columns: &[String]) -> bool {
    !columns.is_empty()
        && columns.iter().any(|c| c == "address")
        && !columns.iter().any(|c| c == "fetched_at")
}

fn update_assignments<R: SnapshotRecord>() -> String {
    R::columns()
        .iter()
        .filter(|c| !R::key_columns().contains(*c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}
