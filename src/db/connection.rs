//! Connection accessor.
//!
//! # Responsibilities
//! - Open the single database handle at startup
//! - Prepare, execute and fetch with bound parameters
//! - Single-level transaction control
//!
//! # Design Decisions
//! - Constructed explicitly and passed by reference; no global handle
//! - Errors always surface as `DbError` (raise-on-error mode)
//! - `begin_transaction` inside an active transaction is a no-op,
//!   `commit`/`roll_back` outside one are no-ops
//! - Not `Sync`: the server serializes access behind a mutex

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rusqlite::{OpenFlags, Statement};

use crate::config::DatabaseConfig;
use crate::db::error::{DbError, DbResult};
use crate::db::value::{Params, Record, Value};

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// The application's database handle.
pub struct Connection {
    inner: rusqlite::Connection,
    dsn: String,
    statements: AtomicU64,
}

impl Connection {
    /// Open the database described by `config`.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        let dsn = config.dsn();
        let inner = if config.schema == IN_MEMORY {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open_with_flags(
                &config.schema,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
        }
        .map_err(|source| DbError::Connect { dsn: dsn.clone(), source })?;

        inner
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|source| DbError::Connect { dsn: dsn.clone(), source })?;
        inner
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|source| DbError::Connect { dsn: dsn.clone(), source })?;

        tracing::info!(
            dsn = %dsn,
            host = %config.host,
            port = config.port,
            username = %config.username,
            "Database connection established"
        );

        Ok(Self {
            inner,
            dsn,
            statements: AtomicU64::new(0),
        })
    }

    /// Open a fresh in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DatabaseConfig {
            schema: IN_MEMORY.to_string(),
            ..DatabaseConfig::default()
        })
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Prepare a statement on the shared handle.
    pub fn prepare(&self, sql: &str) -> DbResult<Statement<'_>> {
        Ok(self.inner.prepare(sql)?)
    }

    /// Run one or more statements without parameters.
    ///
    /// Returns whether execution did not fail; failures are logged.
    pub fn execute(&self, sql: &str) -> bool {
        match self.execute_script(sql) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Statement failed");
                false
            }
        }
    }

    /// Run a batch of statements, surfacing the first failure.
    pub fn execute_script(&self, sql: &str) -> DbResult<()> {
        self.statements.fetch_add(1, Ordering::Relaxed);
        self.inner.execute_batch(sql)?;
        Ok(())
    }

    /// Run a parameterized statement, returning the number of changed rows.
    pub fn run(&self, sql: &str, params: &Params) -> DbResult<usize> {
        let mut stmt = self.prepare(sql)?;
        bind(&mut stmt, params)?;
        self.statements.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(sql = %sql, "Executing statement");
        Ok(stmt.raw_execute()?)
    }

    /// First row of the result, or `None` when the query returns no rows.
    pub fn fetch_one(&self, sql: &str, params: &Params) -> DbResult<Option<Record>> {
        Ok(self.query(sql, params, Some(1))?.into_iter().next())
    }

    /// Every row of the result.
    pub fn fetch_all(&self, sql: &str, params: &Params) -> DbResult<Vec<Record>> {
        self.query(sql, params, None)
    }

    fn query(&self, sql: &str, params: &Params, limit: Option<usize>) -> DbResult<Vec<Record>> {
        let mut stmt = self.prepare(sql)?;
        bind(&mut stmt, params)?;
        self.statements.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(sql = %sql, "Executing query");

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.raw_query();
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, name) in columns.iter().enumerate() {
                record.insert(name.clone(), row.get::<_, Value>(i)?);
            }
            records.push(record);
            if limit.is_some_and(|l| records.len() >= l) {
                break;
            }
        }
        Ok(records)
    }

    /// Start a transaction unless one is already active.
    pub fn begin_transaction(&self) -> DbResult<()> {
        if self.in_transaction() {
            tracing::debug!("Transaction already active; begin ignored");
            return Ok(());
        }
        self.inner.execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        !self.inner.is_autocommit()
    }

    pub fn commit(&self) -> DbResult<()> {
        if self.in_transaction() {
            self.inner.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    pub fn roll_back(&self) -> DbResult<()> {
        if self.in_transaction() {
            self.inner.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// Row id produced by the most recent successful INSERT.
    pub fn last_insert_id(&self) -> String {
        self.inner.last_insert_rowid().to_string()
    }

    /// Number of statements executed through this accessor.
    pub fn statements_executed(&self) -> u64 {
        self.statements.load(Ordering::Relaxed)
    }
}

fn bind(stmt: &mut Statement<'_>, params: &Params) -> DbResult<()> {
    match params {
        Params::None => {}
        Params::Positional(values) => {
            for (i, value) in values.iter().enumerate() {
                stmt.raw_bind_parameter(i + 1, value)?;
            }
        }
        Params::Named(pairs) => {
            for (name, value) in pairs {
                let index = stmt
                    .parameter_index(name)?
                    .ok_or_else(|| DbError::UnknownParameter(name.clone()))?;
                stmt.raw_bind_parameter(index, value)?;
            }
        }
    }
    Ok(())
}
