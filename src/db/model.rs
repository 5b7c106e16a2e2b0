//! Record accessor.
//!
//! # Responsibilities
//! - Generic INSERT / UPDATE / SELECT against caller-named tables
//! - Collision-checked UUID generation
//! - Optional transaction wrapping of writes
//!
//! # Design Decisions
//! - Only values are bound; table and column names are interpolated and
//!   must pass the identifier check
//! - `columns` and `condition` text is trusted SQL supplied by code, never
//!   by request input
//! - UPDATE binds SET values as `:set_<col>` and condition values as
//!   `:cond_<name>` so the two never collide

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use uuid::Uuid;

use crate::db::connection::Connection;
use crate::db::error::{DbError, DbResult};
use crate::db::value::{placeholder_name, Fields, Params, Record, Value};

/// Column checked by [`Model::generate_unique_id`] when none is given.
pub const DEFAULT_UUID_COLUMN: &str = "uuid";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid identifier regex")
});

/// WHERE clause text plus the named values it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    condition: String,
    params: Vec<(String, Value)>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self::all()
    }
}

impl Criteria {
    /// Matches every row (`1=1`).
    pub fn all() -> Self {
        Self::new("1=1")
    }

    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            params: Vec::new(),
        }
    }

    /// Bind a value for a `:name` placeholder in the condition.
    pub fn bind(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.params.push((placeholder_name(name.as_ref()), value.into()));
        self
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    fn to_params(&self) -> Params {
        if self.params.is_empty() {
            Params::None
        } else {
            Params::Named(self.params.clone())
        }
    }
}

/// Generic CRUD helper bound to one connection.
#[derive(Clone, Copy)]
pub struct Model<'c> {
    conn: &'c Connection,
    transactional: bool,
}

impl<'c> Model<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            transactional: false,
        }
    }

    /// Wrap `insert` and `update` in their own transaction.
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    pub fn begin_transaction(&self) -> DbResult<()> {
        self.conn.begin_transaction()
    }

    pub fn commit(&self) -> DbResult<()> {
        self.conn.commit()
    }

    pub fn roll_back(&self) -> DbResult<()> {
        self.conn.roll_back()
    }

    /// Generate a UUID v4 not yet present in `table.uuid`.
    pub fn generate_unique_id(&self, table: &str) -> DbResult<String> {
        self.generate_unique_id_in(table, DEFAULT_UUID_COLUMN)
    }

    /// Generate a UUID v4 not yet present in `table.column`.
    pub fn generate_unique_id_in(&self, table: &str, column: &str) -> DbResult<String> {
        self.generate_unique_id_with(table, column, Uuid::new_v4)
    }

    /// Rejection-sample ids from `source` until one is absent from `table.column`.
    ///
    /// Issues one existence query per candidate; there is no retry limit.
    pub fn generate_unique_id_with<F>(&self, table: &str, column: &str, mut source: F) -> DbResult<String>
    where
        F: FnMut() -> Uuid,
    {
        check_identifier(table)?;
        check_identifier(column)?;

        let sql = format!("SELECT {column} FROM {table} WHERE {column} = :uuid LIMIT 1");
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let candidate = source().hyphenated().to_string();
            let params = Params::named().bind(":uuid", candidate.as_str());
            if self.conn.fetch_one(&sql, &params)?.is_none() {
                tracing::debug!(table, column, attempts, "Unique id generated");
                return Ok(candidate);
            }
            tracing::debug!(table, column, attempts, "Generated id already taken, retrying");
        }
    }

    /// `INSERT INTO table (k1, …) VALUES (:k1, …)`.
    ///
    /// Returns whether a row was written.
    pub fn insert(&self, table: &str, fields: &Fields) -> DbResult<bool> {
        check_identifier(table)?;
        if fields.is_empty() {
            return Err(DbError::EmptyFields(table.to_string()));
        }

        let mut columns = Vec::with_capacity(fields.len());
        let mut binds = Vec::with_capacity(fields.len());
        let mut params = Vec::with_capacity(fields.len());
        for (column, value) in fields.iter() {
            check_identifier(column)?;
            columns.push(column);
            binds.push(format!(":{column}"));
            params.push((format!(":{column}"), value.clone()));
        }

        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            binds.join(", ")
        );
        let changed = self.write(|conn| conn.run(&sql, &Params::Named(params)))?;
        Ok(changed > 0)
    }

    /// `UPDATE table SET k = :set_k, … WHERE condition`.
    ///
    /// Returns true once the statement executed, even when no row matched.
    pub fn update(&self, table: &str, fields: &Fields, criteria: &Criteria) -> DbResult<bool> {
        let (sql, params) = build_update(table, fields, criteria)?;
        self.write(|conn| conn.run(&sql, &params))?;
        Ok(true)
    }

    /// First row matching `criteria`, or an empty record.
    pub fn find_one(&self, table: &str, columns: &str, criteria: &Criteria) -> DbResult<Record> {
        check_identifier(table)?;
        let sql = format!(
            "SELECT {columns} FROM {table} WHERE {} LIMIT 1",
            criteria.condition
        );
        Ok(self
            .conn
            .fetch_all(&sql, &criteria.to_params())?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Every row matching `criteria`.
    pub fn find_all(&self, table: &str, columns: &str, criteria: &Criteria) -> DbResult<Vec<Record>> {
        check_identifier(table)?;
        let sql = format!("SELECT {columns} FROM {table} WHERE {}", criteria.condition);
        self.conn.fetch_all(&sql, &criteria.to_params())
    }

    fn write<T>(&self, op: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        // Only the transaction we open is ours to finish.
        let owned = self.transactional && !self.conn.in_transaction();
        if owned {
            self.conn.begin_transaction()?;
        }

        match op(self.conn) {
            Ok(value) => {
                if owned {
                    self.conn.commit()?;
                }
                Ok(value)
            }
            Err(e) => {
                if owned {
                    if let Err(rollback) = self.conn.roll_back() {
                        tracing::error!(error = %rollback, "Rollback failed");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Build the UPDATE statement and its merged parameter set.
pub(crate) fn build_update(table: &str, fields: &Fields, criteria: &Criteria) -> DbResult<(String, Params)> {
    check_identifier(table)?;
    if fields.is_empty() {
        return Err(DbError::EmptyFields(table.to_string()));
    }

    let mut set_clauses = Vec::with_capacity(fields.len());
    let mut params = Vec::with_capacity(fields.len() + criteria.params.len());
    for (column, value) in fields.iter() {
        check_identifier(column)?;
        set_clauses.push(format!("{column} = :set_{column}"));
        params.push((format!(":set_{column}"), value.clone()));
    }

    let mut condition = criteria.condition.clone();
    for (name, value) in &criteria.params {
        let bare = name.trim_start_matches([':', '@', '$']);
        let token = Regex::new(&format!(r"{}\b", regex::escape(name)))
            .map_err(|_| DbError::InvalidIdentifier(name.clone()))?;
        condition = token
            .replace_all(&condition, NoExpand(&format!(":cond_{bare}")))
            .into_owned();
        params.push((format!(":cond_{bare}"), value.clone()));
    }

    let sql = format!(
        "UPDATE {table} SET {} WHERE {condition}",
        set_clauses.join(", ")
    );
    Ok((sql, Params::Named(params)))
}

/// Reject table/column names outside `[A-Za-z_][A-Za-z0-9_]*` (optionally schema-qualified).
pub fn check_identifier(name: &str) -> DbResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        assert!(conn.execute(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                uuid TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT,
                age INTEGER
            );"
        ));
        conn
    }

    #[test]
    fn test_insert_then_find_one_round_trip() {
        let conn = setup();
        let model = Model::new(&conn);
        let uuid = model.generate_unique_id("users").unwrap();
        let fields = Fields::new()
            .with("uuid", uuid.as_str())
            .with("name", "Bob")
            .with("email", "bob@example.com")
            .with("age", 41);

        assert!(model.insert("users", &fields).unwrap());

        let found = model
            .find_one(
                "users",
                "uuid, name, email, age",
                &Criteria::new("uuid = :uuid").bind(":uuid", uuid.as_str()),
            )
            .unwrap();
        assert_eq!(found, fields.to_record());
    }

    #[test]
    fn test_find_one_empty_record_when_missing() {
        let conn = setup();
        let model = Model::new(&conn);
        let found = model
            .find_one("users", "*", &Criteria::new("id = :id").bind("id", 99))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_all_with_defaults() {
        let conn = setup();
        let model = Model::new(&conn);
        for name in ["a", "b", "c"] {
            let uuid = model.generate_unique_id("users").unwrap();
            model
                .insert("users", &Fields::new().with("uuid", uuid).with("name", name))
                .unwrap();
        }
        assert_eq!(model.find_all("users", "*", &Criteria::all()).unwrap().len(), 3);
        let filtered = model
            .find_all("users", "name", &Criteria::new("name <> :name").bind("name", "b"))
            .unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_update_parameter_names_do_not_collide() {
        let (sql, params) = build_update(
            "users",
            &Fields::new().with("id", 9).with("name", "Bob"),
            &Criteria::new("id = :id AND name <> :name").bind(":id", 5).bind("name", "x"),
        )
        .unwrap();

        assert_eq!(
            sql,
            "UPDATE users SET id = :set_id, name = :set_name WHERE id = :cond_id AND name <> :cond_name"
        );
        let Params::Named(pairs) = params else {
            panic!("expected named params");
        };
        let names: HashSet<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names.len(), pairs.len());
        assert!(names.contains(":set_id") && names.contains(":cond_id"));
    }

    #[test]
    fn test_update_rewrite_leaves_longer_placeholders_alone() {
        let (sql, _) = build_update(
            "users",
            &Fields::new().with("name", "Bob"),
            &Criteria::new("id = :id OR identity = :identity").bind(":id", 5),
        )
        .unwrap();
        assert!(sql.ends_with("WHERE id = :cond_id OR identity = :identity"));
    }

    #[test]
    fn test_update_same_base_name_in_set_and_where() {
        let conn = setup();
        let model = Model::new(&conn);
        model
            .insert("users", &Fields::new().with("uuid", "u-1").with("name", "Old"))
            .unwrap();

        let updated = model
            .update(
                "users",
                &Fields::new().with("name", "New"),
                &Criteria::new("name = :name").bind(":name", "Old"),
            )
            .unwrap();
        assert!(updated);

        let row = model
            .find_one("users", "name", &Criteria::new("uuid = :uuid").bind("uuid", "u-1"))
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("New".into())));
    }

    #[test]
    fn test_generate_unique_id_thousand_calls() {
        let conn = setup();
        let model = Model::new(&conn);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let before = conn.statements_executed();
            let id = model.generate_unique_id("users").unwrap();
            assert!(conn.statements_executed() > before);
            assert!(Uuid::parse_str(&id).is_ok());
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_generate_unique_id_single_query_without_collision() {
        let conn = setup();
        let model = Model::new(&conn);
        let before = conn.statements_executed();
        model.generate_unique_id("users").unwrap();
        assert_eq!(conn.statements_executed(), before + 1);
    }

    #[test]
    fn test_generate_unique_id_retries_on_collision() {
        let conn = setup();
        let model = Model::new(&conn);
        let taken = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        model
            .insert(
                "users",
                &Fields::new().with("uuid", taken.hyphenated().to_string()).with("name", "x"),
            )
            .unwrap();

        let mut queue = vec![fresh, taken, taken];
        let before = conn.statements_executed();
        let id = model
            .generate_unique_id_with("users", "uuid", || queue.pop().unwrap())
            .unwrap();

        assert_eq!(id, fresh.hyphenated().to_string());
        assert_eq!(conn.statements_executed(), before + 3);
    }

    #[test]
    fn test_transactional_insert_rolls_back_on_error() {
        let conn = setup();
        let model = Model::new(&conn).with_transactions(true);
        model
            .insert("users", &Fields::new().with("uuid", "dup").with("name", "a"))
            .unwrap();
        assert!(!conn.in_transaction());

        let err = model.insert("users", &Fields::new().with("uuid", "dup").with("name", "b"));
        assert!(matches!(err, Err(DbError::Sqlite(_))));
        assert!(!conn.in_transaction());
        assert_eq!(model.find_all("users", "*", &Criteria::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_transactional_write_respects_outer_transaction() {
        let conn = setup();
        let model = Model::new(&conn).with_transactions(true);
        model.begin_transaction().unwrap();
        model
            .insert("users", &Fields::new().with("uuid", "u").with("name", "a"))
            .unwrap();
        assert!(conn.in_transaction());
        model.roll_back().unwrap();
        assert!(model.find_all("users", "*", &Criteria::all()).unwrap().is_empty());
    }

    #[test]
    fn test_identifier_check() {
        assert!(check_identifier("users").is_ok());
        assert!(check_identifier("main.users").is_ok());
        assert!(check_identifier("users; DROP TABLE users").is_err());
        assert!(check_identifier("1users").is_err());

        let conn = setup();
        let model = Model::new(&conn);
        let err = model.insert("users", &Fields::new().with("name) VALUES ('x'); --", "x"));
        assert!(matches!(err, Err(DbError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let conn = setup();
        let model = Model::new(&conn);
        assert!(matches!(
            model.insert("users", &Fields::new()),
            Err(DbError::EmptyFields(_))
        ));
    }
}
