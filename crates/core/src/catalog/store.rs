//! Session-scoped DuckDB store

use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value as DbValue};
use duckdb::{Connection, params_from_iter};
use serde_json::Number;

use super::error::CatalogError;
use crate::models::{Row, TableName, Value, quote_identifier};

/// Embedded in-memory database holding the loaded table
///
/// At most one connection is open at a time, tagged with the session key it
/// was opened for.
#[derive(Default)]
pub struct CatalogStore {
    conn: Option<Connection>,
    session_key: Option<String>,
    closes: usize,
}

impl CatalogStore {
    /// Create a store with no open connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh session key
    pub fn generate_session_key() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Open an in-memory database for `session_key`
    ///
    /// Opening again with the same key keeps the current connection. A
    /// different key closes the current connection first.
    pub fn open(&mut self, session_key: &str) -> Result<(), CatalogError> {
        if self.conn.is_some() && self.session_key.as_deref() == Some(session_key) {
            return Ok(());
        }
        self.close();

        let conn = Connection::open_in_memory().map_err(|e| CatalogError::Init(e.to_string()))?;
        self.conn = Some(conn);
        self.session_key = Some(session_key.to_string());
        tracing::debug!(session_key, "Opened catalog database");
        Ok(())
    }

    /// Execute one or more SQL statements
    pub fn execute(&self, sql: &str) -> Result<(), CatalogError> {
        let conn = self.conn.as_ref().ok_or(CatalogError::NotOpen)?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Insert all rows in a single transaction
    ///
    /// Columns are taken from the first row; values missing from later rows
    /// are written as NULL. Any failure rolls the whole batch back. An empty
    /// batch succeeds without touching the connection, even when closed.
    pub fn batch_insert(&mut self, table: &TableName, rows: &[Row]) -> Result<usize, CatalogError> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        let conn = self.conn.as_mut().ok_or(CatalogError::NotOpen)?;

        let columns: Vec<&str> = first.columns().collect();
        let sql = insert_statement(table, &columns);

        let insert_error = |row: Option<usize>, err: duckdb::Error| CatalogError::Insert {
            row,
            message: err.to_string(),
        };

        // dropping the transaction without commit rolls it back
        let tx = conn.transaction().map_err(|e| insert_error(None, e))?;
        {
            let mut stmt = tx.prepare(&sql).map_err(|e| insert_error(None, e))?;
            for (i, row) in rows.iter().enumerate() {
                let values = columns
                    .iter()
                    .map(|column| to_db_value(row.get(column).unwrap_or(&Value::Null)));
                stmt.execute(params_from_iter(values))
                    .map_err(|e| insert_error(Some(i), e))?;
            }
        }
        tx.commit().map_err(|e| insert_error(None, e))?;

        tracing::debug!(table = %table, rows = rows.len(), "Inserted batch");
        Ok(rows.len())
    }

    /// Read at most `limit` rows from `table` in natural order
    pub fn query(&self, table: &TableName, limit: usize) -> Result<Vec<Row>, CatalogError> {
        let conn = self.conn.as_ref().ok_or(CatalogError::NotOpen)?;
        let sql = format!("SELECT * FROM {} LIMIT {limit}", table.quoted());
        let query_error = |e: duckdb::Error| CatalogError::Query(e.to_string());

        let mut stmt = conn.prepare(&sql).map_err(query_error)?;
        let mut rows = stmt.query([]).map_err(query_error)?;

        // Get column names after query execution
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let column_names: Vec<String> = (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{i}"))
            })
            .collect();

        let mut results = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let mut out = Row::with_capacity(column_count);
            for (i, name) in column_names.iter().enumerate() {
                let value: DbValue = row.get(i).map_err(query_error)?;
                out.insert(name.clone(), from_db_value(value));
            }
            results.push(out);
        }

        Ok(results)
    }

    /// Count the rows in `table`
    pub fn row_count(&self, table: &TableName) -> Result<usize, CatalogError> {
        let conn = self.conn.as_ref().ok_or(CatalogError::NotOpen)?;
        let sql = format!("SELECT COUNT(*) FROM {}", table.quoted());
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| CatalogError::Query(e.to_string()))?;
        Ok(count.max(0) as usize)
    }

    /// Check if a connection is open
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Session key of the open connection
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    /// Number of connections closed over the store's lifetime
    pub fn close_count(&self) -> usize {
        self.closes
    }

    /// Close the connection
    ///
    /// Returns `true` if a connection was open.
    pub fn close(&mut self) -> bool {
        self.session_key = None;
        let Some(conn) = self.conn.take() else {
            return false;
        };
        self.closes += 1;
        if let Err((_, e)) = conn.close() {
            tracing::warn!(error = %e, "Error while closing catalog database");
        }
        true
    }
}

impl Drop for CatalogStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn insert_statement(table: &TableName, columns: &[&str]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({column_list}) VALUES ({placeholders})",
        table.quoted()
    )
}

fn to_db_value(value: &Value) -> DbValue {
    match value {
        Value::Null => DbValue::Null,
        Value::Bool(b) => DbValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                DbValue::BigInt(i)
            } else if let Some(u) = n.as_u64() {
                DbValue::UBigInt(u)
            } else {
                n.as_f64().map(DbValue::Double).unwrap_or(DbValue::Null)
            }
        }
        Value::Text(s) => DbValue::Text(s.clone()),
    }
}

fn micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn from_float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn from_db_value(value: DbValue) -> Value {
    match value {
        DbValue::Null => Value::Null,
        DbValue::Boolean(b) => Value::Bool(b),
        DbValue::TinyInt(n) => Value::Number(n.into()),
        DbValue::SmallInt(n) => Value::Number(n.into()),
        DbValue::Int(n) => Value::Number(n.into()),
        DbValue::BigInt(n) => Value::Number(n.into()),
        DbValue::UTinyInt(n) => Value::Number(n.into()),
        DbValue::USmallInt(n) => Value::Number(n.into()),
        DbValue::UInt(n) => Value::Number(n.into()),
        DbValue::UBigInt(n) => Value::Number(n.into()),
        DbValue::HugeInt(n) => match i64::try_from(n) {
            Ok(n) => Value::Number(n.into()),
            Err(_) => Value::Text(n.to_string()),
        },
        DbValue::Float(f) => from_float(f as f64),
        DbValue::Double(f) => from_float(f),
        DbValue::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Text(text))
        }
        DbValue::Text(s) => Value::Text(s),
        DbValue::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(|date| Value::Text(date.to_string()))
            .unwrap_or(Value::Text(days.to_string())),
        DbValue::Timestamp(unit, v) => DateTime::from_timestamp_micros(micros(unit, v))
            .map(|ts| Value::Text(ts.naive_utc().to_string()))
            .unwrap_or(Value::Text(v.to_string())),
        DbValue::Time64(unit, v) => {
            let us = micros(unit, v);
            NaiveTime::from_num_seconds_from_midnight_opt(
                (us / 1_000_000) as u32,
                ((us % 1_000_000) * 1_000) as u32,
            )
            .map(|t| Value::Text(t.to_string()))
            .unwrap_or(Value::Text(v.to_string()))
        }
        other => Value::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Row> {
        vec![
            Row::new().with("name", "Alice").with("age", 30),
            Row::new().with("name", "Bob").with("age", 25),
        ]
    }

    fn open_store() -> CatalogStore {
        let mut store = CatalogStore::new();
        store.open("test-session").unwrap();
        store
    }

    #[test]
    fn test_open_is_idempotent_per_key() {
        let mut store = open_store();
        store.execute("CREATE TABLE t (id INTEGER)").unwrap();

        store.open("test-session").unwrap();
        assert!(store.query(&TableName::new("t"), 1).is_ok());
        assert_eq!(store.close_count(), 0);

        store.open("other-session").unwrap();
        assert_eq!(store.close_count(), 1);
        assert_eq!(store.session_key(), Some("other-session"));
        assert!(store.query(&TableName::new("t"), 1).is_err());
    }

    #[test]
    fn test_batch_insert_and_query() {
        let mut store = open_store();
        store
            .execute("CREATE TABLE people (name VARCHAR, age INTEGER)")
            .unwrap();

        let table = TableName::new("people");
        assert_eq!(store.batch_insert(&table, &people()).unwrap(), 2);
        assert_eq!(store.row_count(&table).unwrap(), 2);

        let preview = store.query(&table, 10).unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].get("name"), Some(&Value::from("Alice")));
        assert_eq!(preview[1].get("age"), Some(&Value::from(25)));

        assert_eq!(store.query(&table, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_values_become_null() {
        let mut store = open_store();
        store.execute("CREATE TABLE t (a INTEGER, b VARCHAR)").unwrap();
        let rows = vec![
            Row::new().with("a", 1).with("b", "x"),
            Row::new().with("a", 2),
        ];
        store.batch_insert(&TableName::new("t"), &rows).unwrap();

        let preview = store.query(&TableName::new("t"), 10).unwrap();
        assert!(preview[1].get("b").unwrap().is_null());
    }

    #[test]
    fn test_empty_batch_on_closed_store() {
        let mut store = CatalogStore::new();
        assert_eq!(store.batch_insert(&TableName::new("t"), &[]).unwrap(), 0);
        assert!(!store.is_open());
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut store = open_store();
        store
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v VARCHAR)")
            .unwrap();

        let rows: Vec<Row> = [1, 2, 3, 2, 5]
            .into_iter()
            .map(|id| Row::new().with("id", id).with("v", "x"))
            .collect();
        let err = store.batch_insert(&TableName::new("t"), &rows).unwrap_err();
        assert!(matches!(err, CatalogError::Insert { row: Some(3), .. }));
        assert_eq!(store.row_count(&TableName::new("t")).unwrap(), 0);
    }

    #[test]
    fn test_quoted_identifiers() {
        let mut store = open_store();
        store
            .execute(r#"CREATE TABLE "my table" ("first name" VARCHAR)"#)
            .unwrap();
        let table = TableName::new("my table");
        let rows = vec![Row::new().with("first name", "Ann")];
        store.batch_insert(&table, &rows).unwrap();
        assert_eq!(
            store.query(&table, 5).unwrap()[0].get("first name"),
            Some(&Value::from("Ann"))
        );
    }

    #[test]
    fn test_operations_need_open_connection() {
        let mut store = CatalogStore::new();
        assert_eq!(store.execute("SELECT 1"), Err(CatalogError::NotOpen));
        assert_eq!(
            store.batch_insert(&TableName::new("t"), &people()),
            Err(CatalogError::NotOpen)
        );
        assert!(matches!(
            store.query(&TableName::new("t"), 1),
            Err(CatalogError::NotOpen)
        ));
    }

    #[test]
    fn test_execution_error() {
        let store = open_store();
        assert!(matches!(
            store.execute("CREATE TABLE ("),
            Err(CatalogError::Execution(_))
        ));
        assert!(matches!(
            store.query(&TableName::new("missing"), 1),
            Err(CatalogError::Query(_))
        ));
    }

    #[test]
    fn test_close_is_noop_when_closed() {
        let mut store = open_store();
        assert!(store.close());
        assert!(!store.close());
        assert_eq!(store.close_count(), 1);
        assert!(store.session_key().is_none());
    }

    #[test]
    fn test_date_values_are_rendered() {
        let mut store = open_store();
        store
            .execute("CREATE TABLE d (day DATE, at TIMESTAMP); INSERT INTO d VALUES ('2024-03-01', '2024-03-01 12:30:00')")
            .unwrap();
        let preview = store.query(&TableName::new("d"), 1).unwrap();
        assert_eq!(preview[0].get("day"), Some(&Value::from("2024-03-01")));
        assert_eq!(
            preview[0].get("at"),
            Some(&Value::from("2024-03-01 12:30:00"))
        );
    }

    #[test]
    fn test_generate_session_key_is_unique() {
        assert_ne!(
            CatalogStore::generate_session_key(),
            CatalogStore::generate_session_key()
        );
    }
}
