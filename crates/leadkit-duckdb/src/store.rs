//! Generic data-access helpers.
//!
//! Uniform parameterized-statement execution for the repositories: field-map
//! inserts and updates, row fetches with mapper closures, and offset
//! pagination. Table and column names are always supplied by repository code
//! (enum-constrained internal values); user input only ever reaches the
//! engine through bound parameters.

use std::time::Instant;

use duckdb::types::{ToSql, ToSqlOutput, Value};
use duckdb::Connection;
use serde::Serialize;
use tracing::warn;

use leadkit_core::error::{classify_db_error, StoreError};

/// Statements slower than this are logged at WARN for observability.
const SLOW_QUERY_MS: u128 = 100;

/// Translate a driver error into the closed [`StoreError`] taxonomy.
pub fn db_err(e: duckdb::Error) -> StoreError {
    classify_db_error(&e.to_string())
}

/// A typed column value for field-map writes.
///
/// Replaces the untyped object maps of ad-hoc query building: every value is
/// tagged, and JSON payloads are serialized exactly once, here.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(serde_json::Value),
    Null,
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            FieldValue::Int(i) => ToSqlOutput::Owned(Value::BigInt(*i)),
            FieldValue::Float(f) => ToSqlOutput::Owned(Value::Double(*f)),
            FieldValue::Bool(b) => ToSqlOutput::Owned(Value::Boolean(*b)),
            FieldValue::Json(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => FieldValue::Text(s),
            None => FieldValue::Null,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

fn finish_timing(started: Instant, kind: &str, table: &str) {
    let elapsed = started.elapsed().as_millis();
    if elapsed >= SLOW_QUERY_MS {
        warn!(kind, table, elapsed_ms = elapsed as u64, "slow query");
    }
}

/// Fetch a single row, `None` when the query matches nothing.
pub fn fetch_row<T>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
    mapper: impl FnOnce(&duckdb::Row<'_>) -> duckdb::Result<T>,
) -> Result<Option<T>, StoreError> {
    let started = Instant::now();
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let result = match stmt.query_row(params, mapper) {
        Ok(row) => Ok(Some(row)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err(e)),
    };
    finish_timing(started, "fetch_row", "");
    result
}

/// Fetch all matching rows. Callers must specify `ORDER BY` in `sql` when
/// ordering matters — row order is otherwise unspecified.
pub fn fetch_rows<T>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
    mapper: impl FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
) -> Result<Vec<T>, StoreError> {
    let started = Instant::now();
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt.query_map(params, mapper).map_err(db_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(db_err)?);
    }
    finish_timing(started, "fetch_rows", "");
    Ok(out)
}

/// Build and execute a parameterized INSERT from a field list.
pub fn insert_row(
    conn: &Connection,
    table: &str,
    fields: &[(&str, FieldValue)],
) -> Result<(), StoreError> {
    let columns: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    let params: Vec<&dyn ToSql> = fields.iter().map(|(_, v)| v as &dyn ToSql).collect();

    let started = Instant::now();
    conn.execute(&sql, params.as_slice()).map_err(db_err)?;
    finish_timing(started, "insert", table);
    Ok(())
}

/// Build and execute a parameterized UPDATE from a field list.
///
/// Always re-stamps `updated_at`. Returns the number of affected rows so
/// callers can turn 0 into a NotFound.
pub fn update_row(
    conn: &Connection,
    table: &str,
    fields: &[(&str, FieldValue)],
    where_sql: &str,
    where_params: &[FieldValue],
) -> Result<usize, StoreError> {
    let mut assignments: Vec<String> = Vec::with_capacity(fields.len() + 1);
    let mut idx = 1usize;
    for (name, _) in fields {
        assignments.push(format!("{name} = ?{idx}"));
        idx += 1;
    }
    assignments.push("updated_at = CURRENT_TIMESTAMP".to_string());

    // Shift the WHERE placeholders past the SET ones.
    let shifted_where = renumber_placeholders(where_sql, idx);
    let sql = format!(
        "UPDATE {table} SET {} WHERE {shifted_where}",
        assignments.join(", ")
    );

    let mut params: Vec<&dyn ToSql> = fields.iter().map(|(_, v)| v as &dyn ToSql).collect();
    params.extend(where_params.iter().map(|v| v as &dyn ToSql));

    let started = Instant::now();
    let affected = conn.execute(&sql, params.as_slice()).map_err(db_err)?;
    finish_timing(started, "update", table);
    Ok(affected)
}

/// Execute a parameterized DELETE, returning the number of affected rows.
pub fn delete_row(
    conn: &Connection,
    table: &str,
    where_sql: &str,
    where_params: &[FieldValue],
) -> Result<usize, StoreError> {
    let sql = format!("DELETE FROM {table} WHERE {where_sql}");
    let params: Vec<&dyn ToSql> = where_params.iter().map(|v| v as &dyn ToSql).collect();

    let started = Instant::now();
    let affected = conn.execute(&sql, params.as_slice()).map_err(db_err)?;
    finish_timing(started, "delete", table);
    Ok(affected)
}

/// Rewrite `?1 ?2 …` placeholders in a WHERE fragment to start at `first`.
fn renumber_placeholders(where_sql: &str, first: usize) -> String {
    let mut out = String::with_capacity(where_sql.len());
    let mut chars = where_sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '?' {
            let mut digits = String::new();
            while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                digits.push(chars.next().unwrap_or('0'));
            }
            let n: usize = digits.parse().unwrap_or(1);
            out.push('?');
            out.push_str(&(n + first - 1).to_string());
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Result<Self, StoreError> {
        match raw.map(str::trim) {
            None | Some("") | Some("desc") => Ok(Self::Desc),
            Some("asc") => Ok(Self::Asc),
            Some(_) => Err(StoreError::Validation(
                "order must be 'asc' or 'desc'".to_string(),
            )),
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    pub order_by: Option<String>,
    pub order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            order_by: None,
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// COUNT plus LIMIT/OFFSET SELECT over equality filters.
///
/// `order_by` is validated against `allowed_order`; the default is the first
/// entry in the allow-list. Page numbers below 1 clamp to 1, limits clamp to
/// 1..=100.
#[allow(clippy::too_many_arguments)]
pub fn paginate<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    filters: &[(&str, FieldValue)],
    req: &PageRequest,
    allowed_order: &[&str],
    mapper: impl FnMut(&duckdb::Row<'_>) -> duckdb::Result<T>,
) -> Result<Page<T>, StoreError> {
    let page = req.page.max(1);
    let limit = req.limit.clamp(1, 100);

    let order_by = match req.order_by.as_deref() {
        None => allowed_order.first().copied().unwrap_or("created_at"),
        Some(requested) => allowed_order
            .iter()
            .copied()
            .find(|col| *col == requested)
            .ok_or_else(|| {
                StoreError::Validation(format!(
                    "order_by must be one of: {}",
                    allowed_order.join(", ")
                ))
            })?,
    };

    let mut where_parts: Vec<String> = Vec::with_capacity(filters.len());
    for (i, (name, _)) in filters.iter().enumerate() {
        where_parts.push(format!("{name} = ?{}", i + 1));
    }
    let where_sql = if where_parts.is_empty() {
        "1 = 1".to_string()
    } else {
        where_parts.join(" AND ")
    };
    let params: Vec<&dyn ToSql> = filters.iter().map(|(_, v)| v as &dyn ToSql).collect();

    let started = Instant::now();

    let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE {where_sql}");
    let total: i64 = conn
        .prepare(&count_sql)
        .map_err(db_err)?
        .query_row(params.as_slice(), |row| row.get(0))
        .map_err(db_err)?;

    let offset = (page - 1) * limit;
    let select_sql = format!(
        "SELECT {columns} FROM {table} WHERE {where_sql} \
         ORDER BY {order_by} {}, id ASC LIMIT {limit} OFFSET {offset}",
        req.order.keyword()
    );
    let mut stmt = conn.prepare(&select_sql).map_err(db_err)?;
    let rows = stmt.query_map(params.as_slice(), mapper).map_err(db_err)?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row.map_err(db_err)?);
    }

    finish_timing(started, "paginate", table);

    let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
    Ok(Page {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            pages,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renumber_shifts_all_placeholders() {
        assert_eq!(
            renumber_placeholders("id = ?1 AND organization_id = ?2", 4),
            "id = ?4 AND organization_id = ?5"
        );
    }

    #[test]
    fn sort_order_parses() {
        assert_eq!(SortOrder::parse(Some("asc")).unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::parse(None).unwrap(), SortOrder::Desc);
        assert!(SortOrder::parse(Some("sideways")).is_err());
    }

    #[test]
    fn insert_and_paginate_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE things (id VARCHAR PRIMARY KEY, organization_id VARCHAR, name VARCHAR, \
             created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP, updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
        )
        .unwrap();
        for i in 0..5 {
            insert_row(
                &conn,
                "things",
                &[
                    ("id", FieldValue::Text(format!("t_{i}"))),
                    ("organization_id", FieldValue::from("org_a")),
                    ("name", FieldValue::Text(format!("thing {i}"))),
                ],
            )
            .unwrap();
        }
        insert_row(
            &conn,
            "things",
            &[
                ("id", FieldValue::from("t_other")),
                ("organization_id", FieldValue::from("org_b")),
                ("name", FieldValue::from("other")),
            ],
        )
        .unwrap();

        let req = PageRequest {
            page: 1,
            limit: 2,
            order_by: Some("id".to_string()),
            order: SortOrder::Asc,
        };
        let page = paginate(
            &conn,
            "things",
            "id, name",
            &[("organization_id", FieldValue::from("org_a"))],
            &req,
            &["id", "created_at"],
            |row| row.get::<_, String>(0),
        )
        .unwrap();
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.data, vec!["t_0".to_string(), "t_1".to_string()]);
    }

    #[test]
    fn paginate_rejects_unlisted_order_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE things (id VARCHAR, created_at TIMESTAMP)")
            .unwrap();
        let req = PageRequest {
            order_by: Some("name; DROP TABLE things".to_string()),
            ..PageRequest::default()
        };
        let result = paginate(&conn, "things", "id", &[], &req, &["created_at"], |row| {
            row.get::<_, String>(0)
        });
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn update_row_stamps_updated_at_and_reports_affected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE things (id VARCHAR, name VARCHAR, updated_at TIMESTAMP DEFAULT '2000-01-01')",
        )
        .unwrap();
        conn.execute("INSERT INTO things (id, name) VALUES ('t_1', 'old')", [])
            .unwrap();

        let affected = update_row(
            &conn,
            "things",
            &[("name", FieldValue::from("new"))],
            "id = ?1",
            &[FieldValue::from("t_1")],
        )
        .unwrap();
        assert_eq!(affected, 1);

        let (name, stamped): (String, String) = conn
            .prepare("SELECT name, CAST(updated_at AS VARCHAR) FROM things WHERE id = 't_1'")
            .unwrap()
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        assert_eq!(name, "new");
        assert!(!stamped.starts_with("2000"));

        let missing = update_row(
            &conn,
            "things",
            &[("name", FieldValue::from("x"))],
            "id = ?1",
            &[FieldValue::from("t_404")],
        )
        .unwrap();
        assert_eq!(missing, 0);
    }
}
