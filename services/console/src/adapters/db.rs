//! services/console/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `TableGateway` port from the `core` crate. Rows travel as JSON: reads use
//! `to_jsonb` and writes go through `jsonb_populate_record`, so one set of
//! statements serves every table.

use async_trait::async_trait;
use hr_console_core::ports::{Filter, PortError, PortResult, Query, Table, TableGateway};
use regex::Regex;
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use std::sync::OnceLock;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `TableGateway` port.
#[derive(Clone)]
pub struct PgTableGateway {
    pool: PgPool,
}

impl PgTableGateway {
    /// Creates a new `PgTableGateway`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_rows(&self, statement: Statement) -> PortResult<Vec<Value>> {
        debug!(sql = %statement.sql, "executing table statement");
        let mut query = sqlx::query_scalar::<_, Value>(&statement.sql);
        for value in statement.binds {
            query = query.bind(Json(value));
        }
        query.fetch_all(&self.pool).await.map_err(map_sqlx_error)
    }
}

fn map_sqlx_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Row not found".to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// Statement Building
//=========================================================================================

/// A SQL statement plus its JSON bind values, numbered `$1..` in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier pattern is valid"))
}

/// Column names are spliced into SQL, so only plain lowercase identifiers pass.
fn column(name: &str) -> PortResult<&str> {
    if identifier_pattern().is_match(name) {
        Ok(name)
    } else {
        Err(PortError::Unexpected(format!("Invalid column name: {}", name)))
    }
}

fn tracks_updates(table: Table) -> bool {
    matches!(table, Table::Employees | Table::Departments | Table::Projects)
}

fn where_clause(filters: &[Filter], binds: &mut Vec<Value>) -> PortResult<String> {
    let mut conditions = Vec::with_capacity(filters.len());
    for filter in filters {
        let name = column(filter.column())?;
        match filter {
            Filter::Eq(_, value) => {
                binds.push(value.clone());
                conditions.push(format!("(to_jsonb(t) -> '{}') = ${}::jsonb", name, binds.len()));
            }
            Filter::IsNull(_) => conditions.push(format!("t.{} IS NULL", name)),
        }
    }
    if conditions.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }
}

fn object_columns(row: &Value) -> PortResult<Vec<&str>> {
    let object = row
        .as_object()
        .ok_or_else(|| PortError::Unexpected("Row payload must be a JSON object".to_string()))?;
    if object.is_empty() {
        return Err(PortError::Unexpected("Row payload has no columns".to_string()));
    }
    object.keys().map(|k| column(k)).collect()
}

pub(crate) fn select_statement(table: Table, query: &Query) -> PortResult<Statement> {
    let mut binds = Vec::new();
    let mut sql = format!("SELECT to_jsonb(t) FROM {} AS t", table.as_str());
    sql.push_str(&where_clause(&query.filters, &mut binds)?);
    if let Some(order) = &query.order {
        let direction = if order.ascending { "ASC" } else { "DESC" };
        sql.push_str(&format!(" ORDER BY t.{} {}", column(&order.column)?, direction));
    }
    Ok(Statement { sql, binds })
}

pub(crate) fn insert_statement(table: Table, row: Value) -> PortResult<Statement> {
    let columns = object_columns(&row)?.join(", ");
    let name = table.as_str();
    let sql = format!(
        "INSERT INTO {name} AS t ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{name}, $1::jsonb) \
         RETURNING to_jsonb(t)"
    );
    Ok(Statement {
        sql,
        binds: vec![row],
    })
}

pub(crate) fn update_statement(
    table: Table,
    filters: &[Filter],
    patch: Value,
) -> PortResult<Statement> {
    let columns = object_columns(&patch)?;
    let mut assignments: Vec<String> = columns.iter().map(|c| format!("{c} = r.{c}")).collect();
    if tracks_updates(table) && !columns.contains(&"updated_at") {
        assignments.push("updated_at = now()".to_string());
    }
    let assignments = assignments.join(", ");

    let mut binds = vec![patch.clone()];
    let filter_sql = where_clause(filters, &mut binds)?;
    let name = table.as_str();
    let sql = format!(
        "UPDATE {name} AS t SET {assignments} \
         FROM jsonb_populate_record(NULL::{name}, $1::jsonb) AS r{filter_sql} \
         RETURNING to_jsonb(t)"
    );
    Ok(Statement { sql, binds })
}

pub(crate) fn delete_statement(table: Table, filters: &[Filter]) -> PortResult<Statement> {
    let mut binds = Vec::new();
    let filter_sql = where_clause(filters, &mut binds)?;
    Ok(Statement {
        sql: format!("DELETE FROM {} AS t{}", table.as_str(), filter_sql),
        binds,
    })
}

//=========================================================================================
// `TableGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl TableGateway for PgTableGateway {
    async fn select(&self, table: Table, query: &Query) -> PortResult<Vec<Value>> {
        self.fetch_rows(select_statement(table, query)?).await
    }

    async fn insert(&self, table: Table, row: Value) -> PortResult<Value> {
        self.fetch_rows(insert_statement(table, row)?)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::Unexpected(format!("Insert into {} returned no row", table.as_str()))
            })
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> PortResult<Vec<Value>> {
        self.fetch_rows(update_statement(table, filters, patch)?).await
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> PortResult<()> {
        let statement = delete_statement(table, filters)?;
        debug!(sql = %statement.sql, "executing table statement");
        let mut query = sqlx::query(&statement.sql);
        for value in statement.binds {
            query = query.bind(Json(value));
        }
        query.execute(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_console_core::ports::Order;
    use serde_json::json;

    #[test]
    fn select_with_filters_and_order() {
        let query = Query::new()
            .filter(Filter::eq("employee_id", 4))
            .filter(Filter::is_null("document_url"))
            .order(Order::desc("created_at"));
        let statement = select_statement(Table::Documents, &query).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT to_jsonb(t) FROM documents AS t \
             WHERE (to_jsonb(t) -> 'employee_id') = $1::jsonb AND t.document_url IS NULL \
             ORDER BY t.created_at DESC"
        );
        assert_eq!(statement.binds, vec![json!(4)]);
    }

    #[test]
    fn insert_lists_only_supplied_columns() {
        let statement =
            insert_statement(Table::Departments, json!({"name": "Ops", "description": null}))
                .unwrap();
        assert!(statement.sql.starts_with(
            "INSERT INTO departments AS t (description, name) SELECT description, name"
        ));
        assert!(statement.sql.ends_with("RETURNING to_jsonb(t)"));
        assert_eq!(statement.binds.len(), 1);
    }

    #[test]
    fn update_numbers_filters_after_the_patch() {
        let statement = update_statement(
            Table::Employees,
            &[Filter::eq("id", 7)],
            json!({"position": "Lead"}),
        )
        .unwrap();
        assert!(statement.sql.contains("SET position = r.position, updated_at = now()"));
        assert!(statement.sql.contains("WHERE (to_jsonb(t) -> 'id') = $2::jsonb"));
        assert_eq!(statement.binds, vec![json!({"position": "Lead"}), json!(7)]);
    }

    #[test]
    fn update_of_requests_does_not_touch_updated_at() {
        let statement = update_statement(
            Table::EmployeeRequests,
            &[Filter::eq("id", "abc")],
            json!({"status": "accepted"}),
        )
        .unwrap();
        assert!(!statement.sql.contains("updated_at"));
    }

    #[test]
    fn rejects_unsafe_column_names() {
        let query = Query::new().filter(Filter::eq("id; DROP TABLE employees", 1));
        assert!(select_statement(Table::Employees, &query).is_err());
        assert!(insert_statement(Table::Employees, json!({"Name": "x"})).is_err());
        assert!(insert_statement(Table::Employees, json!([1, 2])).is_err());
    }

    #[test]
    fn delete_without_filters_has_no_where() {
        let statement = delete_statement(Table::Projects, &[]).unwrap();
        assert_eq!(statement.sql, "DELETE FROM projects AS t");
    }
}
