//! crates/hr_console_core/src/ports.rs
//!
//! Defines the service contracts (traits) the console depends on.
//! The remote data gateway, blob storage and browser-local storage are all
//! reached through these ports, so the session manager, notification center
//! and entity stores never see a concrete backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::domain::{AuthChange, Session, SignUpProfile, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Invalid login credentials")]
    Unauthorized,
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PortError {
    /// The bare message shown inline next to a form or table.
    pub fn message(&self) -> String {
        match self {
            PortError::NotFound(m) | PortError::Unexpected(m) | PortError::Storage(m) => m.clone(),
            PortError::Unauthorized => self.to_string(),
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Table Query Types
//=========================================================================================

/// The remote tables the console reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Employees,
    Departments,
    Projects,
    Documents,
    EmployeeRequests,
    UserCredentials,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Employees => "employees",
            Table::Departments => "departments",
            Table::Projects => "projects",
            Table::Documents => "documents",
            Table::EmployeeRequests => "employee_requests",
            Table::UserCredentials => "user_credentials",
        }
    }
}

/// A row predicate. Filters in a list are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    IsNull(String),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn is_null(column: &str) -> Self {
        Filter::IsNull(column.to_string())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::IsNull(column) => column,
        }
    }

    /// Evaluates the predicate against a JSON row.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column) == Some(value),
            Filter::IsNull(column) => row.get(column).map_or(true, Value::is_null),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// Filters plus an optional ordering for a `select`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A stream of session change events. Dropping it ends the subscription.
pub type AuthChangeStream = Pin<Box<dyn Stream<Item = AuthChange> + Send>>;

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Returns the session restored from the current browser profile, if any.
    async fn get_current_session(&self) -> PortResult<Option<Session>>;

    /// Subscribes to session change events, delivered in the order the gateway observed them.
    fn on_session_change(&self) -> AuthChangeStream;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Session>;

    async fn sign_up(&self, email: &str, password: &str, profile: &SignUpProfile)
        -> PortResult<User>;

    async fn sign_out(&self) -> PortResult<()>;
}

/// Generic row access to the remote relational store. Rows travel as JSON objects.
#[async_trait]
pub trait TableGateway: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> PortResult<Vec<Value>>;

    /// Inserts one row and returns it as stored (with generated columns filled in).
    async fn insert(&self, table: Table, row: Value) -> PortResult<Value>;

    /// Applies `patch` to every matching row and returns the updated rows.
    async fn update(&self, table: Table, filters: &[Filter], patch: Value)
        -> PortResult<Vec<Value>>;

    async fn delete(&self, table: Table, filters: &[Filter]) -> PortResult<()>;
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores an opaque blob under `path` inside `bucket`.
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> PortResult<()>;

    /// Resolves the public URL of a stored blob. Does not check that it exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Synchronous, per-profile key/value storage (the browser's `localStorage`).
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    fn remove(&self, key: &str) -> PortResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_match_json_rows() {
        let row = json!({"id": 3, "employee_id": 9, "document_url": null});
        assert!(Filter::eq("employee_id", 9).matches(&row));
        assert!(!Filter::eq("employee_id", 10).matches(&row));
        assert!(Filter::is_null("document_url").matches(&row));
        assert!(Filter::is_null("missing").matches(&row));
        assert!(!Filter::is_null("id").matches(&row));
    }
}
