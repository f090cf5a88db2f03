//! services/console/src/stores/mod.rs
//!
//! Entity stores: cached collections of remote rows with a loading flag and an
//! inline error message.
//!
//! Every async operation holds a [`BusyGuard`] for its whole duration, so the
//! loading flag is cleared on every exit path. Failures are recorded in
//! `error` and leave the cached items as they were.

pub mod dashboard;
pub mod documents;
pub mod employees;
pub mod records;
pub mod requests;

use hr_console_core::domain::{Department, Document, Employee, EmployeeRequest, Project};
use hr_console_core::ports::{Filter, Order, PortError, PortResult, Query, Table, TableGateway};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::error;

pub use dashboard::{summarize, DashboardSummary};
pub use documents::{PendingUpload, UploadReport, DEFAULT_DOCUMENT_LABELS, DOCUMENT_BUCKET};
pub use employees::{department_name, project_name};
pub use requests::ReviewDecision;

pub type EmployeeStore = TableStore<Employee>;
pub type DepartmentStore = TableStore<Department>;
pub type ProjectStore = TableStore<Project>;
pub type DocumentStore = TableStore<Document>;
pub type RequestStore = TableStore<EmployeeRequest>;

//=========================================================================================
// Busy Flag
//=========================================================================================

/// A shared "operation in flight" flag.
///
/// Counts live guards, so overlapping operations keep it raised until the last
/// one finishes.
#[derive(Clone, Debug, Default)]
pub struct BusyFlag(Arc<AtomicUsize>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }

    /// Raises the flag until the returned guard is dropped.
    pub fn acquire(&self) -> BusyGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        BusyGuard(self.0.clone())
    }
}

#[must_use = "the flag drops as soon as the guard does"]
pub struct BusyGuard(Arc<AtomicUsize>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

//=========================================================================================
// Record Traits
//=========================================================================================

/// A row type a [`TableStore`] can cache.
pub trait Record: DeserializeOwned + Clone + Send + Sync {
    type Id: Serialize + PartialEq + Clone + Send + Sync;

    const TABLE: Table;
    /// Whether the view lists rows newest first (new rows go to the front).
    const NEWEST_FIRST: bool;

    fn id(&self) -> &Self::Id;

    fn fetch_order() -> Order {
        if Self::NEWEST_FIRST {
            Order::desc("created_at")
        } else {
            Order::asc("id")
        }
    }
}

/// A record with a form-backed draft used for both inserts and updates.
pub trait Editable: Record {
    type Draft: Serialize + Sync;
}

fn to_json<S: Serialize>(value: &S) -> PortResult<Value> {
    serde_json::to_value(value).map_err(|e| PortError::Unexpected(e.to_string()))
}

fn decode<T: Record>(row: Value) -> PortResult<T> {
    serde_json::from_value(row).map_err(|e| {
        PortError::Unexpected(format!("Malformed {} row: {}", T::TABLE.as_str(), e))
    })
}

fn id_filter<T: Record>(id: &T::Id) -> PortResult<Filter> {
    Ok(Filter::Eq("id".to_string(), to_json(id)?))
}

//=========================================================================================
// The Generic Store
//=========================================================================================

pub struct TableStore<T> {
    gateway: Arc<dyn TableGateway>,
    items: Vec<T>,
    busy: BusyFlag,
    error: Option<String>,
}

impl<T: Record> TableStore<T> {
    pub fn new(gateway: Arc<dyn TableGateway>) -> Self {
        Self {
            gateway,
            items: Vec::new(),
            busy: BusyFlag::default(),
            error: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_set()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the cached items with a fresh read of the table.
    pub async fn fetch(&mut self) {
        self.fetch_where(Query::new().order(T::fetch_order())).await;
    }

    pub async fn delete(&mut self, id: &T::Id) {
        let _busy = self.begin();
        let result = async {
            let filter = id_filter::<T>(id)?;
            self.gateway.delete(T::TABLE, &[filter]).await
        }
        .await;
        match result {
            Ok(()) => self.items.retain(|item| item.id() != id),
            Err(e) => self.fail(e),
        }
    }

    pub(crate) async fn fetch_where(&mut self, query: Query) {
        let _busy = self.begin();
        match self.select(&query).await {
            Ok(items) => self.items = items,
            Err(e) => self.fail(e),
        }
    }

    pub(crate) async fn select(&self, query: &Query) -> PortResult<Vec<T>> {
        self.gateway
            .select(T::TABLE, query)
            .await?
            .into_iter()
            .map(decode::<T>)
            .collect()
    }

    /// Clears the previous error and raises the loading flag.
    pub(crate) fn begin(&mut self) -> BusyGuard {
        self.error = None;
        self.busy.acquire()
    }

    pub(crate) fn fail(&mut self, e: PortError) {
        error!(table = T::TABLE.as_str(), "Store operation failed: {}", e);
        self.error = Some(e.message());
    }

    pub(crate) fn gateway(&self) -> &Arc<dyn TableGateway> {
        &self.gateway
    }

    pub(crate) fn remember(&mut self, item: T) {
        if T::NEWEST_FIRST {
            self.items.insert(0, item);
        } else {
            self.items.push(item);
        }
    }
}

impl<T: Editable> TableStore<T> {
    pub async fn add(&mut self, draft: &T::Draft) {
        let _busy = self.begin();
        let result = async {
            let row = self.gateway.insert(T::TABLE, to_json(draft)?).await?;
            decode::<T>(row)
        }
        .await;
        match result {
            Ok(item) => self.remember(item),
            Err(e) => self.fail(e),
        }
    }

    pub async fn update(&mut self, id: &T::Id, draft: &T::Draft) {
        let _busy = self.begin();
        let result = async {
            let filter = id_filter::<T>(id)?;
            let rows = self.gateway.update(T::TABLE, &[filter], to_json(draft)?).await?;
            let row = rows.into_iter().next().ok_or_else(|| {
                PortError::NotFound(format!("No {} row matched the update", T::TABLE.as_str()))
            })?;
            decode::<T>(row)
        }
        .await;
        match result {
            Ok(updated) => {
                if let Some(slot) = self.items.iter_mut().find(|item| item.id() == id) {
                    *slot = updated;
                }
            }
            Err(e) => self.fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_guards_keep_the_flag_raised() {
        let flag = BusyFlag::default();
        let first = flag.acquire();
        let second = flag.clone().acquire();
        assert!(flag.is_set());

        drop(first);
        assert!(flag.is_set());

        drop(second);
        assert!(!flag.is_set());
    }
}
