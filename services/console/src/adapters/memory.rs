//! services/console/src/adapters/memory.rs
//!
//! In-memory implementations of every port. They back the console when no
//! database is configured and serve as scriptable doubles in tests: failures can
//! be injected, the initial session query can be held back, and raw auth
//! events can be emitted directly.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use hr_console_core::domain::{AuthChange, Session, SignUpProfile, User};
use hr_console_core::ports::{
    AuthChangeStream, AuthGateway, BlobStorage, Filter, LocalStorage, PortError, PortResult,
    Query, Table, TableGateway,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex as StdMutex;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use super::auth::ChangeFanout;

fn poisoned() -> PortError {
    PortError::Storage("In-memory lock poisoned".to_string())
}

//=========================================================================================
// Local Storage
//=========================================================================================

#[derive(Default)]
pub struct MemoryLocalStorage {
    entries: StdMutex<HashMap<String, String>>,
    fail_writes: StdMutex<bool>,
    writes: AtomicUsize,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `set`/`remove` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    fn check_writable(&self) -> PortResult<()> {
        if *self.fail_writes.lock().map_err(|_| poisoned())? {
            Err(PortError::Storage("QuotaExceededError".to_string()))
        } else {
            Ok(())
        }
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.check_writable()?;
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.check_writable()?;
        self.entries.lock().map_err(|_| poisoned())?.remove(key);
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

//=========================================================================================
// Tables
//=========================================================================================

#[derive(Default)]
struct TableData {
    rows: HashMap<Table, Vec<Value>>,
    next_ids: HashMap<Table, i64>,
}

#[derive(Default)]
pub struct MemoryTableGateway {
    data: Mutex<TableData>,
    fail_next: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MemoryTableGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next table call fail with `message`.
    pub async fn fail_next(&self, message: &str) {
        *self.fail_next.lock().await = Some(message.to_string());
    }

    /// Number of table calls received so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Current rows of `table`, in insertion order.
    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.data
            .lock()
            .await
            .rows
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    async fn begin_call(&self) -> PortResult<()> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        match self.fail_next.lock().await.take() {
            Some(message) => Err(PortError::Unexpected(message)),
            None => Ok(()),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn matches_all(filters: &[Filter], row: &Value) -> bool {
    filters.iter().all(|f| f.matches(row))
}

fn into_object(value: Value) -> PortResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(PortError::Unexpected("Row payload must be a JSON object".to_string())),
    }
}

#[async_trait]
impl TableGateway for MemoryTableGateway {
    async fn select(&self, table: Table, query: &Query) -> PortResult<Vec<Value>> {
        self.begin_call().await?;
        let data = self.data.lock().await;
        let mut rows: Vec<Value> = data
            .rows
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(&query.filters, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = &query.order {
            // Stable sort keeps insertion order among equal keys.
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> PortResult<Value> {
        self.begin_call().await?;
        let mut object = into_object(row)?;
        let mut data = self.data.lock().await;

        if !object.contains_key("id") {
            let id = if table == Table::EmployeeRequests {
                Value::String(Uuid::new_v4().to_string())
            } else {
                let next = data.next_ids.entry(table).or_insert(1);
                let id = *next;
                *next += 1;
                Value::from(id)
            };
            object.insert("id".to_string(), id);
        }
        let now = Value::String(Utc::now().to_rfc3339());
        object.entry("created_at").or_insert_with(|| now.clone());
        if matches!(table, Table::Employees | Table::Departments | Table::Projects) {
            object.entry("updated_at").or_insert(now);
        }

        let stored = Value::Object(object);
        data.rows.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> PortResult<Vec<Value>> {
        self.begin_call().await?;
        let patch = into_object(patch)?;
        let mut data = self.data.lock().await;
        let mut updated = Vec::new();
        for row in data.rows.entry(table).or_default().iter_mut() {
            if !matches_all(filters, row) {
                continue;
            }
            if let Value::Object(object) = row {
                for (key, value) in &patch {
                    object.insert(key.clone(), value.clone());
                }
                if object.contains_key("updated_at") && !patch.contains_key("updated_at") {
                    object.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> PortResult<()> {
        self.begin_call().await?;
        let mut data = self.data.lock().await;
        if let Some(rows) = data.rows.get_mut(&table) {
            rows.retain(|row| !matches_all(filters, row));
        }
        Ok(())
    }
}

//=========================================================================================
// Blob Storage
//=========================================================================================

pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Bytes>>,
    public_base: String,
}

impl MemoryBlobStore {
    pub fn new(public_base: &str) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        self.objects.lock().await.get(&format!("{}/{}", bucket, path)).cloned()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStore {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> PortResult<()> {
        let key = format!("{}/{}", bucket, path);
        let mut objects = self.objects.lock().await;
        if objects.contains_key(&key) {
            return Err(PortError::Storage("The resource already exists".to_string()));
        }
        objects.insert(key, data);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, path)
    }
}

//=========================================================================================
// Auth
//=========================================================================================

struct Account {
    password: String,
    user: User,
}

pub struct MemoryAuthGateway {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Session>>,
    events: ChangeFanout,
    initial_gate: Mutex<Option<oneshot::Receiver<()>>>,
    initial_failure: Mutex<Option<String>>,
}

impl Default for MemoryAuthGateway {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            events: ChangeFanout::default(),
            initial_gate: Mutex::new(None),
            initial_failure: Mutex::new(None),
        }
    }
}

impl MemoryAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a session for `email` valid for one hour.
    pub fn session_for(email: &str) -> Session {
        Session {
            access_token: Uuid::new_v4().to_string(),
            user: User {
                id: Uuid::new_v4(),
                email: email.to_string(),
            },
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    pub async fn add_account(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        self.accounts.lock().await.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Sets the session the initial query will restore.
    pub async fn restore_session(&self, session: Session) {
        *self.current.lock().await = Some(session);
    }

    /// Holds `get_current_session` back until the returned sender fires or is dropped.
    pub async fn hold_initial_session(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.initial_gate.lock().await = Some(gate);
        release
    }

    /// Makes the next `get_current_session` fail with `message`.
    pub async fn fail_initial_session(&self, message: &str) {
        *self.initial_failure.lock().await = Some(message.to_string());
    }

    /// Publishes a raw change event, bypassing sign-in/sign-out.
    pub fn emit(&self, change: AuthChange) {
        self.events.publish(change);
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl AuthGateway for MemoryAuthGateway {
    async fn get_current_session(&self) -> PortResult<Option<Session>> {
        let gate = self.initial_gate.lock().await.take();
        if let Some(gate) = gate {
            // A dropped sender releases the query as well.
            let _ = gate.await;
        }
        if let Some(message) = self.initial_failure.lock().await.take() {
            return Err(PortError::Unexpected(message));
        }
        Ok(self.current.lock().await.clone())
    }

    fn on_session_change(&self) -> AuthChangeStream {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Session> {
        let user = {
            let accounts = self.accounts.lock().await;
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(PortError::Unauthorized),
            }
        };
        let session = Session {
            user,
            ..Self::session_for(email)
        };
        *self.current.lock().await = Some(session.clone());
        self.events.publish(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _profile: &SignUpProfile,
    ) -> PortResult<User> {
        if self.accounts.lock().await.contains_key(email) {
            return Err(PortError::Unexpected("User already registered".to_string()));
        }
        let user = self.add_account(email, password).await;
        let session = Session {
            user: user.clone(),
            ..Self::session_for(email)
        };
        *self.current.lock().await = Some(session.clone());
        self.events.publish(AuthChange::signed_in(session));
        Ok(user)
    }

    async fn sign_out(&self) -> PortResult<()> {
        *self.current.lock().await = None;
        self.events.publish(AuthChange::signed_out());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_console_core::ports::Order;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_ids_and_timestamps() {
        let tables = MemoryTableGateway::new();
        let first = tables.insert(Table::Departments, json!({"name": "Ops"})).await.unwrap();
        let second = tables.insert(Table::Departments, json!({"name": "HR"})).await.unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert!(first["created_at"].is_string());
        assert!(first["updated_at"].is_string());
    }

    #[tokio::test]
    async fn select_filters_and_orders() {
        let tables = MemoryTableGateway::new();
        for (id, employee) in [(1, 5), (2, 6), (3, 5)] {
            tables
                .insert(Table::Documents, json!({"id": id, "employee_id": employee}))
                .await
                .unwrap();
        }
        let query = Query::new()
            .filter(Filter::eq("employee_id", 5))
            .order(Order::desc("id"));
        let rows = tables.select(Table::Documents, &query).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(1)]);
    }

    #[tokio::test]
    async fn injected_failure_hits_only_the_next_call() {
        let tables = MemoryTableGateway::new();
        tables.fail_next("network down").await;
        assert!(tables.select(Table::Projects, &Query::new()).await.is_err());
        assert!(tables.select(Table::Projects, &Query::new()).await.is_ok());
        assert_eq!(tables.call_count(), 2);
    }

    #[tokio::test]
    async fn sign_in_checks_the_password() {
        let auth = MemoryAuthGateway::new();
        auth.add_account("a@b.c", "secret").await;
        assert!(matches!(
            auth.sign_in("a@b.c", "wrong").await,
            Err(PortError::Unauthorized)
        ));
        let session = auth.sign_in("a@b.c", "secret").await.unwrap();
        assert_eq!(auth.current_session().await, Some(session));
    }
}
