//! services/console/src/state.rs
//!
//! Defines the console's shared state: the gateways, the notification center,
//! the toast board and one store per entity table.

use crate::adapters::{
    FileLocalStorage, FsBlobStore, MemoryAuthGateway, MemoryBlobStore, MemoryTableGateway,
    PgAuthGateway, PgTableGateway,
};
use crate::config::Config;
use crate::error::ConsoleError;
use crate::forms::AuthForms;
use crate::notifications::NotificationCenter;
use crate::session::{SessionManager, SessionManagerHandle, ToastBoard};
use crate::stores::{DepartmentStore, DocumentStore, EmployeeStore, ProjectStore, RequestStore};
use hr_console_core::domain::Visibility;
use hr_console_core::ports::{AuthGateway, BlobStorage, LocalStorage, TableGateway};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::info;

/// The shared console state, created once at startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<dyn AuthGateway>,
    pub tables: Arc<dyn TableGateway>,
    pub blobs: Arc<dyn BlobStorage>,
    pub storage: Arc<dyn LocalStorage>,
    pub notifications: Arc<Mutex<NotificationCenter>>,
    pub toasts: ToastBoard,
    pub forms: AuthForms,
    pub employees: Mutex<EmployeeStore>,
    pub departments: Mutex<DepartmentStore>,
    pub projects: Mutex<ProjectStore>,
    pub documents: Mutex<DocumentStore>,
    pub requests: Mutex<RequestStore>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        auth: Arc<dyn AuthGateway>,
        tables: Arc<dyn TableGateway>,
        blobs: Arc<dyn BlobStorage>,
        storage: Arc<dyn LocalStorage>,
    ) -> Self {
        let toasts = ToastBoard::new();
        Self {
            notifications: Arc::new(Mutex::new(NotificationCenter::new(storage.clone()))),
            forms: AuthForms::new(auth.clone(), tables.clone(), toasts.clone()),
            employees: Mutex::new(EmployeeStore::new(tables.clone())),
            departments: Mutex::new(DepartmentStore::new(tables.clone())),
            projects: Mutex::new(ProjectStore::new(tables.clone())),
            documents: Mutex::new(DocumentStore::new(tables.clone())),
            requests: Mutex::new(RequestStore::new(tables.clone())),
            config,
            auth,
            tables,
            blobs,
            storage,
            toasts,
        }
    }

    /// Wires Postgres-backed gateways when a database is configured and
    /// in-memory ones otherwise. Local storage is always the configured file.
    pub async fn from_config(config: Arc<Config>) -> Result<Self, ConsoleError> {
        let storage: Arc<dyn LocalStorage> =
            Arc::new(FileLocalStorage::new(config.local_storage_path.clone()));

        let Some(database_url) = config.database_url.clone() else {
            info!(
                path = %config.local_storage_path.display(),
                "No DATABASE_URL set, running on in-memory gateways"
            );
            return Ok(Self::new(
                config.clone(),
                Arc::new(MemoryAuthGateway::new()),
                Arc::new(MemoryTableGateway::new()),
                Arc::new(MemoryBlobStore::new(&config.public_url_base)),
                storage,
            ));
        };

        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&database_url)
            .await?;
        let tables = PgTableGateway::new(pool.clone());
        info!("Running database migrations...");
        tables.run_migrations().await?;
        info!("Database migrations complete.");

        let auth = PgAuthGateway::new(pool, storage.clone());
        let blobs = FsBlobStore::new(config.blob_root.clone(), &config.public_url_base);

        Ok(Self::new(
            config,
            Arc::new(auth),
            Arc::new(tables),
            Arc::new(blobs),
            storage,
        ))
    }

    /// Starts the session manager for this console.
    pub fn start_session(&self, visibility: watch::Receiver<Visibility>) -> SessionManagerHandle {
        SessionManager::start(
            self.auth.clone(),
            visibility,
            self.notifications.clone(),
            self.toasts.clone(),
        )
    }
}
