pub mod auth;
pub mod blob;
pub mod db;
pub mod local_storage;
pub mod memory;

pub use auth::PgAuthGateway;
pub use blob::FsBlobStore;
pub use db::PgTableGateway;
pub use local_storage::FileLocalStorage;
pub use memory::{MemoryAuthGateway, MemoryBlobStore, MemoryLocalStorage, MemoryTableGateway};
