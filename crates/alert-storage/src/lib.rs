pub mod api;
pub mod error;
pub mod store;
pub mod store_db;

pub use api::{DocumentStore, KeyValueStore};
pub use error::StoreError;
pub use store::{EngineType, RemoteStoreConfig, Stores};
pub use store_db::in_memory::{InMemoryDocumentStore, InMemoryKeyValueStore};
