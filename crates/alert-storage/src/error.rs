use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to lock the store")]
    Lock,
}
