use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document not found: {path}")]
    NotFound { path: String },

    #[error("Write rejected: {message}")]
    WriteRejected { message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
