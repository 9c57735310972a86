use thiserror::Error;

/// Failure taxonomy shared by the index client, the embedders and the
/// retrieval engine. The engine logs these and degrades; it never returns them
/// from its public search operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Document index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// Short tag used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::EmbeddingUnavailable(_) => "embedding_unavailable",
            Error::Query(_) => "query_error",
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidRecord(_) => "invalid_record",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
