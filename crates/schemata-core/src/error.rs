use thiserror::Error;

/// Core error type shared across the schemata crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Driver or connection failure.
    #[error("database error: {0}")]
    Db(String),
    /// A statement could not be prepared or executed.
    #[error("query failed: {message} (query: {query})")]
    Query { query: String, message: String },
    /// The object graph violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// Options could not be parsed or loaded.
    #[error("configuration error: {0}")]
    Config(String),
    /// A requested feature is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

impl Error {
    /// Wrap a driver message together with the statement that produced it.
    pub fn query(query: impl Into<String>, message: impl ToString) -> Self {
        Error::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias for results returned by the schemata crates.
pub type Result<T> = std::result::Result<T, Error>;
