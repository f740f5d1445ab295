use thiserror::Error;

/// Errors raised while loading or checking a schema snapshot.
#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A requested feature is not yet supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, Error>;
