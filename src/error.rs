use thiserror::Error;

/// Error type for the whole driver shim.
///
/// Errors are never thrown synchronously out of a public `Database` method;
/// they cross the callback boundary exactly once, as the error argument of
/// the deferred callback.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Raised by the engine adapter when `all`/`get` is invoked on a
    /// statement whose SQL produces no result set. Absorbed by the
    /// dispatcher's run-fallback and never surfaced to callers.
    #[error("statement does not return rows; use the write path")]
    StatementReturnsNoRows,

    #[error("database handle is closed")]
    DatabaseClosed,

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("parameter error: {0}")]
    ParameterError(String),

    #[error("misuse: {0}")]
    Misuse(String),
}
