use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },

    /// The text-generation boundary failed; fatal to the enclosing operation.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// A caller-supplied parameter was rejected.
    #[error("Validation failed: {field} - {reason}")]
    Validation {
        /// The offending parameter.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An operation referenced an assumption id that was never recorded.
    #[error("Assumption not found: {assumption_id}")]
    AssumptionNotFound {
        /// The unknown id.
        assumption_id: String,
    },

    /// A recorded assumption named a dependency that does not exist.
    #[error("Unknown dependency {dependency_id} for assumption {assumption_id}")]
    UnknownDependency {
        /// The assumption being recorded.
        assumption_id: String,
        /// The missing dependency id.
        dependency_id: String,
    },

    /// Unexpected internal failure (e.g. a panicked task).
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

/// Errors from the text-generation boundary.
///
/// Any of these is fatal to the enclosing reasoning operation and propagates
/// to the caller unchanged; the core never retries. Malformed but successful
/// responses are NOT errors - they degrade to empty/default records at the
/// parsing layer.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The service could not be reached.
    #[error("Generation service unavailable: {message}")]
    Unavailable {
        /// Provider-reported detail.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP-style status code.
        status: u16,
        /// Provider-reported detail.
        message: String,
    },

    /// The request exceeded the provider's deadline.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for text-generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;
