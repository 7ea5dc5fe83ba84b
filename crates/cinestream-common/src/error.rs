//! Unified error type for cinestream.
//!
//! Storage, session and HTTP layers all funnel their failures into [`Error`],
//! which carries enough context for handlers to derive an HTTP status code
//! via [`Error::http_status`] and a stable machine code via [`Error::code`].

use std::fmt;

/// Common error type for cinestream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "movie", "user").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller lacks permission for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request data failed validation (missing header, malformed body).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested byte range cannot be served for a file of `size` bytes.
    #[error("Range not satisfiable: {range} (size {size})")]
    RangeNotSatisfiable {
        /// The raw `Range` header value.
        range: String,
        /// Size of the resource in bytes.
        size: u64,
    },

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A storage (file system) operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The session layer failed to load, save or destroy session state.
    #[error("Session error: {0}")]
    Session(String),

    /// An upstream HTTP service returned an error.
    #[error("Upstream error [{service}]: {message}")]
    Upstream {
        /// Name of the upstream service.
        service: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound { .. } => 404,
            Error::Conflict(_) => 409,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::Database(_) => 500,
            Error::Io { .. } => 500,
            Error::Session(_) => 500,
            Error::Upstream { .. } => 502,
            Error::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound { .. } => "not_found",
            Error::Conflict(_) => "conflict",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::Database(_) => "database_error",
            Error::Io { .. } => "io_error",
            Error::Session(_) => "session_error",
            Error::Upstream { .. } => "upstream_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(msg: impl fmt::Display) -> Self {
        Error::Database(msg.to_string())
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Convenience constructor for [`Error::Session`].
    pub fn session(msg: impl fmt::Display) -> Self {
        Error::Session(msg.to_string())
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Upstream {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::RangeNotSatisfiable`].
    pub fn range_not_satisfiable(range: impl Into<String>, size: u64) -> Self {
        Error::RangeNotSatisfiable {
            range: range.into(),
            size,
        }
    }

    /// Whether this error maps to a 5xx response.
    pub fn is_server_error(&self) -> bool {
        self.http_status() >= 500
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
