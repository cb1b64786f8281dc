//! Error types for the ADE rooms engine
//!
//! One error enum per component, mirroring the error taxonomy of the design:
//! session negotiation failures abort a pass, fetch errors split into
//! transient (retried) and permanent (never retried), and nothing below the
//! session level is allowed to abort a whole refresh pass.

use std::path::PathBuf;
use thiserror::Error;

/// Session negotiation errors: a failure here aborts the current pass
#[derive(Error, Debug)]
pub enum SessionError {
    /// Remote host unreachable or request-level failure
    #[error("timetable platform unreachable")]
    Http(#[from] reqwest::Error),

    /// The landing page did not mint a session cookie
    #[error("no session cookie in landing page response")]
    CookieMissing,

    /// A handshake step returned a non-success status
    #[error("handshake step '{step}' failed with HTTP {status}")]
    HandshakeFailed { step: &'static str, status: u16 },

    /// Rate limiter construction failed (zero rate configured)
    #[error("invalid rate limit: {reason}")]
    InvalidRateLimit { reason: String },
}

/// Per-room timetable fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network error or 5xx: retryable with backoff
    #[error("transient fetch failure for room {room_id}: {reason}")]
    Transient { room_id: String, reason: String },

    /// 4xx or resource gone: never retried
    #[error("permanent fetch failure for room {room_id}: HTTP {status}")]
    Permanent { room_id: String, status: u16 },

    /// Retry budget exhausted on transient failures
    #[error("retry budget ({max_retries}) exhausted for room {room_id}")]
    RetriesExhausted { room_id: String, max_retries: u32 },
}

impl FetchError {
    /// Whether this error may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}

/// Catalog enumeration errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request failed for a category listing
    #[error("catalog request failed for category '{category}'")]
    Http {
        category: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Category listing returned a non-success status
    #[error("catalog request for category '{category}' returned HTTP {status}")]
    Status { category: &'static str, status: u16 },
}

/// Mirrored summary endpoint errors: always recoverable via the scrape path
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Mirror unreachable
    #[error("mirror endpoint unreachable")]
    Http(#[from] reqwest::Error),

    /// Mirror returned a non-success status
    #[error("mirror endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// Mirror payload did not parse as a room-status map
    #[error("mirror payload invalid: {reason}")]
    InvalidPayload { reason: String },

    /// Mirror answered with an empty room map
    #[error("mirror payload contained no rooms")]
    Empty,
}

/// Cache and persistence errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// A refresh pass failed before publishing anything
    #[error("refresh pass failed: {0}")]
    RefreshFailed(#[from] SessionError),

    /// Snapshot state file I/O failure
    #[error("snapshot state file error: {path}")]
    StateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot (de)serialization failure
    #[error("snapshot serialization error")]
    Serialization(#[from] serde_json::Error),

    /// No cache directory could be determined for persistence
    #[error("no cache directory available for snapshot persistence")]
    NoStateDir,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("configuration file not readable: {path}")]
    NotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Fetch(e) => e.is_transient(),
            AppError::Session(SessionError::Http(_)) => true,
            AppError::Mirror(_) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Session(_) => "session",
            AppError::Fetch(_) => "fetch",
            AppError::Catalog(_) => "catalog",
            AppError::Mirror(_) => "mirror",
            AppError::Cache(_) => "cache",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Component result aliases
pub type SessionResult<T> = std::result::Result<T, SessionError>;
pub type FetchResult<T> = std::result::Result<T, FetchError>;
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
pub type MirrorResult<T> = std::result::Result<T, MirrorError>;
pub type CacheResult<T> = std::result::Result<T, CacheError>;
