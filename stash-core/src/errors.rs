//! # Errors
//!
//! Stash uses one structured error taxonomy across every backend.
//! Core goals:
//! - consistent kinds + status codes regardless of the active adapter
//! - can be carried through anyhow::Error (for the hook pipeline)
//! - backend-native failures never cross the repository boundary

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for Stash core APIs.
///
/// Structured errors travel inside `anyhow::Error` so they can flow
/// through the hook pipeline and be downcast back at the edge.
pub type StashResult<T> = std::result::Result<T, AnyError>;

/// Uniform error kinds with HTTP-ish status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    Conflict,         // 409
    PayloadTooLarge,  // 413
    Internal,         // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::Internal => 500,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::PayloadTooLarge => "PayloadTooLarge",
            ErrorKind::Internal => "Internal",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PayloadTooLarge => "payload-too-large",
            ErrorKind::Internal => "internal",
        }
    }
}

/// A structured Stash error that can live inside `anyhow::Error`.
///
/// Fields:
/// - kind (taxonomy + status code)
/// - message
/// - data (optional structured metadata, e.g. the offending id)
/// - source (optional wrapped cause, for diagnostics only)
#[derive(Debug)]
pub struct StashError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub source: Option<AnyError>,
}

impl StashError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error` so it flows through the hook pipeline.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `StashError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&StashError> {
        err.downcast_ref::<StashError>()
    }

    /// Turn any error into a StashError:
    /// - if it's already a StashError, keep it (lossless)
    /// - otherwise wrap as Internal, preserving the cause
    pub fn normalize(err: AnyError) -> StashError {
        match err.downcast::<StashError>() {
            Ok(stash) => stash,
            Err(other) => {
                StashError::new(ErrorKind::Internal, other.to_string()).with_source(other)
            }
        }
    }

    /// A "safe" version suitable for returning to clients:
    /// - keep kind/message/code/data
    /// - drop the inner `source` (backend internals)
    pub fn sanitize_for_client(&self) -> StashError {
        StashError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl fmt::Display for StashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for StashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience helper for "bail with StashError".
#[macro_export]
macro_rules! bail_stash {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::StashError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::StashError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
