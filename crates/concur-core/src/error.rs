//! Error taxonomy shared across the concurrency core.
//!
//! This module provides the error type every `concur-*` crate builds on:
//!
//! - Strongly-typed error kinds for each failure category the core raises
//! - Builder-style constructors for ergonomic error construction
//! - Type-safe error source tracking with boxed trait objects
//! - Integration with `thiserror` for automatic `Display` and `Error` impls

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Type alias for boxed errors that are `Send + Sync`.
///
/// Used throughout the core for error sources so that errors can cross
/// task boundaries (every task body may run on a different worker).
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for concurrency-core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration, mirroring the taxonomy in spec §7.
///
/// Kept separate from [`Error`] so callers can match on category without
/// inspecting the full error (e.g. to decide whether a failure is worth
/// retrying).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A constructor or builder received an out-of-range value
    /// (`Concurrency(0)`, negative `waitMillis`, a missing required field).
    InvalidArgument,
    /// A task or submission was rejected because the owning pool is shut down.
    Shutdown,
    /// An operation observed a cancellation (`Future::cancel`, driver cleanup).
    Cancelled,
    /// A [`crate::TerminationFlag`] fired.
    Terminated,
    /// A bounded operation exhausted its retry/wait budget.
    Timeout,
    /// A task body returned an error.
    TaskFailure,
    /// A worker died while running a task.
    WorkerCrash,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorisation in logs/metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Shutdown => "shutdown",
            Self::Cancelled => "cancelled",
            Self::Terminated => "terminated",
            Self::Timeout => "timeout",
            Self::TaskFailure => "task_failure",
            Self::WorkerCrash => "worker_crash",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concurrency-core error with structured information: a [`ErrorKind`]
/// for categorisation, a human-readable message, and an optional source
/// error for chaining.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new [`Error`] of the given kind.
    #[inline]
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches a source error, enabling error-chain tracking.
    ///
    /// Consumes and returns `self` for builder-style chaining.
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates an [`ErrorKind::InvalidArgument`] error.
    #[inline]
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates an [`ErrorKind::Shutdown`] error.
    #[inline]
    pub fn shutdown(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Shutdown, message)
    }

    /// Creates an [`ErrorKind::Cancelled`] error.
    #[inline]
    pub fn cancelled(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Creates an [`ErrorKind::Terminated`] error, optionally wrapping a cause.
    #[inline]
    pub fn terminated(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Terminated, message)
    }

    /// Creates an [`ErrorKind::Timeout`] error with the retry-count context
    /// described in spec §7 (`"Attempted to submit tasks N times with a
    /// Wms delay"`).
    #[inline]
    pub fn timeout_with_retries(attempts: u64, wait_millis: u64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("Attempted to submit tasks {attempts} times with a {wait_millis}ms delay"),
        )
    }

    /// Creates an [`ErrorKind::TaskFailure`] error.
    #[inline]
    pub fn task_failure(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::TaskFailure, message)
    }

    /// Creates an [`ErrorKind::WorkerCrash`] error.
    #[inline]
    pub fn worker_crash(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::WorkerCrash, message)
    }

    /// Composes several task-failure causes into one surfaced error, as
    /// described for the bounded-concurrency driver's error chaining in
    /// spec §4.4 / §7: the message lists each cause in order and none are
    /// silently dropped.
    #[must_use]
    pub fn chain(causes: Vec<Error>) -> Self {
        debug_assert!(!causes.is_empty(), "chain() called with no causes");
        let message = causes
            .iter()
            .enumerate()
            .map(|(i, cause)| format!("[{i}] {cause}"))
            .collect::<Vec<_>>()
            .join("; ");
        let mut chained = Self::new(ErrorKind::TaskFailure, message);
        if let Some(first) = causes.into_iter().next() {
            chained.source = Some(Box::new(first));
        }
        chained
    }
}
