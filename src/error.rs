//! Error taxonomy shared by every service.
//!
//! DESIGN
//! ======
//! Each service owns its own `thiserror` enum. All of them implement
//! `ErrorCode`, which yields a grepable code and maps the error into one of
//! the `ErrorKind` buckets. The controller's dispatch layer decides how a
//! failure is surfaced purely from the kind, never from the concrete type.

use std::fmt;

/// Coarse classification of failures, used to pick a user-facing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input (short names, empty audio list). Non-blocking warning.
    Validation,
    /// The acting user may not use the soundboard. Blocks rendering.
    Authorization,
    /// Unknown size class, unknown creator. Callers degrade to a default.
    Configuration,
    /// Bad board index. Should never come from the UI.
    IndexOutOfRange,
    /// Settings store failure.
    Storage,
    /// Remote index failure.
    Network,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::Configuration => "configuration",
            Self::IndexOutOfRange => "index out of range",
            Self::Storage => "storage",
            Self::Network => "network",
        };
        f.write_str(label)
    }
}

/// Grepable error code, taxonomy bucket, and retryable flag.
pub trait ErrorCode: fmt::Display {
    fn error_code(&self) -> &'static str;

    fn kind(&self) -> ErrorKind;

    fn retryable(&self) -> bool {
        false
    }
}
