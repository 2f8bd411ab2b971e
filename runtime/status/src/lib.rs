//! Status codes - Uniform failure reporting for Kestrel
//!
//! # Purpose
//! Every Kestrel operation reports its outcome as a [`StatusCode`]: zero for
//! success, a handful of reserved negative values for conditions detected by
//! Kestrel itself, and the raw platform `errno` value for everything the OS
//! reports.
//!
//! # Integration Points
//! - Depends on: libc (errno values)
//! - Provides to: kestrel-sys (errno translation), kestrel-file (every operation)
//!
//! # Architecture
//! `StatusCode` is an open enumeration: a transparent `i32` newtype with an
//! associated constant per known code. Values Kestrel has no name for are
//! still representable, which keeps [`errno_to_status`] total.
//!
//! # Testing Strategy
//! - Unit tests: translation identity, rendering of reserved, errno and unknown codes

use core::fmt;

use static_assertions::assert_eq_size;
use thiserror::Error;

mod codes;

/// Description rendered for values with no known name.
pub const UNKNOWN_STATUS: &str = "unknown status code";

/// Outcome of a Kestrel operation
///
/// The zero value always means success. Negative values are reserved for
/// Kestrel; positive values are platform `errno` numbers.
#[must_use = "a status reports whether the operation failed"]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Error)]
#[error("[StatusCode {}]", describe_ref(.0))]
#[repr(transparent)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct StatusCode(i32);

assert_eq_size!(StatusCode, i32);

impl StatusCode {
    /// No error
    pub const OK: StatusCode = StatusCode(0);

    /// File is already open
    pub const ALREADY_OPEN: StatusCode = StatusCode(-1);

    /// File is not open
    pub const NOT_OPEN: StatusCode = StatusCode(-2);

    /// Invalid argument
    pub const INVALID_ARGUMENT: StatusCode = StatusCode(-3);

    /// Build a status from its raw numeric value
    pub const fn from_raw(raw: i32) -> Self {
        StatusCode(raw)
    }

    /// Raw numeric value (the errno number for OS errors)
    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    pub const fn is_err(self) -> bool {
        self.0 != 0
    }

    /// Human-readable description of this status
    pub fn as_str(self) -> &'static str {
        describe(self.0)
    }

    /// Symbolic name (`"EBADF"`, `"OK"`, ...) if the value is known
    pub fn name(self) -> Option<&'static str> {
        match self {
            StatusCode::OK => Some("OK"),
            StatusCode::ALREADY_OPEN => Some("ALREADY_OPEN"),
            StatusCode::NOT_OPEN => Some("NOT_OPEN"),
            StatusCode::INVALID_ARGUMENT => Some("INVALID_ARGUMENT"),
            _ => codes::lookup_errno(self.0).map(|(name, _)| name),
        }
    }

    /// Convert to a `Result`, mapping [`StatusCode::OK`] to `Ok(())`
    ///
    /// # Example
    /// ```
    /// use kestrel_status::StatusCode;
    ///
    /// assert!(StatusCode::OK.into_result().is_ok());
    /// assert_eq!(StatusCode::EBADF.into_result(), Err(StatusCode::EBADF));
    /// ```
    pub fn into_result(self) -> Result<(), StatusCode> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::OK
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "StatusCode({})", name),
            None => write!(f, "StatusCode({})", self.0),
        }
    }
}

impl From<StatusCode> for i32 {
    fn from(status: StatusCode) -> i32 {
        status.0
    }
}

impl From<StatusCode> for std::io::Error {
    fn from(status: StatusCode) -> std::io::Error {
        use std::io::{Error, ErrorKind};

        match status {
            StatusCode::ALREADY_OPEN => Error::new(ErrorKind::AlreadyExists, status),
            StatusCode::NOT_OPEN => Error::new(ErrorKind::NotConnected, status),
            StatusCode::INVALID_ARGUMENT => Error::new(ErrorKind::InvalidInput, status),
            _ => Error::from_raw_os_error(status.0),
        }
    }
}

impl From<&std::io::Error> for StatusCode {
    fn from(err: &std::io::Error) -> StatusCode {
        if let Some(raw) = err.raw_os_error() {
            return StatusCode(raw);
        }
        err.get_ref()
            .and_then(|inner| inner.downcast_ref::<StatusCode>())
            .copied()
            .unwrap_or(StatusCode::INVALID_ARGUMENT)
    }
}

/// Translate a raw `errno` value into a [`StatusCode`]
///
/// This is an identity-preserving cast and never fails.
pub const fn errno_to_status(raw_errno: i32) -> StatusCode {
    StatusCode(raw_errno)
}

/// Render a status as a fixed human-readable string
///
/// Unknown values render as [`UNKNOWN_STATUS`].
pub fn status_to_string(code: StatusCode) -> &'static str {
    describe(code.0)
}

fn describe_ref(raw: &i32) -> &'static str {
    describe(*raw)
}

fn describe(raw: i32) -> &'static str {
    match raw {
        0 => "No error",
        -1 => "File is already open",
        -2 => "File is not open",
        -3 => "Invalid argument",
        _ => codes::lookup_errno(raw)
            .map(|(_, desc)| desc)
            .unwrap_or(UNKNOWN_STATUS),
    }
}
