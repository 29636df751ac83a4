//! Status values: the result currency of command execution.
//!
//! Every dispatch ends in a [`Status`]. Code zero means success; the
//! well-known nonzero codes below classify routing and binding failures.
//! Handlers normally return `Result<(), Status>`, but a handler that panics
//! is also converted: [`App::exec`](crate::App::exec) catches the unwind and
//! recovers a panicked `Status` payload intact.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic;

/// Arguments were structurally unusable.
pub const STATUS_BAD_ARGS: i32 = 1;
/// No command action matched the argument list.
pub const STATUS_NOT_FOUND: i32 = 2;
/// A flag set failed to parse a level's argument list.
pub const STATUS_PARSE_FAILED: i32 = 3;
/// A bound option struct was rejected by the validator.
pub const STATUS_VALIDATE_FAILED: i32 = 4;
/// A handler panicked with something other than a `Status`.
pub const STATUS_UNKNOWN: i32 = -1;

/// A handling status with code, message, and optional cause.
///
/// # Examples
///
/// ```
/// use cmdtree::{Status, STATUS_NOT_FOUND};
///
/// let stat = Status::new(STATUS_NOT_FOUND, "no such command");
/// assert!(!stat.is_ok());
/// assert_eq!(stat.code(), STATUS_NOT_FOUND);
///
/// assert!(Status::ok().is_ok());
/// ```
#[derive(Debug)]
pub struct Status {
    code: i32,
    msg: String,
    cause: Option<Box<dyn Error + Send + Sync>>,
}

impl Status {
    /// Creates a status with the given code and message.
    pub fn new(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            cause: None,
        }
    }

    /// The success status: code zero, no message.
    pub fn ok() -> Self {
        Self::new(0, "")
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Whether the code is zero.
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// The status code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The status message.
    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// The underlying cause, if any.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Panics with this status as the payload. The dispatcher recovers it
    /// unchanged, so deeply nested handler code can bail out without
    /// threading a `Result` through every call.
    pub fn throw(self) -> ! {
        panic::panic_any(self)
    }

    /// Converts a caught panic payload. A thrown `Status` passes through
    /// intact; a plain panic message becomes a [`STATUS_UNKNOWN`] status.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<Status>() {
            Ok(stat) => *stat,
            Err(payload) => match payload.downcast::<String>() {
                Ok(msg) => Status::new(STATUS_UNKNOWN, *msg),
                Err(payload) => match payload.downcast::<&'static str>() {
                    Ok(msg) => Status::new(STATUS_UNKNOWN, *msg),
                    Err(_) => Status::new(STATUS_UNKNOWN, "panic during command execution"),
                },
            },
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "OK");
        }
        write!(f, "status {}", self.code)?;
        if !self.msg.is_empty() {
            write!(f, ": {}", self.msg)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " (cause: {cause})")?;
        }
        Ok(())
    }
}

impl Error for Status {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn Error + 'static))
    }
}
