//! Error types for value conversion and argument parsing.
//!
//! Two tiers exist in this crate: configuration faults (duplicate flag or
//! positional registration, malformed flag names) panic at registration time
//! and never surface as values; everything that can go wrong while scanning
//! an argument list is a [`ParseError`].

use thiserror::Error;

/// Errors produced by a typed value adapter rejecting its input text.
#[derive(Debug, Error)]
pub enum ValueError {
    /// Integer parse failure.
    #[error(transparent)]
    Int(#[from] std::num::ParseIntError),

    /// Float parse failure.
    #[error(transparent)]
    Float(#[from] std::num::ParseFloatError),

    /// Text was not a recognized boolean form.
    #[error("invalid boolean value: {0:?}")]
    Bool(String),

    /// Text did not match the human-readable duration grammar.
    #[error(transparent)]
    Duration(#[from] humantime::DurationError),
}

/// Errors produced while parsing an argument list.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Token started with `-` but carried no usable name (e.g. `---x`, `-=v`).
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),

    /// A named flag was provided that no formal entry matches (strict mode).
    #[error("flag provided but not defined: -{0}")]
    Undefined(String),

    /// A non-switch flag appeared without a value.
    #[error("flag needs an argument: -{0}")]
    MissingValue(String),

    /// A named flag's value failed its typed conversion.
    #[error("invalid value {value:?} for flag -{name}: {source}")]
    InvalidFlag {
        /// Flag name without dashes.
        name: String,
        /// Offending value text.
        value: String,
        /// Underlying adapter error.
        source: ValueError,
    },

    /// A positional token's value failed its typed conversion.
    #[error("invalid value {value:?} for positional {index}: {source}")]
    InvalidPositional {
        /// Zero-based positional index.
        index: usize,
        /// Offending value text.
        value: String,
        /// Underlying adapter error.
        source: ValueError,
    },

    /// A terminator interrupted the positional walk in strict mode.
    #[error("positional {0} declared but no value supplied before terminator")]
    TerminatorBeforeValue(usize),

    /// `-h`/`-help` was provided without being defined; usage has already
    /// been written to the output sink.
    #[error("help requested")]
    Help,
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
