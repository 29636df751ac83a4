//! Typed value adapters for flag and positional storage.
//!
//! Each adapter wraps one primitive type and knows how to parse argument
//! text into it and render it back to canonical text (used for default-value
//! display). Adapters never range-validate beyond what the underlying
//! numeric parse enforces.
//!
//! Storage is interior-mutable: a [`Slot`] is the handle returned by direct
//! registration on a [`FlagSet`](crate::FlagSet), readable after parsing.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use cmdtree_flags::FlagValue;
//!
//! let d = Duration::parse_text("1h30m").unwrap();
//! assert_eq!(d, Duration::from_secs(5400));
//! // render∘parse_text round-trips
//! assert_eq!(Duration::parse_text(&d.render()).unwrap(), d);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::ValueError;

/// A primitive type usable as flag or positional storage.
///
/// Implemented for `bool`, `i32`, `i64`, `u32`, `u64`, `f64`, `String`, and
/// [`Duration`]. `bool` self-identifies as a switch: `-name` alone is
/// equivalent to `-name=true` rather than consuming the next token.
pub trait FlagValue: 'static {
    /// Parses argument text, failing with a type-specific error.
    fn parse_text(text: &str) -> Result<Self, ValueError>
    where
        Self: Sized;

    /// Renders the current value as canonical text. Total for every value,
    /// including the zero value.
    fn render(&self) -> String;

    /// Whether `-name` without a value is valid for this type.
    fn is_switch() -> bool {
        false
    }
}

impl FlagValue for bool {
    fn parse_text(text: &str) -> Result<Self, ValueError> {
        match text {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            other => Err(ValueError::Bool(other.to_string())),
        }
    }

    fn render(&self) -> String {
        self.to_string()
    }

    fn is_switch() -> bool {
        true
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {$(
        impl FlagValue for $ty {
            fn parse_text(text: &str) -> Result<Self, ValueError> {
                Ok(text.parse::<$ty>()?)
            }

            fn render(&self) -> String {
                self.to_string()
            }
        }
    )*};
}

int_value!(i32, i64, u32, u64);

impl FlagValue for f64 {
    fn parse_text(text: &str) -> Result<Self, ValueError> {
        Ok(text.parse::<f64>()?)
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl FlagValue for String {
    fn parse_text(text: &str) -> Result<Self, ValueError> {
        Ok(text.to_string())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

impl FlagValue for Duration {
    fn parse_text(text: &str) -> Result<Self, ValueError> {
        Ok(humantime::parse_duration(text)?)
    }

    fn render(&self) -> String {
        humantime::format_duration(*self).to_string()
    }
}

/// Type-erased storage cell. Interior-mutable so a shared handle can keep
/// reading the cell after the parse populated it.
pub(crate) trait Cell {
    fn set_text(&self, text: &str) -> Result<(), ValueError>;
    fn render(&self) -> String;
    fn is_switch(&self) -> bool;
}

/// Handle to a directly registered flag or positional value.
///
/// The Rust rendition of a returned pointer: registration hands one out,
/// the flag set keeps an aliased clone, and the caller reads the bound
/// value after parsing.
///
/// # Examples
///
/// ```
/// use cmdtree_flags::{ErrorHandling, FlagSet};
///
/// let mut set = FlagSet::new("demo", ErrorHandling::Continue);
/// let port = set.define("port", 8080u32, "listen port");
/// set.parse(&["-port".into(), "9090".into()]).unwrap();
/// assert_eq!(port.get(), 9090);
/// ```
pub struct Slot<V> {
    inner: Rc<RefCell<V>>,
}

impl<V> Clone for Slot<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: FlagValue> Slot<V> {
    pub(crate) fn new(value: V) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> V
    where
        V: Clone,
    {
        self.inner.borrow().clone()
    }

    /// Overwrites the current value.
    pub fn set(&self, value: V) {
        *self.inner.borrow_mut() = value;
    }
}

impl<V: FlagValue> Cell for Slot<V> {
    fn set_text(&self, text: &str) -> Result<(), ValueError> {
        *self.inner.borrow_mut() = V::parse_text(text)?;
        Ok(())
    }

    fn render(&self) -> String {
        self.inner.borrow().render()
    }

    fn is_switch(&self) -> bool {
        V::is_switch()
    }
}
