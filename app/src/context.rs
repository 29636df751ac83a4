//! Execution context handed to filters and actions.

use std::any::Any;

/// Per-invocation context: the original argument list, the resolved command
/// path, and an opaque caller-supplied carrier.
///
/// The argument list is the one passed to [`App::exec`](crate::App::exec),
/// unmodified; a handler that needs its own level's tail should bind flags
/// and positionals declaratively instead of re-walking the raw list.
pub struct Context {
    args: Vec<String>,
    path: Vec<String>,
    carrier: Option<Box<dyn Any + Send>>,
}

impl Context {
    pub(crate) fn new(
        args: Vec<String>,
        path: Vec<String>,
        carrier: Option<Box<dyn Any + Send>>,
    ) -> Self {
        Self {
            args,
            path,
            carrier,
        }
    }

    /// The original, unmodified argument list.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The resolved command path, application command name first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The command path joined with spaces.
    pub fn path_string(&self) -> String {
        self.path.join(" ")
    }

    /// The caller-supplied carrier, downcast to a concrete type. The core
    /// never inspects the carrier; it exists to thread deadlines, handles,
    /// or other caller state through to handlers.
    pub fn carrier<T: Any>(&self) -> Option<&T> {
        self.carrier.as_ref().and_then(|c| c.downcast_ref())
    }

    /// Mutable access to the caller-supplied carrier.
    pub fn carrier_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.carrier.as_mut().and_then(|c| c.downcast_mut())
    }
}
