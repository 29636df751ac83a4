//! Declarative option binder: register a whole option struct at once.
//!
//! An option struct implements [`OptionSet`] and lists its fields inside
//! `declare`. Binding installs one flag or positional entry per declared
//! field, backed by a single shared instance of the struct; after parsing,
//! [`OptionsHandle::take`] yields the populated struct.
//!
//! Only top-level fields participate. Nested structs, if any, are opaque to
//! the binder.
//!
//! # Examples
//!
//! ```
//! use cmdtree_flags::{Binder, ErrorHandling, FlagSet, OptionSet};
//!
//! #[derive(Default)]
//! struct CopyOptions {
//!     verbose: bool,
//!     depth: i64,
//!     source: String,
//! }
//!
//! impl OptionSet for CopyOptions {
//!     fn declare(b: &mut Binder<Self>) {
//!         b.named("v", "verbose output", |o| &mut o.verbose);
//!         b.named("depth", "recursion depth", |o| &mut o.depth);
//!         b.positional(0, "source path", |o| &mut o.source);
//!     }
//! }
//!
//! let mut set = FlagSet::new("copy", ErrorHandling::Continue);
//! let handle = set.bind_options::<CopyOptions>();
//! let args: Vec<String> = ["-v", "-depth", "3", "in.txt"]
//!     .iter().map(|s| s.to_string()).collect();
//! set.parse(&args).unwrap();
//!
//! let opts = handle.take();
//! assert!(opts.verbose);
//! assert_eq!(opts.depth, 3);
//! assert_eq!(opts.source, "in.txt");
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ValueError;
use crate::set::FlagSet;
use crate::value::{Cell, FlagValue};

/// An option struct whose fields can be declared as flags and positionals.
///
/// `Default` supplies both the initial instance the parse writes into and
/// the per-field default values shown in usage text.
pub trait OptionSet: Default + 'static {
    /// Declares each participating field on the binder.
    fn declare(b: &mut Binder<Self>);
}

/// Collects field declarations for one [`OptionSet`] against one flag set.
pub struct Binder<'a, T> {
    target: Rc<RefCell<T>>,
    set: &'a mut FlagSet,
}

/// Writes a declared field of the shared option struct.
struct FieldCell<T, V> {
    target: Rc<RefCell<T>>,
    access: fn(&mut T) -> &mut V,
}

impl<T: 'static, V: FlagValue> Cell for FieldCell<T, V> {
    fn set_text(&self, text: &str) -> Result<(), ValueError> {
        let value = V::parse_text(text)?;
        *(self.access)(&mut self.target.borrow_mut()) = value;
        Ok(())
    }

    fn render(&self) -> String {
        (self.access)(&mut self.target.borrow_mut()).render()
    }

    fn is_switch(&self) -> bool {
        V::is_switch()
    }
}

impl<T: OptionSet> Binder<'_, T> {
    /// Declares a named flag backed by the accessed field. The field's
    /// `Default` value becomes the displayed default.
    ///
    /// # Panics
    ///
    /// Panics on an invalid or duplicate flag name, exactly like
    /// [`FlagSet::define`].
    pub fn named<V: FlagValue>(&mut self, name: &str, usage: &str, access: fn(&mut T) -> &mut V) {
        let cell = FieldCell {
            target: Rc::clone(&self.target),
            access,
        };
        self.set.define_cell(name, usage, Box::new(cell));
    }

    /// Declares a positional entry backed by the accessed field.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate index, exactly like
    /// [`FlagSet::define_positional`].
    pub fn positional<V: FlagValue>(
        &mut self,
        index: usize,
        usage: &str,
        access: fn(&mut T) -> &mut V,
    ) {
        let cell = FieldCell {
            target: Rc::clone(&self.target),
            access,
        };
        self.set.define_positional_cell(index, usage, Box::new(cell));
    }
}

/// Handle to the shared option struct populated by the parse.
pub struct OptionsHandle<T> {
    target: Rc<RefCell<T>>,
}

impl<T: OptionSet> OptionsHandle<T> {
    /// Takes the populated struct out, leaving a fresh default in place.
    pub fn take(&self) -> T {
        self.target.replace(T::default())
    }
}

impl FlagSet {
    /// Registers every field declared by `T` on this set and returns the
    /// handle that yields the populated struct after parsing.
    ///
    /// # Panics
    ///
    /// Panics if any declared name or index collides with an existing
    /// registration.
    pub fn bind_options<T: OptionSet>(&mut self) -> OptionsHandle<T> {
        let target = Rc::new(RefCell::new(T::default()));
        let mut binder = Binder {
            target: Rc::clone(&target),
            set: self,
        };
        T::declare(&mut binder);
        OptionsHandle { target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::ErrorHandling;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct GrepOptions {
        invert: bool,
        count: i64,
        pattern: String,
        file: String,
    }

    impl OptionSet for GrepOptions {
        fn declare(b: &mut Binder<Self>) {
            b.named("v", "invert the match", |o| &mut o.invert);
            b.named("m", "stop after this many matches", |o| &mut o.count);
            b.positional(0, "pattern", |o| &mut o.pattern);
            b.positional(1, "input file", |o| &mut o.file);
        }
    }

    #[test]
    fn test_bound_struct_fields_populate() {
        let mut set = FlagSet::new("grep", ErrorHandling::Continue);
        let handle = set.bind_options::<GrepOptions>();
        set.parse(&args(&["-v", "-m", "5", "needle", "hay.txt"]))
            .unwrap();
        let opts = handle.take();
        assert!(opts.invert);
        assert_eq!(opts.count, 5);
        assert_eq!(opts.pattern, "needle");
        assert_eq!(opts.file, "hay.txt");
    }

    #[test]
    fn test_unparsed_fields_keep_defaults() {
        let mut set = FlagSet::new("grep", ErrorHandling::Continue);
        let handle = set.bind_options::<GrepOptions>();
        set.parse(&args(&["needle"])).unwrap();
        let opts = handle.take();
        assert!(!opts.invert);
        assert_eq!(opts.count, 0);
        assert_eq!(opts.pattern, "needle");
        assert_eq!(opts.file, "");
    }

    #[test]
    fn test_defaults_render_from_default_instance() {
        struct Tuned {
            level: i64,
        }
        impl Default for Tuned {
            fn default() -> Self {
                Tuned { level: 9 }
            }
        }
        impl OptionSet for Tuned {
            fn declare(b: &mut Binder<Self>) {
                b.named("level", "compression level", |o| &mut o.level);
            }
        }

        let mut set = FlagSet::new("t", ErrorHandling::Continue);
        let _handle = set.bind_options::<Tuned>();
        let info = set.lookup("level").unwrap();
        assert_eq!(info.default, "9");
        assert!(!info.switch);
    }

    #[test]
    #[should_panic(expected = "flag redefined")]
    fn test_binder_collision_with_direct_definition_panics() {
        #[derive(Default)]
        struct One {
            v: bool,
        }
        impl OptionSet for One {
            fn declare(b: &mut Binder<Self>) {
                b.named("v", "", |o| &mut o.v);
            }
        }
        let mut set = FlagSet::new("t", ErrorHandling::Continue);
        set.define("v", false, "");
        set.bind_options::<One>();
    }
}
