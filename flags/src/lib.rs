//! Extended argument parsing: typed flags, indexed positionals, and
//! declarative option binding.
//!
//! This crate turns a raw argument list into typed values:
//!
//! - [`FlagSet`] — the parser core: named flags, positional entries keyed by
//!   zero-based index, the `--` terminator, and a tolerate-undefined mode
//!   that defers unrecognized tokens for a later parse level.
//! - [`FlagValue`] — the adapter trait for bindable primitive types (`bool`,
//!   integers, `f64`, `String`, `Duration`).
//! - [`Slot`] — the readable handle a direct [`FlagSet::define`] hands back.
//! - [`OptionSet`] / [`Binder`] — declarative binding of a whole option
//!   struct, one flag or positional per declared field.
//! - [`FlagInfo`] — serializable per-entry metadata for usage rendering.
//!
//! # Example
//!
//! ```
//! use cmdtree_flags::{Binder, ErrorHandling, FlagSet, OptionSet};
//!
//! #[derive(Default)]
//! struct ServeOptions {
//!     port: u32,
//!     root: String,
//! }
//!
//! impl OptionSet for ServeOptions {
//!     fn declare(b: &mut Binder<Self>) {
//!         b.named("port", "listen port", |o| &mut o.port);
//!         b.positional(0, "document root", |o| &mut o.root);
//!     }
//! }
//!
//! let mut set = FlagSet::new("serve", ErrorHandling::Continue);
//! let handle = set.bind_options::<ServeOptions>();
//! let args: Vec<String> = ["serve", "-port", "8080", "/srv/www"]
//!     .iter().map(|s| s.to_string()).collect();
//! set.parse(&args).unwrap();
//!
//! let opts = handle.take();
//! assert_eq!(opts.port, 8080);
//! assert_eq!(opts.root, "/srv/www");
//! ```

mod bind;
mod error;
mod set;
pub mod usage;
mod value;

pub use bind::{Binder, OptionSet, OptionsHandle};
pub use error::{ParseError, Result, ValueError};
pub use set::{ErrorHandling, FlagInfo, FlagSet};
pub use value::{FlagValue, Slot};
