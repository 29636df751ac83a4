//! Hierarchical command routing with middleware-style filter chains.
//!
//! This crate layers command dispatch on top of the
//! [`cmdtree_flags`] parser:
//!
//! - [`App`] — application metadata, the root of the command tree, and the
//!   [`App::exec`] state machine.
//! - [`Command`] — a tree node carrying filters and either an action or
//!   subcommands.
//! - [`Filter`] / [`Action`] — the handler traits, with [`FilterFn`] /
//!   [`ActionFn`] adapters for plain functions, and option-struct variants
//!   that bind the level's flags onto a fresh struct per invocation.
//! - [`Status`] — the result currency: code, message, optional cause.
//!   Uncaught panics in handlers are converted at the top of `exec`.
//! - [`Context`] — the original argument list, resolved command path, and
//!   an opaque caller-supplied carrier.
//!
//! # Example
//!
//! ```
//! use cmdtree::{ActionFn, App, Binder, Context, OptionSet, Status};
//!
//! #[derive(Default)]
//! struct MigrateOptions {
//!     dry_run: bool,
//!     steps: i64,
//! }
//!
//! impl OptionSet for MigrateOptions {
//!     fn declare(b: &mut Binder<Self>) {
//!         b.named("n", "print statements without applying", |o| &mut o.dry_run);
//!         b.named("steps", "how many migrations to apply", |o| &mut o.steps);
//!     }
//! }
//!
//! impl cmdtree::Action for MigrateOptions {
//!     fn handle(&self, ctx: &mut Context) -> Result<(), Status> {
//!         assert_eq!(ctx.path_string(), "dbtool db migrate");
//!         assert!(self.dry_run);
//!         assert_eq!(self.steps, 2);
//!         Ok(())
//!     }
//! }
//!
//! let mut app = App::new("dbtool");
//! let db = app.subcommand("db", "database tools");
//! db.options_subaction::<MigrateOptions>("migrate", "apply migrations");
//! app.subaction("version", "print version", ActionFn(|_ctx: &mut Context| Ok(())));
//!
//! let args: Vec<String> = ["db", "migrate", "-n", "-steps", "2"]
//!     .iter().map(|s| s.to_string()).collect();
//! assert!(app.exec(&args).is_ok());
//! ```

mod app;
mod command;
mod context;
mod status;
mod usage;

pub use app::App;
pub use command::{Action, ActionFn, Command, Filter, FilterFn, Next, Validator};
pub use context::Context;
pub use status::{
    STATUS_BAD_ARGS, STATUS_NOT_FOUND, STATUS_PARSE_FAILED, STATUS_UNKNOWN,
    STATUS_VALIDATE_FAILED, Status,
};
pub use usage::{Author, CommandUsage, UsageModel, UsageRenderer, render_usage};

pub use cmdtree_flags::{
    Binder, ErrorHandling, FlagInfo, FlagSet, FlagValue, OptionSet, OptionsHandle, ParseError,
    Slot, ValueError,
};
