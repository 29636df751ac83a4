//! The command tree: hierarchical commands, filters, and actions.
//!
//! A [`Command`] either carries an action (a leaf) or subcommands (a
//! branch), never both. Filters wrap whichever action the routing walk
//! eventually resolves beneath them, outermost first.
//!
//! Handlers come in two flavors. Shared handlers ([`ActionFn`],
//! [`FilterFn`], or any `impl Action`/`impl Filter` value) are registered
//! once and invoked through a shared reference. Option-struct handlers
//! ([`Command::options_action`], [`Command::options_filter`]) are rebuilt
//! per invocation: a fresh `T::default()` is bound to a new tolerant flag
//! set, the level's argument list is parsed into it, and the populated
//! instance handles the call. Fresh copies mean concurrent executions never
//! share mutable bound state.

use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use cmdtree_flags::{ErrorHandling, FlagInfo, FlagSet, OptionSet};

use crate::context::Context;
use crate::status::{STATUS_PARSE_FAILED, STATUS_VALIDATE_FAILED, Status};

/// The continuation a filter forwards to: the rest of the chain and,
/// innermost, the action. Running it consumes it, so a filter invokes the
/// remainder at most once; dropping it without running skips the action.
pub struct Next<'a> {
    inner: &'a mut dyn FnMut(&mut Context) -> Result<(), Status>,
}

impl Next<'_> {
    pub(crate) fn new(inner: &mut dyn FnMut(&mut Context) -> Result<(), Status>) -> Next<'_> {
        Next { inner }
    }

    /// Invokes the rest of the chain.
    pub fn run(self, ctx: &mut Context) -> Result<(), Status> {
        (self.inner)(ctx)
    }
}

/// A command action.
pub trait Action: Send + Sync {
    /// Handles one invocation.
    fn handle(&self, ctx: &mut Context) -> Result<(), Status>;
}

/// A filter wrapping the resolved action.
pub trait Filter: Send + Sync {
    /// Handles one invocation, deciding whether and when to run `next`.
    fn filter(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Status>;
}

/// Adapts a plain function or closure into an [`Action`].
///
/// # Examples
///
/// ```
/// use cmdtree::{ActionFn, App, Context};
///
/// let mut app = App::new("tool");
/// app.subcommand("version", "print the version")
///     .action(ActionFn(|_ctx: &mut Context| {
///         println!("0.1.0");
///         Ok(())
///     }));
/// ```
pub struct ActionFn<F>(pub F);

impl<F> Action for ActionFn<F>
where
    F: Fn(&mut Context) -> Result<(), Status> + Send + Sync,
{
    fn handle(&self, ctx: &mut Context) -> Result<(), Status> {
        (self.0)(ctx)
    }
}

/// Adapts a plain function or closure into a [`Filter`].
pub struct FilterFn<F>(pub F);

impl<F> Filter for FilterFn<F>
where
    F: for<'a> Fn(&mut Context, Next<'a>) -> Result<(), Status> + Send + Sync,
{
    fn filter(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Status> {
        (self.0)(ctx, next)
    }
}

/// Validates a freshly bound option struct before its handler runs.
pub type Validator = dyn Fn(&dyn Any) -> Result<(), String> + Send + Sync;

/// What a level's adapter leaves for the rest of the routing walk: deferred
/// flag tokens destined for another parse level, then the routable tail.
pub(crate) struct LevelRemainder {
    pub(crate) tokens: Vec<String>,
    pub(crate) deferred: usize,
}

impl LevelRemainder {
    pub(crate) fn deferred_prefix(&self) -> &[String] {
        &self.tokens[..self.deferred]
    }

    pub(crate) fn tail(&self) -> &[String] {
        &self.tokens[self.deferred..]
    }
}

/// Builds a fresh option-struct filter for one invocation.
pub(crate) trait FilterFactory: Send + Sync {
    fn build(
        &self,
        set_name: &str,
        args: &[String],
        validator: Option<&Validator>,
    ) -> Result<(Box<dyn Filter>, LevelRemainder), Status>;

    fn flag_info(&self) -> Vec<FlagInfo>;
}

/// Builds a fresh option-struct action for one invocation.
pub(crate) trait ActionFactory: Send + Sync {
    fn build(
        &self,
        set_name: &str,
        args: &[String],
        validator: Option<&Validator>,
    ) -> Result<Box<dyn Action>, Status>;

    fn flag_info(&self) -> Vec<FlagInfo>;
}

/// Binds `T::default()` to a fresh tolerant flag set and parses the level's
/// argument list into it.
fn bind_fresh<T: OptionSet>(
    set_name: &str,
    args: &[String],
    validator: Option<&Validator>,
) -> Result<(T, LevelRemainder), Status> {
    let mut set = FlagSet::new(set_name, ErrorHandling::Continue);
    set.set_ignore_undefined(true);
    let handle = set.bind_options::<T>();
    set.parse(args)
        .map_err(|err| Status::new(STATUS_PARSE_FAILED, err.to_string()).with_cause(err))?;
    let instance = handle.take();
    if let Some(validate) = validator {
        validate(&instance).map_err(|msg| Status::new(STATUS_VALIDATE_FAILED, msg))?;
    }
    let remainder = LevelRemainder {
        tokens: set.next_args().to_vec(),
        deferred: set.deferred_args().len(),
    };
    Ok((instance, remainder))
}

/// Probes the flag metadata `T` declares, without parsing anything.
fn probe_flags<T: OptionSet>() -> Vec<FlagInfo> {
    let mut set = FlagSet::new("", ErrorHandling::Continue);
    set.bind_options::<T>();
    set.flags()
}

struct OptionsFilter<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> FilterFactory for OptionsFilter<T>
where
    T: OptionSet + Filter,
{
    fn build(
        &self,
        set_name: &str,
        args: &[String],
        validator: Option<&Validator>,
    ) -> Result<(Box<dyn Filter>, LevelRemainder), Status> {
        let (instance, next) = bind_fresh::<T>(set_name, args, validator)?;
        Ok((Box::new(instance), next))
    }

    fn flag_info(&self) -> Vec<FlagInfo> {
        probe_flags::<T>()
    }
}

struct OptionsAction<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> ActionFactory for OptionsAction<T>
where
    T: OptionSet + Action,
{
    fn build(
        &self,
        set_name: &str,
        args: &[String],
        validator: Option<&Validator>,
    ) -> Result<Box<dyn Action>, Status> {
        let (instance, _next) = bind_fresh::<T>(set_name, args, validator)?;
        Ok(Box::new(instance))
    }

    fn flag_info(&self) -> Vec<FlagInfo> {
        probe_flags::<T>()
    }
}

/// One entry in a resolved filter chain: either a registered shared filter
/// or a fresh per-invocation option-struct instance.
pub(crate) enum ChainLink {
    Shared(Arc<dyn Filter>),
    Fresh(Box<dyn Filter>),
}

impl ChainLink {
    pub(crate) fn as_filter(&self) -> &dyn Filter {
        match self {
            ChainLink::Shared(filter) => filter.as_ref(),
            ChainLink::Fresh(filter) => filter.as_ref(),
        }
    }
}

/// The action a routing walk resolved to.
pub(crate) enum ResolvedAction {
    Shared(Arc<dyn Action>),
    Fresh(Box<dyn Action>),
}

impl ResolvedAction {
    pub(crate) fn invoke(&self, ctx: &mut Context) -> Result<(), Status> {
        match self {
            ResolvedAction::Shared(action) => action.handle(ctx),
            ResolvedAction::Fresh(action) => action.handle(ctx),
        }
    }
}

pub(crate) enum FilterBinding {
    Shared(Arc<dyn Filter>),
    Options(Box<dyn FilterFactory>),
}

impl FilterBinding {
    pub(crate) fn flag_info(&self) -> Vec<FlagInfo> {
        match self {
            FilterBinding::Shared(_) => Vec::new(),
            FilterBinding::Options(factory) => factory.flag_info(),
        }
    }
}

pub(crate) enum ActionBinding {
    Shared(Arc<dyn Action>),
    Options(Box<dyn ActionFactory>),
}

impl ActionBinding {
    pub(crate) fn flag_info(&self) -> Vec<FlagInfo> {
        match self {
            ActionBinding::Shared(_) => Vec::new(),
            ActionBinding::Options(factory) => factory.flag_info(),
        }
    }
}

/// A node in the command tree.
///
/// All registration methods panic on configuration faults (empty or
/// duplicate names, an action beside subcommands, duplicate flag names in
/// an option struct), so a malformed tree cannot survive past startup.
pub struct Command {
    name: String,
    description: String,
    pub(crate) filters: Vec<FilterBinding>,
    pub(crate) action: Option<ActionBinding>,
    pub(crate) children: BTreeMap<String, Command>,
}

impl Command {
    pub(crate) fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            filters: Vec::new(),
            action: None,
            children: BTreeMap::new(),
        }
    }

    /// The command's name. Empty for an application root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command's description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Adds a subcommand and returns it for further registration.
    ///
    /// # Panics
    ///
    /// Panics when the name is empty, when this command already has an
    /// action, or when a child with the same name exists.
    pub fn subcommand(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Command {
        let name = name.into();
        if name.is_empty() {
            panic!("command name is empty");
        }
        if self.action.is_some() {
            panic!("action has been set, no subcommand can be added: {:?}", self.name);
        }
        if self.children.contains_key(&name) {
            panic!("command named {name} already exists");
        }
        let child = Command::new(name.clone(), description);
        self.children.entry(name).or_insert(child)
    }

    /// Appends a shared filter. The same value serves every invocation.
    pub fn filter(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(FilterBinding::Shared(Arc::new(filter)));
        self
    }

    /// Appends an option-struct filter, rebuilt and re-parsed per
    /// invocation.
    ///
    /// # Panics
    ///
    /// Panics when `T` declares duplicate flag names or positional indices.
    pub fn options_filter<T>(&mut self) -> &mut Self
    where
        T: OptionSet + Filter,
    {
        let factory = OptionsFilter::<T> {
            marker: PhantomData,
        };
        // Surfaces duplicate declarations now instead of at dispatch.
        let _ = factory.flag_info();
        self.filters.push(FilterBinding::Options(Box::new(factory)));
        self
    }

    /// Sets the shared action of this command, making it a leaf.
    ///
    /// # Panics
    ///
    /// Panics when subcommands already exist or an action is already set.
    pub fn action(&mut self, action: impl Action + 'static) {
        self.check_leaf();
        self.action = Some(ActionBinding::Shared(Arc::new(action)));
    }

    /// Sets an option-struct action, rebuilt and re-parsed per invocation.
    ///
    /// # Panics
    ///
    /// Panics when subcommands already exist, an action is already set, or
    /// `T` declares duplicate flag names or positional indices.
    pub fn options_action<T>(&mut self)
    where
        T: OptionSet + Action,
    {
        self.check_leaf();
        let factory = OptionsAction::<T> {
            marker: PhantomData,
        };
        let _ = factory.flag_info();
        self.action = Some(ActionBinding::Options(Box::new(factory)));
    }

    /// Adds a subcommand together with its shared action in one call.
    pub fn subaction(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        action: impl Action + 'static,
    ) {
        self.subcommand(name, description).action(action);
    }

    /// Adds a subcommand together with its option-struct action in one call.
    pub fn options_subaction<T>(&mut self, name: impl Into<String>, description: impl Into<String>)
    where
        T: OptionSet + Action,
    {
        self.subcommand(name, description).options_action::<T>();
    }

    fn check_leaf(&self) {
        if !self.children.is_empty() {
            panic!(
                "subcommands have been added, no action can be set: {:?}",
                self.name
            );
        }
        if self.action.is_some() {
            panic!("action already set: {:?}", self.name);
        }
    }
}
