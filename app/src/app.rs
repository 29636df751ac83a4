//! The application: metadata, routing, and the dispatch state machine.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use tracing::debug;

use crate::command::{
    Action, ActionBinding, ChainLink, Command, Filter, FilterBinding, LevelRemainder, Next,
    ResolvedAction, Validator,
};
use crate::context::Context;
use crate::status::{STATUS_NOT_FOUND, Status};
use crate::usage::{Author, CommandUsage, UsageModel, UsageRenderer, render_usage};

/// An application: a root [`Command`] plus metadata and execution hooks.
///
/// Registration requires `&mut self`; execution borrows `&self` and is
/// re-entrant, so a configured `App` can serve concurrent [`App::exec`]
/// calls from multiple threads.
///
/// # Examples
///
/// ```
/// use cmdtree::{ActionFn, App, Context};
///
/// let mut app = App::new("greet");
/// app.subaction("hello", "say hello", ActionFn(|ctx: &mut Context| {
///     println!("hello, path = {}", ctx.path_string());
///     Ok(())
/// }));
///
/// let stat = app.exec(&["hello".to_string()]);
/// assert!(stat.is_ok());
/// ```
pub struct App {
    root: Command,
    cmd_name: String,
    app_name: String,
    description: String,
    version: String,
    compiled: SystemTime,
    authors: Vec<Author>,
    copyright: String,
    not_found: Option<Arc<dyn Action>>,
    validator: Option<Arc<Validator>>,
    renderer: UsageRenderer,
    usage: RwLock<Option<String>>,
}

/// Everything a routing walk produced: the filter chain outermost-first,
/// the resolved action, and the command path. `routed` is false when the
/// action is the not-found handler, which runs without filters.
struct Resolution {
    chain: Vec<ChainLink>,
    action: ResolvedAction,
    path: Vec<String>,
    routed: bool,
}

/// Pops the head token when it is bare (not flag-like).
fn split_head(list: &[String]) -> (Option<&str>, &[String]) {
    match list.first() {
        Some(head) if head.len() < 2 || !head.starts_with('-') => (Some(head), &list[1..]),
        _ => (None, list),
    }
}

fn normalize_version(version: &str) -> String {
    let v = version.strip_prefix(['v', 'V']).unwrap_or(version);
    if v.is_empty() {
        "0.0.1".to_string()
    } else {
        v.to_string()
    }
}

fn normalize_cmd_name(cmd_name: &str) -> String {
    let name = cmd_name.trim_start_matches('-');
    if name.is_empty() {
        default_cmd_name()
    } else {
        name.to_string()
    }
}

fn default_cmd_name() -> String {
    match std::env::args().next() {
        Some(arg0) => match Path::new(&arg0).file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => arg0,
        },
        None => String::new(),
    }
}

fn default_compiled() -> SystemTime {
    std::env::current_exe()
        .and_then(|path| path.metadata())
        .and_then(|meta| meta.modified())
        .unwrap_or_else(|_| SystemTime::now())
}

impl App {
    /// Creates an application. An empty `cmd_name` falls back to the
    /// current process name; a leading `-` prefix is stripped.
    pub fn new(cmd_name: impl Into<String>) -> Self {
        Self {
            root: Command::new("", ""),
            cmd_name: normalize_cmd_name(&cmd_name.into()),
            app_name: String::new(),
            description: String::new(),
            version: "0.0.1".to_string(),
            compiled: default_compiled(),
            authors: Vec::new(),
            copyright: String::new(),
            not_found: None,
            validator: None,
            renderer: render_usage,
            usage: RwLock::new(None),
        }
    }

    /// The executable command name.
    pub fn cmd_name(&self) -> &str {
        &self.cmd_name
    }

    /// The display name, falling back to the command name.
    pub fn name(&self) -> &str {
        if self.app_name.is_empty() {
            &self.cmd_name
        } else {
            &self.app_name
        }
    }

    /// The application description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The normalized version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The compilation timestamp. Defaults to the executable's mtime.
    pub fn compiled(&self) -> SystemTime {
        self.compiled
    }

    /// The contributing authors.
    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    /// The copyright line.
    pub fn copyright(&self) -> &str {
        &self.copyright
    }

    /// Sets the executable command name. Same normalization as [`App::new`].
    pub fn set_cmd_name(&mut self, cmd_name: impl Into<String>) {
        self.cmd_name = normalize_cmd_name(&cmd_name.into());
        self.invalidate_usage();
    }

    /// Sets the display name.
    pub fn set_name(&mut self, app_name: impl Into<String>) {
        self.app_name = app_name.into();
        self.invalidate_usage();
    }

    /// Sets the application description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.invalidate_usage();
    }

    /// Sets the version. A leading `v` or `V` is stripped; an empty version
    /// becomes `0.0.1`.
    pub fn set_version(&mut self, version: &str) {
        self.version = normalize_version(version);
        self.invalidate_usage();
    }

    /// Sets the compilation timestamp.
    pub fn set_compiled(&mut self, compiled: SystemTime) {
        self.compiled = compiled;
        self.invalidate_usage();
    }

    /// Sets the author list.
    pub fn set_authors(&mut self, authors: Vec<Author>) {
        self.authors = authors;
        self.invalidate_usage();
    }

    /// Sets the copyright line.
    pub fn set_copyright(&mut self, copyright: impl Into<String>) {
        self.copyright = copyright.into();
        self.invalidate_usage();
    }

    /// Sets the action invoked when no command matches. It runs without
    /// filters.
    pub fn set_not_found(&mut self, action: impl Action + 'static) {
        self.not_found = Some(Arc::new(action));
    }

    /// Sets the validator applied to every freshly bound option struct.
    pub fn set_validator<F>(&mut self, validator: F)
    where
        F: Fn(&dyn Any) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
    }

    /// Replaces the usage renderer.
    pub fn set_usage_renderer(&mut self, renderer: UsageRenderer) {
        self.renderer = renderer;
        self.invalidate_usage();
    }

    /// The root command, for direct tree surgery.
    pub fn root_mut(&mut self) -> &mut Command {
        self.invalidate_usage();
        &mut self.root
    }

    /// Adds a subcommand to the root. See [`Command::subcommand`].
    pub fn subcommand(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Command {
        self.invalidate_usage();
        self.root.subcommand(name, description)
    }

    /// Appends a shared filter to the root. See [`Command::filter`].
    pub fn filter(&mut self, filter: impl Filter + 'static) {
        self.invalidate_usage();
        self.root.filter(filter);
    }

    /// Appends an option-struct filter to the root. See
    /// [`Command::options_filter`].
    pub fn options_filter<T>(&mut self)
    where
        T: cmdtree_flags::OptionSet + Filter,
    {
        self.invalidate_usage();
        self.root.options_filter::<T>();
    }

    /// Sets the root action. See [`Command::action`].
    pub fn action(&mut self, action: impl Action + 'static) {
        self.invalidate_usage();
        self.root.action(action);
    }

    /// Sets an option-struct root action. See [`Command::options_action`].
    pub fn options_action<T>(&mut self)
    where
        T: cmdtree_flags::OptionSet + Action,
    {
        self.invalidate_usage();
        self.root.options_action::<T>();
    }

    /// Adds a subcommand with its action in one call. See
    /// [`Command::subaction`].
    pub fn subaction(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        action: impl Action + 'static,
    ) {
        self.invalidate_usage();
        self.root.subaction(name, description, action);
    }

    /// Adds a subcommand with its option-struct action in one call. See
    /// [`Command::options_subaction`].
    pub fn options_subaction<T>(&mut self, name: impl Into<String>, description: impl Into<String>)
    where
        T: cmdtree_flags::OptionSet + Action,
    {
        self.invalidate_usage();
        self.root.options_subaction::<T>(name, description);
    }

    /// Executes the application against an argument list.
    ///
    /// Routing walks the command tree: each level's option-struct filters
    /// parse the level's argument list, then the action (or a subcommand
    /// named by the next bare token) is resolved. The action runs once,
    /// wrapped by every filter collected along the path, outermost first.
    /// Panics in handler code are converted to a [`Status`]; a thrown
    /// `Status` payload passes through intact.
    pub fn exec(&self, arguments: &[String]) -> Status {
        self.exec_inner(arguments, None)
    }

    /// Like [`App::exec`], with an opaque carrier made available to
    /// handlers through [`Context::carrier`].
    pub fn exec_with(&self, arguments: &[String], carrier: Box<dyn Any + Send>) -> Status {
        self.exec_inner(arguments, Some(carrier))
    }

    fn exec_inner(&self, arguments: &[String], carrier: Option<Box<dyn Any + Send>>) -> Status {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(arguments, carrier)));
        match outcome {
            Ok(Ok(())) => Status::ok(),
            Ok(Err(stat)) => stat,
            Err(payload) => Status::from_panic(payload),
        }
    }

    fn dispatch(
        &self,
        arguments: &[String],
        carrier: Option<Box<dyn Any + Send>>,
    ) -> Result<(), Status> {
        let mut list = arguments.to_vec();
        if let Some(head) = list.first() {
            if !head.starts_with('-') {
                let base = Path::new(head).file_name().map(|f| f.to_string_lossy());
                if *head == self.cmd_name || base.as_deref() == Some(self.cmd_name.as_str()) {
                    list.remove(0);
                }
            }
        }
        let resolution = self.resolve(&self.root, vec![self.cmd_name.clone()], list)?;
        let mut ctx = Context::new(arguments.to_vec(), resolution.path, carrier);
        run_chain(&resolution.chain, 0, &resolution.action, &mut ctx)
    }

    /// The routing walk. `args` is the level's argument list; option-struct
    /// filters at one level all parse that same list, and the current list
    /// shrinks to the shortest adapter remainder before the action or the
    /// subcommand name is resolved. Flag tokens the adapters deferred never
    /// name a subcommand: the name is the first bare token past the
    /// deferred prefix, and the prefix is forwarded to the child level.
    fn resolve(
        &self,
        cmd: &Command,
        mut path: Vec<String>,
        args: Vec<String>,
    ) -> Result<Resolution, Status> {
        let validator = self.validator.as_deref();
        let mut current = LevelRemainder {
            tokens: args.clone(),
            deferred: 0,
        };
        let mut chain: Vec<ChainLink> = Vec::new();
        for binding in &cmd.filters {
            match binding {
                FilterBinding::Shared(filter) => chain.push(ChainLink::Shared(Arc::clone(filter))),
                FilterBinding::Options(factory) => {
                    let (filter, next) = factory.build(cmd.name(), &args, validator)?;
                    // An equal-length remainder still supplies its deferred
                    // split, so a filter with no matching flags does not
                    // leave its strays in routing position.
                    if next.tokens.len() <= current.tokens.len() {
                        current = next;
                    }
                    chain.push(ChainLink::Fresh(filter));
                }
            }
        }
        if let Some(binding) = &cmd.action {
            let action = match binding {
                ActionBinding::Shared(action) => ResolvedAction::Shared(Arc::clone(action)),
                ActionBinding::Options(factory) => {
                    ResolvedAction::Fresh(factory.build(cmd.name(), &current.tokens, validator)?)
                }
            };
            debug!(path = %path.join(" "), filters = chain.len(), "resolved action");
            return Ok(Resolution {
                chain,
                action,
                path,
                routed: true,
            });
        }
        let (head, rest) = split_head(current.tail());
        if let Some(name) = head {
            if let Some(child) = cmd.children.get(name) {
                path.push(name.to_string());
                let mut forwarded = current.deferred_prefix().to_vec();
                forwarded.extend(rest.iter().cloned());
                let mut sub = self.resolve(child, path, forwarded)?;
                if sub.routed {
                    let mut combined = chain;
                    combined.append(&mut sub.chain);
                    sub.chain = combined;
                }
                return Ok(sub);
            }
            path.push(name.to_string());
        }
        debug!(path = %path.join(" "), "no command action matched");
        match &self.not_found {
            Some(handler) => Ok(Resolution {
                chain: Vec::new(),
                action: ResolvedAction::Shared(Arc::clone(handler)),
                path,
                routed: false,
            }),
            None => Err(Status::new(
                STATUS_NOT_FOUND,
                format!("not found command action: {:?}", path.join(" ")),
            )),
        }
    }

    /// The usage text, rendered on first use and cached until the next
    /// metadata change.
    pub fn usage_text(&self) -> String {
        {
            let cached = self.usage.read().unwrap_or_else(|e| e.into_inner());
            if let Some(text) = cached.as_ref() {
                return text.clone();
            }
        }
        let text = (self.renderer)(&self.usage_model());
        let mut guard = self.usage.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(text.clone());
        text
    }

    /// A serializable snapshot of everything usage is rendered from.
    pub fn usage_model(&self) -> UsageModel {
        let mut commands = Vec::new();
        collect_commands(&self.root, String::new(), &mut commands);
        let mut global_flags: Vec<_> = self
            .root
            .filters
            .iter()
            .flat_map(|binding| binding.flag_info())
            .collect();
        if let Some(action) = &self.root.action {
            global_flags.extend(action.flag_info());
        }
        UsageModel {
            app_name: self.app_name.clone(),
            cmd_name: self.cmd_name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            commands,
            global_flags,
            authors: self.authors.clone(),
            copyright: self.copyright.clone(),
        }
    }

    fn invalidate_usage(&mut self) {
        let slot = self.usage.get_mut().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

fn collect_commands(cmd: &Command, prefix: String, out: &mut Vec<CommandUsage>) {
    for child in cmd.children.values() {
        let path = if prefix.is_empty() {
            child.name().to_string()
        } else {
            format!("{prefix} {}", child.name())
        };
        if let Some(action) = &child.action {
            out.push(CommandUsage {
                path: path.clone(),
                description: child.description().to_string(),
                flags: action.flag_info(),
            });
        }
        collect_commands(child, path, out);
    }
}

/// Invokes the filter chain from `idx` onward, ending at the action. Each
/// filter receives a continuation for the rest of the chain.
fn run_chain(
    chain: &[ChainLink],
    idx: usize,
    action: &ResolvedAction,
    ctx: &mut Context,
) -> Result<(), Status> {
    match chain.get(idx) {
        None => action.invoke(ctx),
        Some(link) => {
            let mut continuation = |c: &mut Context| run_chain(chain, idx + 1, action, c);
            link.as_filter().filter(ctx, Next::new(&mut continuation))
        }
    }
}
