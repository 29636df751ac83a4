use std::sync::{Arc, Mutex};

use cmdtree::{
    Action, ActionFn, App, Binder, Context, Filter, FilterFn, Next, OptionSet, STATUS_BAD_ARGS,
    STATUS_NOT_FOUND, STATUS_PARSE_FAILED, STATUS_UNKNOWN, STATUS_VALIDATE_FAILED, Status,
};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

type Log = Arc<Mutex<Vec<String>>>;

struct LogFilter {
    log: Log,
    tag: &'static str,
}

impl Filter for LogFilter {
    fn filter(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Status> {
        self.log.lock().unwrap().push(format!("{}:start", self.tag));
        let result = next.run(ctx);
        self.log.lock().unwrap().push(format!("{}:end", self.tag));
        result
    }
}

struct LogAction {
    log: Log,
    tag: &'static str,
}

impl Action for LogAction {
    fn handle(&self, _ctx: &mut Context) -> Result<(), Status> {
        self.log.lock().unwrap().push(self.tag.to_string());
        Ok(())
    }
}

#[test]
fn test_filters_wrap_action_in_onion_order() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    app.filter(LogFilter {
        log: log.clone(),
        tag: "f1",
    });
    app.filter(LogFilter {
        log: log.clone(),
        tag: "f2",
    });
    app.subaction(
        "run",
        "",
        LogAction {
            log: log.clone(),
            tag: "act",
        },
    );

    let stat = app.exec(&args(&["run"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(
        *log.lock().unwrap(),
        ["f1:start", "f2:start", "act", "f2:end", "f1:end"]
    );
}

#[test]
fn test_parent_filters_precede_child_filters() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    app.filter(LogFilter {
        log: log.clone(),
        tag: "root",
    });
    let db = app.subcommand("db", "database tools");
    db.filter(LogFilter {
        log: log.clone(),
        tag: "db",
    });
    db.subaction(
        "migrate",
        "",
        LogAction {
            log: log.clone(),
            tag: "migrate",
        },
    );

    let stat = app.exec(&args(&["db", "migrate"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(
        *log.lock().unwrap(),
        ["root:start", "db:start", "migrate", "db:end", "root:end"]
    );
}

#[derive(Default)]
struct GlobalOptions {
    g: String,
}

impl OptionSet for GlobalOptions {
    fn declare(b: &mut Binder<Self>) {
        b.named("g", "global value", |o| &mut o.g);
    }
}

impl Filter for GlobalOptions {
    fn filter(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Status> {
        if self.g.is_empty() {
            return Err(Status::new(STATUS_BAD_ARGS, "missing -g"));
        }
        next.run(ctx)
    }
}

#[test]
fn test_options_filter_with_terminator_routes_to_subcommand() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    app.options_filter::<GlobalOptions>();
    app.subaction(
        "c",
        "",
        LogAction {
            log: log.clone(),
            tag: "c",
        },
    );

    // The terminator separates the global options from the subcommand name.
    let stat = app.exec(&args(&["-g", "z", "--", "c"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(*log.lock().unwrap(), ["c"]);

    // Without -g, the freshly bound filter rejects the invocation.
    let stat = app.exec(&args(&["c"]));
    assert_eq!(stat.code(), STATUS_BAD_ARGS);
}

#[derive(Default)]
struct RegionOptions {
    region: String,
}

impl OptionSet for RegionOptions {
    fn declare(b: &mut Binder<Self>) {
        b.named("region", "deployment region", |o| &mut o.region);
    }
}

impl Filter for RegionOptions {
    fn filter(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Status> {
        if self.region.is_empty() {
            return Err(Status::new(STATUS_BAD_ARGS, "missing -region"));
        }
        next.run(ctx)
    }
}

#[test]
fn test_sibling_options_filters_interleaved_before_subcommand() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    app.options_filter::<GlobalOptions>();
    app.options_filter::<RegionOptions>();
    app.subaction(
        "c",
        "",
        LogAction {
            log: log.clone(),
            tag: "c",
        },
    );

    // Each filter binds its own flag and defers the sibling's; neither
    // deferred flag may stand between routing and the subcommand name.
    let stat = app.exec(&args(&["-region", "eu", "-g", "z", "c"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(*log.lock().unwrap(), ["c"]);
}

#[test]
fn test_unclaimed_flag_before_subcommand_still_routes() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    app.options_filter::<GlobalOptions>();
    app.subaction(
        "c",
        "",
        LogAction {
            log: log.clone(),
            tag: "c",
        },
    );

    let stat = app.exec(&args(&["-u", "1", "-g", "z", "c"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(*log.lock().unwrap(), ["c"]);
}

#[derive(Default)]
struct CopyOptions {
    depth: i64,
    src: String,
}

impl OptionSet for CopyOptions {
    fn declare(b: &mut Binder<Self>) {
        b.named("depth", "recursion depth", |o| &mut o.depth);
        b.positional(0, "source path", |o| &mut o.src);
    }
}

impl Action for CopyOptions {
    fn handle(&self, ctx: &mut Context) -> Result<(), Status> {
        assert_eq!(self.depth, 3);
        assert_eq!(self.src, "in.txt");
        assert_eq!(ctx.path_string(), "t copy");
        Ok(())
    }
}

#[test]
fn test_options_action_binds_flags_and_positionals() {
    let mut app = App::new("t");
    app.options_subaction::<CopyOptions>("copy", "copy a file");

    let stat = app.exec(&args(&["copy", "-depth", "3", "in.txt"]));
    assert!(stat.is_ok(), "{stat}");
}

#[test]
fn test_options_action_parse_failure() {
    let mut app = App::new("t");
    app.options_subaction::<CopyOptions>("copy", "copy a file");

    let stat = app.exec(&args(&["copy", "-depth", "many"]));
    assert_eq!(stat.code(), STATUS_PARSE_FAILED);
    assert!(stat.cause().is_some());
}

#[test]
fn test_validator_rejection() {
    let mut app = App::new("t");
    app.options_subaction::<CopyOptions>("copy", "copy a file");
    app.set_validator(|opts| {
        if let Some(copy) = opts.downcast_ref::<CopyOptions>() {
            if copy.depth < 0 {
                return Err("depth must not be negative".to_string());
            }
        }
        Ok(())
    });

    let stat = app.exec(&args(&["copy", "-depth=-4", "in.txt"]));
    assert_eq!(stat.code(), STATUS_VALIDATE_FAILED);
    assert_eq!(stat.msg(), "depth must not be negative");

    let stat = app.exec(&args(&["copy", "-depth", "3", "in.txt"]));
    assert!(stat.is_ok(), "{stat}");
}

#[test]
fn test_unknown_command_without_handler() {
    let mut app = App::new("t");
    app.subaction("a", "", ActionFn(|_ctx: &mut Context| Ok(())));

    let stat = app.exec(&args(&["b"]));
    assert_eq!(stat.code(), STATUS_NOT_FOUND);
    assert!(stat.msg().contains("t b"), "{}", stat.msg());
}

#[test]
fn test_not_found_handler_runs_without_filters() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    app.filter(LogFilter {
        log: log.clone(),
        tag: "f1",
    });
    app.subaction("a", "", ActionFn(|_ctx: &mut Context| Ok(())));

    let seen: Log = Arc::default();
    let seen_in_handler = seen.clone();
    app.set_not_found(ActionFn(move |ctx: &mut Context| {
        seen_in_handler.lock().unwrap().push(ctx.args().join(" "));
        Ok(())
    }));

    let stat = app.exec(&args(&["b", "-x"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(*seen.lock().unwrap(), ["b -x"]);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_panic_in_action_becomes_status() {
    let mut app = App::new("t");
    app.subaction(
        "boom",
        "",
        ActionFn(|_ctx: &mut Context| -> Result<(), Status> { panic!("handler exploded") }),
    );

    let stat = app.exec(&args(&["boom"]));
    assert_eq!(stat.code(), STATUS_UNKNOWN);
    assert_eq!(stat.msg(), "handler exploded");
}

#[test]
fn test_thrown_status_passes_through() {
    let mut app = App::new("t");
    app.subaction(
        "bail",
        "",
        ActionFn(|_ctx: &mut Context| -> Result<(), Status> {
            Status::new(STATUS_BAD_ARGS, "bailing out").throw()
        }),
    );

    let stat = app.exec(&args(&["bail"]));
    assert_eq!(stat.code(), STATUS_BAD_ARGS);
    assert_eq!(stat.msg(), "bailing out");
}

#[test]
fn test_context_carries_original_args_and_carrier() {
    let mut app = App::new("t");
    app.subaction(
        "show",
        "",
        ActionFn(|ctx: &mut Context| {
            assert_eq!(ctx.args(), ["show", "-x", "1"]);
            let tag = ctx
                .carrier::<String>()
                .ok_or_else(|| Status::new(STATUS_BAD_ARGS, "carrier missing"))?;
            assert_eq!(tag, "payload");
            Ok(())
        }),
    );

    let stat = app.exec_with(&args(&["show", "-x", "1"]), Box::new("payload".to_string()));
    assert!(stat.is_ok(), "{stat}");
}

#[test]
fn test_program_name_head_is_stripped() {
    let log: Log = Arc::default();
    let mut app = App::new("tool");
    app.subaction(
        "run",
        "",
        LogAction {
            log: log.clone(),
            tag: "run",
        },
    );

    let stat = app.exec(&args(&["/usr/local/bin/tool", "run"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(*log.lock().unwrap(), ["run"]);
}

#[test]
fn test_concurrent_exec_on_shared_app() {
    let mut app = App::new("t");
    app.options_subaction::<CopyOptions>("copy", "copy a file");
    let app = &app;

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(move || {
                for _ in 0..25 {
                    let stat = app.exec(&args(&["copy", "-depth", "3", "in.txt"]));
                    assert!(stat.is_ok(), "{stat}");
                }
            });
        }
    });
}

#[test]
fn test_function_filter_adapter() {
    let log: Log = Arc::default();
    let mut app = App::new("t");
    let in_filter = log.clone();
    app.filter(FilterFn(
        move |ctx: &mut Context, next: Next<'_>| -> Result<(), Status> {
            in_filter.lock().unwrap().push("before".to_string());
            let result = next.run(ctx);
            in_filter.lock().unwrap().push("after".to_string());
            result
        },
    ));
    app.subaction(
        "go",
        "",
        LogAction {
            log: log.clone(),
            tag: "go",
        },
    );

    let stat = app.exec(&args(&["go"]));
    assert!(stat.is_ok(), "{stat}");
    assert_eq!(*log.lock().unwrap(), ["before", "go", "after"]);
}
