use std::time::Duration;

use cmdtree_flags::{Binder, ErrorHandling, FlagSet, OptionSet, ParseError};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn quiet(name: &str) -> FlagSet {
    let mut set = FlagSet::new(name, ErrorHandling::Continue);
    set.set_output(Box::new(std::io::sink()));
    set
}

#[test]
fn test_mixed_flags_positionals_and_remainder() {
    let mut set = quiet("tool");
    let verbose = set.define("v", false, "verbose");
    let level = set.define("level", 0i64, "level");
    let input = set.define_positional(0, String::new(), "input");

    set.parse(&args(&["tool", "-v", "-level=4", "in.dat", "extra", "bits"]))
        .unwrap();

    assert!(verbose.get());
    assert_eq!(level.get(), 4);
    assert_eq!(input.get(), "in.dat");
    assert_eq!(set.next_args(), args(&["extra", "bits"]));
}

#[test]
fn test_terminator_always_terminates() {
    let mut set = quiet("t");
    let a = set.define("a", 0i64, "");
    let b = set.define("b", 0i64, "");
    set.parse(&args(&["-a", "1", "--", "-b", "2"])).unwrap();

    assert_eq!(a.get(), 1);
    assert!(!set.seen("b"));
    assert_eq!(b.get(), 0);
    assert_eq!(set.next_args(), args(&["-b", "2"]));
}

#[test]
fn test_next_args_reparse_is_idempotent() {
    // Parsing a set's own remainder against an equally configured set must
    // bind nothing new and reproduce the same remainder.
    let build = || {
        let mut set = quiet("t");
        set.set_ignore_undefined(true);
        set.define("g", String::new(), "");
        set
    };

    let mut first = build();
    first
        .parse(&args(&["-g", "v", "-other", "o", "tail"]))
        .unwrap();
    let remainder = first.next_args().to_vec();
    assert_eq!(remainder, args(&["-other", "o", "tail"]));
    assert_eq!(first.deferred_args(), args(&["-other", "o"]));

    let mut second = build();
    second.parse(&remainder).unwrap();
    assert!(!second.seen("g"));
    assert_eq!(second.next_args(), remainder);
}

#[test]
fn test_duration_flag_binds_humane_grammar() {
    let mut set = quiet("t");
    let timeout = set.define("timeout", Duration::ZERO, "how long to wait");
    set.parse(&args(&["-timeout", "1h30m"])).unwrap();
    assert_eq!(timeout.get(), Duration::from_secs(5400));
}

#[test]
fn test_tolerant_interleaved_levels() {
    // Outer level sees its own flag among flags destined for an inner level;
    // the inner flags survive verbatim in the remainder.
    let mut outer = quiet("outer");
    outer.set_ignore_undefined(true);
    let g = outer.define("g", 0i64, "");
    outer
        .parse(&args(&["-inner", "x", "-g", "7", "-w", "sub", "go"]))
        .unwrap();
    assert_eq!(g.get(), 7);
    assert_eq!(outer.next_args(), args(&["-inner", "x", "-w", "sub", "go"]));

    let mut inner = quiet("inner-set");
    inner.set_ignore_undefined(true);
    let inner_flag = inner.define("inner", String::new(), "");
    let w = inner.define("w", false, "");
    inner.parse(outer.next_args()).unwrap();
    assert_eq!(inner_flag.get(), "x");
    assert!(w.get());
    assert_eq!(inner.next_args(), args(&["sub", "go"]));
}

#[test]
fn test_option_struct_end_to_end() {
    #[derive(Default)]
    struct SyncOptions {
        dry_run: bool,
        jobs: i64,
        window: Duration,
        src: String,
        dst: String,
    }

    impl OptionSet for SyncOptions {
        fn declare(b: &mut Binder<Self>) {
            b.named("n", "dry run", |o| &mut o.dry_run);
            b.named("jobs", "parallel transfers", |o| &mut o.jobs);
            b.named("window", "retry window", |o| &mut o.window);
            b.positional(0, "source", |o| &mut o.src);
            b.positional(1, "destination", |o| &mut o.dst);
        }
    }

    let mut set = quiet("sync");
    let handle = set.bind_options::<SyncOptions>();
    set.parse(&args(&["-n", "-jobs", "4", "-window=2m", "a/", "b/"]))
        .unwrap();

    let opts = handle.take();
    assert!(opts.dry_run);
    assert_eq!(opts.jobs, 4);
    assert_eq!(opts.window, Duration::from_secs(120));
    assert_eq!(opts.src, "a/");
    assert_eq!(opts.dst, "b/");
}

#[test]
fn test_error_and_usage_reach_the_sink() {
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Sink(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let sink = Sink(Arc::new(Mutex::new(Vec::new())));
    let mut set = FlagSet::new("tool", ErrorHandling::Continue);
    set.set_output(Box::new(sink.clone()));
    set.define("depth", 0i64, "recursion depth");

    let err = set.parse(&args(&["-nope"])).unwrap_err();
    assert!(matches!(err, ParseError::Undefined(_)));

    let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("flag provided but not defined: -nope"));
    assert!(text.contains("Usage of tool:"));
    assert!(text.contains("-depth value"));
}

#[test]
fn test_help_request_writes_usage_without_error_line() {
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Sink(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let sink = Sink(Arc::new(Mutex::new(Vec::new())));
    let mut set = FlagSet::new("tool", ErrorHandling::Continue);
    set.set_output(Box::new(sink.clone()));
    set.define("depth", 0i64, "recursion depth");

    assert!(matches!(
        set.parse(&args(&["-help"])).unwrap_err(),
        ParseError::Help
    ));
    let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert!(text.starts_with("Usage of tool:"));
}
