//! The extended flag set: named flags, indexed positionals, and the
//! token-scanning algorithm.
//!
//! A [`FlagSet`] owns a table of named flags and an independent table of
//! positional entries keyed by zero-based index. [`FlagSet::parse`]
//! classifies each token as named flag, terminator, or positional, honoring
//! the configured [`ErrorHandling`] policy and the independent
//! tolerate-undefined bit.
//!
//! Flag sets are meant to be created fresh per parse; positional and actual
//! state never leaks between two argument lists.
//!
//! # Examples
//!
//! ```
//! use cmdtree_flags::{ErrorHandling, FlagSet};
//!
//! let mut set = FlagSet::new("copy", ErrorHandling::Continue);
//! let verbose = set.define("v", false, "verbose output");
//! let src = set.define_positional(0, String::new(), "source path");
//!
//! let args: Vec<String> = ["copy", "-v", "in.txt", "out.txt"]
//!     .iter().map(|s| s.to_string()).collect();
//! set.parse(&args).unwrap();
//!
//! assert!(verbose.get());
//! assert_eq!(src.get(), "in.txt");
//! assert_eq!(set.next_args(), ["out.txt"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use std::process;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ParseError, ValueError};
use crate::usage;
use crate::value::{Cell, FlagValue, Slot};

/// How [`FlagSet::parse`] behaves when the parse fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Return a descriptive error (the default).
    #[default]
    Continue,
    /// Write the error and usage, then terminate the process with exit
    /// status 2.
    Exit,
    /// Panic with the descriptive error.
    Panic,
}

/// Serializable metadata for one registered flag or positional entry.
///
/// This is the structured data an external usage renderer consumes; the
/// default renderer in [`usage`](crate::usage) takes a list of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagInfo {
    /// Flag name without dashes, or `arg[N]` for a positional entry.
    pub name: String,
    /// Usage text supplied at registration.
    pub usage: String,
    /// Default value rendered as text at registration time.
    pub default: String,
    /// Whether the bound type is boolean-like (valueless form allowed).
    pub switch: bool,
}

/// One registered entry: metadata plus the erased storage cell.
struct Formal {
    info: FlagInfo,
    cell: Box<dyn Cell>,
}

/// A set of defined named flags and positional entries.
///
/// See the [module documentation](self) for the parse algorithm.
pub struct FlagSet {
    name: String,
    handling: ErrorHandling,
    ignore_undefined: bool,
    terminated: bool,
    formal: BTreeMap<String, Formal>,
    actual: BTreeSet<String>,
    positional: BTreeMap<usize, Formal>,
    positional_actual: BTreeSet<usize>,
    next: Vec<String>,
    deferred_len: usize,
    output: Option<Box<dyn Write>>,
}

/// Classification of a single token under the flag grammar.
enum Token<'a> {
    /// Not flag-like: shorter than two characters or no leading dash.
    Bare,
    /// The literal `--`.
    Terminator,
    /// A flag name, possibly with an inline `=value`.
    Flag {
        name: &'a str,
        inline: Option<&'a str>,
    },
}

/// Applies the token grammar to one token. A token is a flag if it starts
/// with `-` and has length >= 2; a second dash widens the prefix; `--` alone
/// terminates; an inline value follows the first `=` past position 0.
fn classify(token: &str) -> Result<Token<'_>, ParseError> {
    if token.len() < 2 || !token.starts_with('-') {
        return Ok(Token::Bare);
    }
    if token == "--" {
        return Ok(Token::Terminator);
    }
    let dashes = if token.as_bytes()[1] == b'-' { 2 } else { 1 };
    let name = &token[dashes..];
    if name.is_empty() || name.starts_with('-') || name.starts_with('=') {
        return Err(ParseError::BadSyntax(token.to_string()));
    }
    // Equals cannot be first; split at the first one after it.
    let eq = name
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '=')
        .map(|(i, _)| i);
    match eq {
        Some(i) => Ok(Token::Flag {
            name: &name[..i],
            inline: Some(&name[i + 1..]),
        }),
        None => Ok(Token::Flag { name, inline: None }),
    }
}

impl FlagSet {
    /// Creates an empty flag set with the given name and error-handling
    /// policy. The name is used for invoked-path stripping and in usage
    /// output.
    pub fn new(name: impl Into<String>, handling: ErrorHandling) -> Self {
        Self {
            name: name.into(),
            handling,
            ignore_undefined: false,
            terminated: false,
            formal: BTreeMap::new(),
            actual: BTreeSet::new(),
            positional: BTreeMap::new(),
            positional_actual: BTreeSet::new(),
            next: Vec::new(),
            deferred_len: 0,
            output: None,
        }
    }

    /// The flag set's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured error-handling policy.
    pub fn error_handling(&self) -> ErrorHandling {
        self.handling
    }

    /// Enables or disables tolerance of undefined named flags. When enabled,
    /// recognized flags are pulled to the front of the list before the named
    /// scan and everything else is deferred; the positional walk also skips
    /// unmatched indices instead of stopping.
    pub fn set_ignore_undefined(&mut self, on: bool) {
        self.ignore_undefined = on;
    }

    /// Whether undefined named flags are tolerated.
    pub fn ignores_undefined(&self) -> bool {
        self.ignore_undefined
    }

    /// Whether a terminator has been observed during this parse.
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Redirects error and usage output. Defaults to standard error.
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.output = Some(out);
    }

    /// Defines a named flag with a default value and usage text, returning
    /// the storage handle.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty, begins with `-` or `=`, or is already
    /// registered. These are configuration faults meant to be caught during
    /// development.
    pub fn define<V: FlagValue>(&mut self, name: &str, default: V, usage: &str) -> Slot<V> {
        let slot = Slot::new(default);
        self.define_cell(name, usage, Box::new(slot.clone()));
        slot
    }

    /// Defines a positional entry at the given zero-based index, returning
    /// the storage handle. Indices need not be contiguous.
    ///
    /// # Panics
    ///
    /// Panics if the index is already registered.
    pub fn define_positional<V: FlagValue>(
        &mut self,
        index: usize,
        default: V,
        usage: &str,
    ) -> Slot<V> {
        let slot = Slot::new(default);
        self.define_positional_cell(index, usage, Box::new(slot.clone()));
        slot
    }

    pub(crate) fn define_cell(&mut self, name: &str, usage: &str, cell: Box<dyn Cell>) {
        if name.is_empty() || name.starts_with('-') || name.starts_with('=') {
            panic!("invalid flag name: {name:?}");
        }
        if self.formal.contains_key(name) {
            panic!("{} flag redefined: {name}", self.name);
        }
        let info = FlagInfo {
            name: name.to_string(),
            usage: usage.to_string(),
            default: cell.render(),
            switch: cell.is_switch(),
        };
        self.formal.insert(name.to_string(), Formal { info, cell });
    }

    pub(crate) fn define_positional_cell(&mut self, index: usize, usage: &str, cell: Box<dyn Cell>) {
        if self.positional.contains_key(&index) {
            panic!("{} positional redefined: {index}", self.name);
        }
        let info = FlagInfo {
            name: format!("arg[{index}]"),
            usage: usage.to_string(),
            default: cell.render(),
            switch: cell.is_switch(),
        };
        self.positional.insert(index, Formal { info, cell });
    }

    /// Metadata for every named flag, in name order.
    pub fn flags(&self) -> Vec<FlagInfo> {
        self.formal.values().map(|f| f.info.clone()).collect()
    }

    /// Metadata for every positional entry, in index order.
    pub fn positionals(&self) -> Vec<FlagInfo> {
        self.positional.values().map(|f| f.info.clone()).collect()
    }

    /// Looks up a named flag's metadata.
    pub fn lookup(&self, name: &str) -> Option<&FlagInfo> {
        self.formal.get(name).map(|f| &f.info)
    }

    /// Whether the named flag was populated by the last parse.
    pub fn seen(&self, name: &str) -> bool {
        self.actual.contains(name)
    }

    /// Whether the positional entry at `index` was populated by the last
    /// parse.
    pub fn positional_seen(&self, index: usize) -> bool {
        self.positional_actual.contains(&index)
    }

    /// The argument tail not consumed as a positional, used to delegate to
    /// a nested parse. After a terminator, everything past `--` untouched.
    pub fn next_args(&self) -> &[String] {
        &self.next
    }

    /// The leading portion of [`next_args`](Self::next_args) the tolerant
    /// pre-scan deferred: unrecognized flag tokens and their value tokens,
    /// kept verbatim for another parse level. Tokens past this prefix are
    /// genuinely positional, so routing code resolves a command name from
    /// the tail rather than the raw remainder.
    pub fn deferred_args(&self) -> &[String] {
        &self.next[..self.deferred_len]
    }

    /// Parses the argument list.
    ///
    /// The first token is stripped when it is bare and names this set (the
    /// invoked-path convention). With the tolerate-undefined bit set,
    /// recognized flags are pulled ahead of unrecognized ones so defined
    /// flags parse successfully even when interleaved with flags destined
    /// for another parse level. Remaining non-flag tokens bind to positional
    /// entries in index order.
    pub fn parse(&mut self, arguments: &[String]) -> Result<(), ParseError> {
        let start = self.invoked_path_len(arguments);
        let mut list: Vec<String> = arguments[start..].to_vec();
        debug!(set = %self.name, tokens = list.len(), "parsing argument list");
        let mut deferred: Vec<String> = Vec::new();
        if self.ignore_undefined {
            (list, deferred) = self.tidy(list)?;
        }
        let rest = self.scan_named(list)?;
        if self.terminated {
            self.deferred_len = deferred.len();
            deferred.extend(rest);
            self.next = deferred;
            return Ok(());
        }
        self.bind_positionals(rest, deferred)
    }

    /// Number of leading tokens to skip as the invoked path: one when the
    /// head is bare and equals the set name exactly or as a file-name
    /// basename.
    fn invoked_path_len(&self, arguments: &[String]) -> usize {
        if self.name.is_empty() {
            return 0;
        }
        match arguments.first() {
            Some(head) if !head.starts_with('-') => {
                let base = Path::new(head).file_name().map(|f| f.to_string_lossy());
                if head == &self.name || base.as_deref() == Some(self.name.as_str()) {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    /// The tolerate-undefined pre-scan. Pulls tokens recognized as defined
    /// named flags into a front list; unrecognized flags and their greedily
    /// scanned value tokens are deferred verbatim, destined for the
    /// remainder. Deferred tokens never occupy positional indices, so the
    /// scan list is reassembled as `recognized ++ ["--" if terminated] ++
    /// tail` and the deferred list is returned separately. Collection stops
    /// at the first bare token (it may belong to a delegated subcommand) or
    /// at a terminator.
    fn tidy(&mut self, list: Vec<String>) -> Result<(Vec<String>, Vec<String>), ParseError> {
        let mut recognized: Vec<String> = Vec::new();
        let mut deferred: Vec<String> = Vec::new();
        let mut terminated = false;
        let mut i = 0;
        while i < list.len() {
            let (defined, inline, switch) = match classify(&list[i]) {
                Err(err) => return self.fail(err),
                Ok(Token::Bare) => break,
                Ok(Token::Terminator) => {
                    terminated = true;
                    i += 1;
                    break;
                }
                Ok(Token::Flag { name, inline }) => match self.formal.get(name) {
                    Some(f) => (true, inline.is_some(), f.info.switch),
                    None => (false, inline.is_some(), false),
                },
            };
            let sink = if defined {
                &mut recognized
            } else {
                &mut deferred
            };
            sink.push(list[i].clone());
            i += 1;
            // A defined switch never steals the next token; an undefined
            // flag's type is unknown, so its value is scanned greedily and
            // kept verbatim alongside it. Same value predicate as the named
            // scan: a leading dash disqualifies a token as a value.
            let wants_value = !inline && (!defined || !switch);
            if wants_value {
                if let Some(next_tok) = list.get(i) {
                    if !next_tok.starts_with('-') {
                        sink.push(next_tok.clone());
                        i += 1;
                    }
                }
            }
        }
        let mut out = recognized;
        if terminated {
            out.push("--".to_string());
        }
        out.extend(list[i..].iter().cloned());
        Ok((out, deferred))
    }

    /// The named-flag scan. Returns the tokens left after the last consumed
    /// flag; sets the terminated bit when `--` is reached.
    fn scan_named(&mut self, list: Vec<String>) -> Result<Vec<String>, ParseError> {
        let mut i = 0;
        while i < list.len() {
            let (name, inline) = match classify(&list[i]) {
                Err(err) => return self.fail(err),
                Ok(Token::Bare) => break,
                Ok(Token::Terminator) => {
                    self.terminated = true;
                    i += 1;
                    break;
                }
                Ok(Token::Flag { name, inline }) => {
                    (name.to_string(), inline.map(|v| v.to_string()))
                }
            };
            let Some(formal) = self.formal.get(&name) else {
                if self.ignore_undefined {
                    break;
                }
                if name == "h" || name == "help" {
                    return self.fail(ParseError::Help);
                }
                return self.fail(ParseError::Undefined(name));
            };
            let switch = formal.info.switch;
            i += 1;
            let value = match inline {
                Some(v) => v,
                None if switch => "true".to_string(),
                None => match list.get(i) {
                    Some(next_tok) if !next_tok.starts_with('-') => {
                        i += 1;
                        next_tok.clone()
                    }
                    _ => return self.fail(ParseError::MissingValue(name)),
                },
            };
            if let Err(err) = self.formal[&name].cell.set_text(&value) {
                return self.fail(ParseError::InvalidFlag {
                    name,
                    value,
                    source: err,
                });
            }
            self.actual.insert(name);
        }
        Ok(list[i..].to_vec())
    }

    /// Walks the remaining tokens as a zero-indexed positional list. Tokens
    /// deferred by the pre-scan land at the front of the remainder.
    fn bind_positionals(&mut self, rest: Vec<String>, deferred: Vec<String>) -> Result<(), ParseError> {
        let tolerant = self.ignore_undefined;
        self.deferred_len = deferred.len();
        let mut next: Vec<String> = deferred;
        for (k, tok) in rest.iter().enumerate() {
            if tok == "--" {
                if tolerant {
                    self.terminated = true;
                    next.extend(rest[k + 1..].iter().cloned());
                    self.next = next;
                    return Ok(());
                }
                return self.fail(ParseError::TerminatorBeforeValue(k));
            }
            let bound: Option<Result<(), ValueError>> =
                self.positional.get(&k).map(|f| f.cell.set_text(tok));
            match bound {
                Some(Ok(())) => {
                    self.positional_actual.insert(k);
                }
                Some(Err(err)) => {
                    return self.fail(ParseError::InvalidPositional {
                        index: k,
                        value: tok.clone(),
                        source: err,
                    });
                }
                // Not every remaining token is necessarily a positional:
                // it may belong to a delegated subcommand.
                None if tolerant => next.push(tok.clone()),
                None => {
                    next.extend(rest[k..].iter().cloned());
                    self.next = next;
                    return Ok(());
                }
            }
        }
        self.next = next;
        Ok(())
    }

    /// Reports a parse failure to the output sink and applies the
    /// error-handling policy.
    fn fail<T>(&mut self, err: ParseError) -> Result<T, ParseError> {
        let report = match err {
            ParseError::Help => String::new(),
            ref e => format!("{e}\n"),
        };
        let text = format!("{report}{}", self.usage_text());
        match &mut self.output {
            Some(out) => {
                let _ = out.write_all(text.as_bytes());
            }
            None => {
                let _ = std::io::stderr().write_all(text.as_bytes());
            }
        }
        match self.handling {
            ErrorHandling::Continue => Err(err),
            ErrorHandling::Exit => process::exit(2),
            ErrorHandling::Panic => panic!("{err}"),
        }
    }

    /// Renders the default usage text for this set.
    pub fn usage_text(&self) -> String {
        usage::render_defaults(&self.name, &self.flags(), &self.positionals())
    }

    /// Writes the default usage text to the output sink.
    pub fn write_usage(&mut self) {
        let text = self.usage_text();
        match &mut self.output {
            Some(out) => {
                let _ = out.write_all(text.as_bytes());
            }
            None => {
                let _ = std::io::stderr().write_all(text.as_bytes());
            }
        }
    }
}
