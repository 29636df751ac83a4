//! Default usage rendering for a flag set.
//!
//! Rendering consumes only the serializable [`FlagInfo`](crate::FlagInfo)
//! metadata, so an external renderer can replace this module wholesale by
//! reading [`FlagSet::flags`](crate::FlagSet::flags) and
//! [`FlagSet::positionals`](crate::FlagSet::positionals) itself.

use std::fmt::Write;

use crate::set::FlagInfo;

/// Renders the default usage block: a header line, one line per named flag
/// with its default, then one line per positional entry.
pub fn render_defaults(name: &str, flags: &[FlagInfo], positionals: &[FlagInfo]) -> String {
    let mut out = String::new();
    if name.is_empty() {
        out.push_str("Usage:\n");
    } else {
        let _ = writeln!(out, "Usage of {name}:");
    }
    for info in flags {
        let _ = write!(out, "  -{}", info.name);
        if !info.switch {
            out.push_str(" value");
        }
        out.push('\n');
        if !info.usage.is_empty() {
            let _ = writeln!(out, "    \t{}", info.usage);
        }
        if !info.default.is_empty() && info.default != "false" {
            let _ = writeln!(out, "    \t(default {})", info.default);
        }
    }
    for info in positionals {
        let _ = write!(out, "  {}", info.name);
        if !info.usage.is_empty() {
            let _ = write!(out, "\t{}", info.usage);
        }
        out.push('\n');
    }
    out
}
