//! Serializable usage model and the default text renderer.
//!
//! The application renders usage from a [`UsageModel`], a plain data
//! snapshot of the command tree and metadata. A replaceable renderer
//! function turns it into text; anything fancier (color, man pages, JSON)
//! can consume the model directly.

use std::fmt;

use cmdtree_flags::FlagInfo;
use serde::{Deserialize, Serialize};

/// Someone who contributed to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// The author's name.
    pub name: String,
    /// The author's email, empty when unknown.
    pub email: String,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

/// Usage data for one routable command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandUsage {
    /// Space-joined path below the application command name.
    pub path: String,
    /// The command's description.
    pub description: String,
    /// Named flags of the command's option-struct handlers.
    pub flags: Vec<FlagInfo>,
}

/// A complete snapshot of everything usage text is rendered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageModel {
    /// Display name, falls back to `cmd_name` when empty.
    pub app_name: String,
    /// The executable command name.
    pub cmd_name: String,
    /// Normalized version string.
    pub version: String,
    /// Application description.
    pub description: String,
    /// Commands with an action, in tree order.
    pub commands: Vec<CommandUsage>,
    /// Named flags of the root's option-struct filters.
    pub global_flags: Vec<FlagInfo>,
    /// Contributing authors.
    pub authors: Vec<Author>,
    /// Copyright line, empty when absent.
    pub copyright: String,
}

/// A function rendering a [`UsageModel`] to text.
pub type UsageRenderer = fn(&UsageModel) -> String;

fn push_flag_lines(out: &mut String, flags: &[FlagInfo], indent: &str) {
    for info in flags {
        out.push_str(indent);
        out.push('-');
        out.push_str(&info.name);
        if !info.switch {
            out.push_str(" value");
        }
        out.push('\n');
        if !info.usage.is_empty() {
            out.push_str(indent);
            out.push_str("  \t");
            out.push_str(&info.usage);
            out.push('\n');
        }
        if !info.default.is_empty() && info.default != "false" {
            out.push_str(indent);
            out.push_str("  \t(default ");
            out.push_str(&info.default);
            out.push_str(")\n");
        }
    }
}

/// The default plain-text renderer.
pub fn render_usage(model: &UsageModel) -> String {
    let mut out = String::new();
    let title = if model.app_name.is_empty() {
        &model.cmd_name
    } else {
        &model.app_name
    };
    out.push_str(title);
    if !model.version.is_empty() {
        out.push_str(" - v");
        out.push_str(&model.version);
    }
    out.push('\n');
    if !model.description.is_empty() {
        out.push('\n');
        out.push_str(&model.description);
        out.push('\n');
    }

    out.push_str("\nUSAGE:\n  ");
    out.push_str(&model.cmd_name);
    if !model.global_flags.is_empty() {
        out.push_str(" [-globaloptions --]");
    }
    if !model.commands.is_empty() {
        out.push_str(" [command] [-commandoptions]");
    }
    out.push('\n');

    if !model.commands.is_empty() {
        out.push_str("\nCOMMANDS:\n");
        for cmd in &model.commands {
            out.push_str("  ");
            out.push_str(&model.cmd_name);
            out.push(' ');
            out.push_str(&cmd.path);
            out.push_str(" # ");
            out.push_str(&cmd.description);
            out.push('\n');
            push_flag_lines(&mut out, &cmd.flags, "    ");
        }
    }

    if !model.global_flags.is_empty() {
        out.push_str("\nGLOBAL OPTIONS:\n");
        push_flag_lines(&mut out, &model.global_flags, "  ");
    }

    if !model.authors.is_empty() {
        if model.authors.len() == 1 {
            out.push_str("\nAUTHOR:\n");
        } else {
            out.push_str("\nAUTHORS:\n");
        }
        for author in &model.authors {
            out.push_str("  ");
            out.push_str(&author.to_string());
            out.push('\n');
        }
    }

    if !model.copyright.is_empty() {
        out.push_str("\nCOPYRIGHT:\n  ");
        out.push_str(&model.copyright);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> UsageModel {
        UsageModel {
            app_name: "Backup Tool".into(),
            cmd_name: "bak".into(),
            version: "1.2.0".into(),
            description: "snapshots and restores".into(),
            commands: vec![CommandUsage {
                path: "snap".into(),
                description: "take a snapshot".into(),
                flags: vec![FlagInfo {
                    name: "full".into(),
                    usage: "full snapshot".into(),
                    default: "false".into(),
                    switch: true,
                }],
            }],
            global_flags: vec![FlagInfo {
                name: "root".into(),
                usage: "repository root".into(),
                default: "/var/backups".into(),
                switch: false,
            }],
            authors: vec![Author {
                name: "ada".into(),
                email: "ada@example.com".into(),
            }],
            copyright: "2026 the authors".into(),
        }
    }

    #[test]
    fn test_renderer_sections() {
        let text = render_usage(&model());
        assert!(text.starts_with("Backup Tool - v1.2.0\n"));
        assert!(text.contains("USAGE:\n  bak [-globaloptions --] [command] [-commandoptions]"));
        assert!(text.contains("bak snap # take a snapshot"));
        assert!(text.contains("-full\n"));
        assert!(text.contains("-root value"));
        assert!(text.contains("(default /var/backups)"));
        assert!(text.contains("AUTHOR:\n  ada <ada@example.com>"));
        assert!(text.contains("COPYRIGHT:\n  2026 the authors"));
    }

    #[test]
    fn test_author_display_without_email() {
        let author = Author {
            name: "grace".into(),
            email: String::new(),
        };
        assert_eq!(author.to_string(), "grace");
    }

    #[test]
    fn test_model_round_trips_through_json() {
        let m = model();
        let json = serde_json::to_string(&m).unwrap();
        let back: UsageModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
