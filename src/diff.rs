use std::fmt::Write as _;

use crossterm::style::Stylize;
use similar::{Algorithm, ChangeTag, TextDiff};

pub const DIFF_CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct DiffStyle {
    pub context: usize,
    pub colorize: bool,
}

impl Default for DiffStyle {
    fn default() -> Self {
        Self {
            context: DIFF_CONTEXT,
            colorize: false,
        }
    }
}

/// Renders the diff block shown after a shaped result: a header with both
/// sizes in bytes, line hunks with changed spans emphasized, and a footer.
pub fn render_diff_block(old: &str, new: &str, style: DiffStyle) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n====begin of diff==== in size: {}, out size: {}",
        old.len(),
        new.len()
    );
    out.push_str(&render_hunks(old, new, style));
    out.push_str("====end of diff====\n");
    out
}

/// Line-level alignment first, then character-level emphasis inside
/// changed lines.
pub fn render_hunks(old: &str, new: &str, style: DiffStyle) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old, new);
    let mut out = String::new();

    for (idx, group) in diff.grouped_ops(style.context).iter().enumerate() {
        if idx > 0 {
            out.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_inline_changes(op) {
                let (sign, tag) = match change.tag() {
                    ChangeTag::Delete => ("- ", ChangeTag::Delete),
                    ChangeTag::Insert => ("+ ", ChangeTag::Insert),
                    ChangeTag::Equal => ("  ", ChangeTag::Equal),
                };
                out.push_str(&paint(sign, tag, false, style.colorize));
                for (emphasized, value) in change.iter_strings_lossy() {
                    out.push_str(&paint(&value, tag, emphasized, style.colorize));
                }
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
    }
    out
}

fn paint(text: &str, tag: ChangeTag, emphasized: bool, colorize: bool) -> String {
    if !colorize {
        return match (tag, emphasized) {
            (ChangeTag::Delete, true) => format!("[-{text}-]"),
            (ChangeTag::Insert, true) => format!("{{+{text}+}}"),
            _ => text.to_string(),
        };
    }
    // Keep the newline outside the styled span so resets land before it.
    let (body, newline) = match text.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (text, ""),
    };
    let styled = match (tag, emphasized) {
        (ChangeTag::Delete, true) => body.red().bold().underlined().to_string(),
        (ChangeTag::Delete, false) => body.red().to_string(),
        (ChangeTag::Insert, true) => body.green().bold().underlined().to_string(),
        (ChangeTag::Insert, false) => body.green().to_string(),
        (ChangeTag::Equal, _) => body.to_string(),
    };
    format!("{styled}{newline}")
}
