use std::sync::LazyLock;

use regex::Regex;

const FENCE: &str = "```";

static FIRST_CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z0-9]*?\n(.*?\n)```").expect("code block pattern compiles")
});

/// Cleans up a raw backend answer: unwraps a response that is one fenced
/// block, optionally narrows to the first fenced block, and normalizes the
/// ending to a single newline.
pub fn finalize(raw: &str, use_first_code_block: bool) -> String {
    let mut text = strip_enclosing_fence(raw).to_string();
    if use_first_code_block {
        if let Some(block) = first_code_block(&text) {
            text = block.to_string();
        }
    }
    ensure_single_trailing_newline(&text)
}

/// Drops the opening and closing fence lines when the whole response is a
/// single fenced block. Removes one layer only.
pub fn strip_enclosing_fence(raw: &str) -> &str {
    let body = raw.trim_end_matches(['\n', '\r']);
    if !body.starts_with(FENCE) || !body.ends_with(FENCE) {
        return raw;
    }
    let (Some(first_break), Some(last_break)) = (body.find('\n'), body.rfind('\n')) else {
        return raw;
    };
    if first_break == last_break {
        return raw;
    }
    &body[first_break + 1..last_break]
}

pub fn first_code_block(text: &str) -> Option<&str> {
    FIRST_CODE_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn ensure_single_trailing_newline(text: &str) -> String {
    let mut out = text.trim_end_matches(['\n', '\r']).to_string();
    out.push('\n');
    out
}
