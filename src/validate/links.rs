// Markdown link scanning shared by the link checks

use regex::Regex;
use std::sync::LazyLock;

/// `[text](path)` or `[text](path#anchor)`
pub static FILE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)#]+)(?:#[^)]+)?\)").unwrap());

/// `[`symbol`](path.py#L42)`
pub static CODE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[`([^`]+)`\]\(([^)#]+)#L(\d+)\)").unwrap());

/// `[Source](path.py#L42)`
pub static SOURCE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[Source\]\(([^)#]+)#L(\d+)\)").unwrap());

const EXTERNAL_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

/// Lines outside fenced code blocks, with 1-based line numbers. Fence
/// lines themselves are skipped.
pub fn prose_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut in_fence = false;
    content
        .split('\n')
        .enumerate()
        .filter_map(move |(i, line)| {
            if line.trim().starts_with("```") {
                in_fence = !in_fence;
                return None;
            }
            (!in_fence).then_some((i + 1, line))
        })
}

/// True if byte offset `start` of `line` falls inside inline code
pub fn in_inline_code(line: &str, start: usize) -> bool {
    let prefix = &line[..start];
    if prefix.matches("``").count() % 2 == 1 {
        return true;
    }
    prefix.replace("``", "").matches('`').count() % 2 == 1
}

pub fn is_external(path: &str) -> bool {
    EXTERNAL_SCHEMES.iter().any(|scheme| path.starts_with(scheme))
}
