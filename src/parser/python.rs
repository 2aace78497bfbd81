// Python symbol extraction using tree-sitter

use crate::error::{Error, Result};
use crate::parser::ast::*;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tree_sitter::{Node, Parser};

static DOC_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{4}(\w+)(?:\s*\([^)]+\))?:\s*(.*)$").unwrap());

/// Parser for Python source files
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Extract symbols from a file. Missing, non-UTF-8 or unparseable files
    /// yield an empty list.
    pub fn extract_file(&mut self, path: &Path) -> Vec<ExtractedSymbol> {
        match std::fs::read_to_string(path) {
            Ok(source) => self.extract_source(&source),
            Err(e) => {
                tracing::debug!("Skipping {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Extract symbols from Python source text
    pub fn extract_source(&mut self, source: &str) -> Vec<ExtractedSymbol> {
        let Some(tree) = self.parser.parse(source, None) else {
            return Vec::new();
        };
        let root = tree.root_node();
        if root.has_error() {
            return Vec::new();
        }

        let src = source.as_bytes();
        let mut symbols = Vec::new();

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let Some(def) = unwrap_definition(child) else {
                continue;
            };
            match def.kind() {
                "function_definition" => {
                    if let Some(func) = parse_function(&def, src, None) {
                        symbols.push(func);
                    }
                }
                "class_definition" => {
                    if let Some(class) = parse_class(&def, src) {
                        let name = class.name.clone();
                        symbols.push(class);
                        symbols.extend(parse_methods(&def, src, &name));
                    }
                }
                _ => {}
            }
        }

        symbols
    }

    /// Extract the module docstring from a file
    pub fn module_docstring_file(&mut self, path: &Path) -> Option<String> {
        let source = std::fs::read_to_string(path).ok()?;
        self.module_docstring(&source)
    }

    /// Extract the module docstring from Python source text
    pub fn module_docstring(&mut self, source: &str) -> Option<String> {
        let tree = self.parser.parse(source, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }
        body_docstring(&root, source.as_bytes())
    }
}

/// Extract all classes, functions and methods from a Python file
pub fn extract_symbols(path: &Path) -> Vec<ExtractedSymbol> {
    match PythonParser::new() {
        Ok(mut parser) => parser.extract_file(path),
        Err(e) => {
            tracing::warn!("{}", e);
            Vec::new()
        }
    }
}

/// Extract symbols from in-memory Python source
pub fn extract_source_symbols(source: &str) -> Vec<ExtractedSymbol> {
    match PythonParser::new() {
        Ok(mut parser) => parser.extract_source(source),
        Err(e) => {
            tracing::warn!("{}", e);
            Vec::new()
        }
    }
}

/// Extract the module-level docstring of a Python file
pub fn extract_module_docstring(path: &Path) -> Option<String> {
    PythonParser::new().ok()?.module_docstring_file(path)
}

/// Strip a `decorated_definition` down to the definition it wraps
fn unwrap_definition(node: Node) -> Option<Node> {
    match node.kind() {
        "function_definition" | "class_definition" => Some(node),
        "decorated_definition" => node.child_by_field_name("definition"),
        _ => None,
    }
}

fn parse_class(node: &Node, source: &[u8]) -> Option<ExtractedSymbol> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    let mut class = ExtractedSymbol::class(name, node.start_position().row + 1);
    if let Some(body) = node.child_by_field_name("body") {
        class.docstring = body_docstring(&body, source);
    }
    Some(class)
}

/// Methods directly in a class body, in body order
fn parse_methods(class: &Node, source: &[u8], class_name: &str) -> Vec<ExtractedSymbol> {
    let Some(body) = class.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut methods = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if let Some(def) = unwrap_definition(child) {
            if def.kind() == "function_definition" {
                if let Some(method) = parse_function(&def, source, Some(class_name)) {
                    methods.push(method);
                }
            }
        }
    }
    methods
}

fn parse_function(node: &Node, source: &[u8], parent: Option<&str>) -> Option<ExtractedSymbol> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;
    let line = node.start_position().row + 1;

    let mut symbol = match parent {
        Some(class_name) => ExtractedSymbol::method(name, class_name, line),
        None => ExtractedSymbol::function(name, line),
    };
    symbol.signature = Some(format_signature(node, source));
    if let Some(body) = node.child_by_field_name("body") {
        symbol.docstring = body_docstring(&body, source);
    }
    Some(symbol)
}

/// Render `(params) -> ret` from the declaration's source text
fn format_signature(node: &Node, source: &[u8]) -> String {
    let mut parts = Vec::new();
    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            if let Some(part) = format_parameter(&child, source) {
                parts.push(part);
            }
        }
    }

    let mut sig = format!("({})", parts.join(", "));
    if let Some(ret) = node.child_by_field_name("return_type") {
        sig.push_str(" -> ");
        sig.push_str(&node_text(&ret, source));
    }
    sig
}

fn format_parameter(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" | "tuple_pattern" => {
            Some(node_text(node, source))
        }
        "typed_parameter" => {
            let mut cursor = node.walk();
            let target = node
                .named_children(&mut cursor)
                .find(|c| c.kind() != "type" && c.kind() != "comment")?;
            let ty = node.child_by_field_name("type")?;
            Some(format!(
                "{}: {}",
                node_text(&target, source),
                node_text(&ty, source)
            ))
        }
        "default_parameter" => {
            let name = node.child_by_field_name("name")?;
            let value = node.child_by_field_name("value")?;
            Some(format!(
                "{}={}",
                node_text(&name, source),
                node_text(&value, source)
            ))
        }
        "typed_default_parameter" => {
            let name = node.child_by_field_name("name")?;
            let ty = node.child_by_field_name("type")?;
            let value = node.child_by_field_name("value")?;
            Some(format!(
                "{}: {} = {}",
                node_text(&name, source),
                node_text(&ty, source),
                node_text(&value, source)
            ))
        }
        "positional_separator" | "/" => Some("/".to_string()),
        "keyword_separator" | "*" => Some("*".to_string()),
        _ => None,
    }
}

/// Node source text with whitespace runs collapsed to single spaces
fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source)
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Docstring of a module or block: its first statement, if a string literal
fn body_docstring(body: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    string_literal_value(literal.utf8_text(source).ok()?).map(|s| clean_docstring(&s))
}

/// Strip prefix and quotes from a string literal. Byte strings and
/// f-strings are not docstrings.
fn string_literal_value(text: &str) -> Option<String> {
    let quote_at = text.find(['"', '\''])?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }

    let body = &text[quote_at..];
    let width = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        3
    } else {
        1
    };
    if body.len() < width * 2 {
        return None;
    }
    let inner = &body[width..body.len() - width];
    if prefix.contains('r') {
        Some(inner.to_string())
    } else {
        Some(unescape(inner))
    }
}

/// Decode the simple escapes; anything else is kept verbatim
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Normalize docstring indentation the way `inspect.cleandoc` does
pub fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.split('\n').collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            cleaned.push(line.trim_start().to_string());
        } else if let Some(rest) = line.get(margin..) {
            cleaned.push(rest.trim_end().to_string());
        } else {
            cleaned.push(line.trim().to_string());
        }
    }

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }
    let start = cleaned
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(cleaned.len());

    cleaned[start..].join("\n")
}

#[derive(Clone, Copy, PartialEq)]
enum DocBlock {
    Args,
    Returns,
    Raises,
}

/// Parse Google-style `Args:`, `Returns:` and `Raises:` blocks
pub fn parse_docstring_sections(docstring: Option<&str>) -> DocstringSections {
    let mut sections = DocstringSections::default();
    let Some(docstring) = docstring else {
        return sections;
    };

    let mut block: Option<DocBlock> = None;
    let mut item: Option<(String, Vec<String>)> = None;

    fn flush(
        sections: &mut DocstringSections,
        block: Option<DocBlock>,
        item: &mut Option<(String, Vec<String>)>,
    ) {
        if let (Some(block), Some((name, desc))) = (block, item.take()) {
            let entry = (name, desc.join(" ").trim().to_string());
            match block {
                DocBlock::Args => sections.args.push(entry),
                DocBlock::Returns => sections.returns.push(entry),
                DocBlock::Raises => sections.raises.push(entry),
            }
        }
    }

    for line in docstring.lines() {
        let stripped = line.trim();
        let header = match stripped {
            "Args:" | "Arguments:" | "Parameters:" => Some(Some(DocBlock::Args)),
            "Returns:" | "Return:" => Some(Some(DocBlock::Returns)),
            "Raises:" | "Raise:" => Some(Some(DocBlock::Raises)),
            _ if stripped.ends_with(':') && !line.starts_with(char::is_whitespace) => Some(None),
            _ => None,
        };
        if let Some(next) = header {
            flush(&mut sections, block, &mut item);
            block = next;
            continue;
        }

        if block.is_none() {
            continue;
        }
        if let Some(caps) = DOC_ITEM.captures(line) {
            flush(&mut sections, block, &mut item);
            let desc = caps[2].trim();
            let lines = if desc.is_empty() {
                Vec::new()
            } else {
                vec![desc.to_string()]
            };
            item = Some((caps[1].to_string(), lines));
        } else if line.starts_with("        ") {
            if let Some((_, desc)) = item.as_mut() {
                desc.push(stripped.to_string());
            }
        }
    }
    flush(&mut sections, block, &mut item);

    sections
}
