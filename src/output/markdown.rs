// Markdown rendering for module documents, placeholders and source links

use crate::error::Result;
use crate::map::{MapFile, Section};
use crate::output::templates::{Slot, Substitutions, Template, TemplateEngine};
use crate::parser::{parse_docstring_sections, ExtractedSymbol, SymbolKind};
use std::path::{Component, Path, PathBuf};

pub const PLACEHOLDER_PREFIX: &str = "<!-- TODO: ";
pub const PLACEHOLDER_SUFFIX: &str = " -->";

/// Wrap a hint in the placeholder sentinel
pub fn make_placeholder(hint: &str) -> String {
    format!("{}{}{}", PLACEHOLDER_PREFIX, hint, PLACEHOLDER_SUFFIX)
}

/// Check if text is an unfilled placeholder
pub fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with(PLACEHOLDER_PREFIX) && trimmed.ends_with(PLACEHOLDER_SUFFIX)
}

/// Check if any line of a document is an unfilled placeholder
pub fn contains_placeholder(text: &str) -> bool {
    text.lines().any(is_placeholder)
}

/// Relative `/`-separated path from the directory of `from_map` to `to_src`
pub fn compute_relative_path(from_map: &Path, to_src: &Path) -> String {
    let from = absolutize(from_map);
    let to = absolutize(to_src);

    let from_dir = from.parent().map(path_parts).unwrap_or_default();
    let to_parts = path_parts(&to);

    let common = from_dir
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(to_parts[common..].iter().cloned());
    parts.join("/")
}

/// Make a path absolute and resolve `.`/`..` without touching the filesystem
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn path_parts(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Prefix(p) => Some(p.as_os_str().to_string_lossy().into_owned()),
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::CurDir => None,
        })
        .collect()
}

/// Inputs for one module document
pub struct ModuleDocument<'a> {
    /// Dotted id, e.g. `calculator.advanced.scientific`
    pub module_id: &'a str,
    /// Relative link from the document to the source file
    pub source_link: &'a str,
    pub map_file: &'a MapFile,
    /// Symbols the sections were merged from, for signatures and docstrings
    pub symbols: &'a [ExtractedSymbol],
}

impl ModuleDocument<'_> {
    fn symbol_for(&self, section: &Section) -> Option<&ExtractedSymbol> {
        self.symbols
            .iter()
            .find(|s| s.name == section.symbol_name && s.parent == section.parent)
    }

    fn link(&self, section: &Section) -> String {
        format!(
            "[`{}`]({}#L{})",
            section.symbol_name, self.source_link, section.line_number
        )
    }
}

/// Render a module document through the module template
pub fn render_module(engine: &TemplateEngine, doc: &ModuleDocument) -> Result<String> {
    let source_name = doc
        .map_file
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let module_name = doc
        .map_file
        .source_path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let subs = Substitutions::new()
        .with(Slot::ModuleName, module_name)
        .with(Slot::ModuleId, doc.module_id)
        .with(Slot::ModuleDescription, doc.map_file.file_description.as_str())
        .with(Slot::SourceName, source_name)
        .with(Slot::SourceLink, doc.source_link)
        .with(Slot::Components, render_components(doc));

    engine.render(Template::Module, &subs)
}

fn render_components(doc: &ModuleDocument) -> String {
    let classes: Vec<&Section> = doc
        .map_file
        .top_level()
        .filter(|s| s.symbol_kind == SymbolKind::Class)
        .collect();
    let functions: Vec<&Section> = doc
        .map_file
        .top_level()
        .filter(|s| s.symbol_kind == SymbolKind::Function)
        .collect();

    let mut lines: Vec<String> = Vec::new();

    if !classes.is_empty() {
        lines.push("## Classes".to_string());
        lines.push(String::new());

        for class in classes {
            lines.push(format!("### {}", doc.link(class)));
            lines.push(String::new());
            lines.push(class.description.clone());
            lines.push(String::new());

            let methods: Vec<&Section> = doc.map_file.methods_of(&class.symbol_name).collect();
            if !methods.is_empty() {
                lines.push("**Methods:**".to_string());
                lines.push(String::new());
                for method in methods {
                    let sig = doc
                        .symbol_for(method)
                        .and_then(|s| s.signature.as_deref())
                        .map(|s| format!(" `{}`", s))
                        .unwrap_or_default();
                    lines.push(format!("- {}{}: {}", doc.link(method), sig, method.description));
                }
                lines.push(String::new());
            }
        }
    }

    if !functions.is_empty() {
        lines.push("## Functions".to_string());
        lines.push(String::new());

        for func in functions {
            let symbol = doc.symbol_for(func);
            let sig = symbol
                .and_then(|s| s.signature.as_deref())
                .map(|s| format!(" `{}`", s))
                .unwrap_or_default();
            lines.push(format!("### {}{}", doc.link(func), sig));
            lines.push(String::new());
            lines.push(func.description.clone());
            lines.push(String::new());
            push_docstring_tables(&mut lines, symbol.and_then(|s| s.docstring.as_deref()));
        }
    }

    lines.join("\n")
}

/// Parameters, returns and raises tables parsed from a docstring
fn push_docstring_tables(lines: &mut Vec<String>, docstring: Option<&str>) {
    let parsed = parse_docstring_sections(docstring);

    let args: Vec<_> = parsed
        .args
        .iter()
        .filter(|(name, _)| name != "self" && name != "cls")
        .collect();
    if !args.is_empty() {
        lines.push("**Parameters:**".to_string());
        lines.push(String::new());
        lines.push("| Name | Description |".to_string());
        lines.push("|------|-------------|".to_string());
        for (name, desc) in args {
            lines.push(format!("| {} | {} |", name, desc));
        }
        lines.push(String::new());
    }

    if let Some((name, desc)) = parsed.returns.first() {
        let text = if desc.is_empty() { name } else { desc };
        lines.push(format!("**Returns:** {}", text));
        lines.push(String::new());
    }

    if !parsed.raises.is_empty() {
        lines.push("**Raises:**".to_string());
        lines.push(String::new());
        lines.push("| Exception | Description |".to_string());
        lines.push("|-----------|-------------|".to_string());
        for (name, desc) in &parsed.raises {
            lines.push(format!("| {} | {} |", name, desc));
        }
        lines.push(String::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(
        name: &str,
        kind: SymbolKind,
        parent: Option<&str>,
        line: usize,
        desc: &str,
    ) -> Section {
        Section {
            symbol_name: name.to_string(),
            symbol_kind: kind,
            parent: parent.map(str::to_string),
            line_number: line,
            description: desc.to_string(),
            is_placeholder: is_placeholder(desc),
        }
    }

    #[test]
    fn test_placeholder_round_trip() {
        let p = make_placeholder("Describe foo");
        assert_eq!(p, "<!-- TODO: Describe foo -->");
        assert!(is_placeholder(&p));
        assert!(is_placeholder(&format!("  {}\n", p)));
        assert!(!is_placeholder("Adds two numbers."));
        assert!(!is_placeholder("<!-- TODO: unterminated"));
        assert!(!is_placeholder("see <!-- TODO: x -->"));
    }

    #[test]
    fn test_contains_placeholder() {
        assert!(contains_placeholder("# Title\n\n<!-- TODO: Describe this project -->\n"));
        assert!(!contains_placeholder("# Title\n\nA real description.\n"));
    }

    #[test]
    fn test_relative_path_up_and_down() {
        let rel = compute_relative_path(
            Path::new("/repo/docs/map/modules/calc/ops.md"),
            Path::new("/repo/src/calc/ops.py"),
        );
        assert_eq!(rel, "../../../../src/calc/ops.py");
    }

    #[test]
    fn test_relative_path_descendant() {
        let rel =
            compute_relative_path(Path::new("/repo/README.md"), Path::new("/repo/src/app.py"));
        assert_eq!(rel, "src/app.py");
    }

    #[test]
    fn test_relative_path_normalizes_dots() {
        let rel = compute_relative_path(
            Path::new("/repo/docs/./map/../map/ARCHITECTURE.md"),
            Path::new("/repo/src/../src/app.py"),
        );
        assert_eq!(rel, "../../src/app.py");
    }

    #[test]
    fn test_relative_path_from_relative_inputs() {
        let rel = compute_relative_path(Path::new("docs/map/a.md"), Path::new("src/b.py"));
        assert_eq!(rel, "../../src/b.py");
    }

    #[test]
    fn test_render_module_document() {
        let symbols = vec![
            ExtractedSymbol::class("Calculator", 6).with_docstring("A simple calculator."),
            ExtractedSymbol::method("add", "Calculator", 9)
                .with_signature("(self, x: float) -> \"Calculator\""),
            ExtractedSymbol::function("divide", 20)
                .with_signature("(a: float, b: float) -> float")
                .with_docstring("Divide a by b.\n\nArgs:\n    a: Numerator.\n    b: Denominator.\n\nRaises:\n    ZeroDivisionError: If b is zero."),
        ];
        let map_file = MapFile {
            source_path: PathBuf::from("ops.py"),
            map_path: PathBuf::from("modules/calc/ops.md"),
            file_description: "Basic arithmetic operations.".to_string(),
            file_description_is_placeholder: false,
            sections: vec![
                section("Calculator", SymbolKind::Class, None, 6, "A simple calculator."),
                section(
                    "add",
                    SymbolKind::Method,
                    Some("Calculator"),
                    9,
                    "<!-- TODO: Add docstring to Calculator.add -->",
                ),
                section("divide", SymbolKind::Function, None, 20, "Divide a by b."),
            ],
        };
        let doc = ModuleDocument {
            module_id: "calc.ops",
            source_link: "../../../src/calc/ops.py",
            map_file: &map_file,
            symbols: &symbols,
        };

        let out = render_module(&TemplateEngine::new(), &doc).unwrap();
        assert!(out.starts_with("# ops\n\nBasic arithmetic operations.\n\n## Overview\n"));
        assert!(out.contains("| Module | `calc.ops` |"));
        assert!(out.contains("| Source | [ops.py](../../../src/calc/ops.py) |"));
        assert!(out.contains(
            "### [`Calculator`](../../../src/calc/ops.py#L6)\n\nA simple calculator.\n\n**Methods:**"
        ));
        assert!(out.contains(
            "- [`add`](../../../src/calc/ops.py#L9) `(self, x: float) -> \"Calculator\"`: <!-- TODO: Add docstring to Calculator.add -->"
        ));
        assert!(out.contains(
            "### [`divide`](../../../src/calc/ops.py#L20) `(a: float, b: float) -> float`\n\nDivide a by b.\n\n**Parameters:**"
        ));
        assert!(out.contains("| b | Denominator. |"));
        assert!(out.contains("| ZeroDivisionError | If b is zero. |"));
        assert!(out.ends_with("|\n"));
    }
}
