// Parse previously generated map documents and merge them with fresh symbols
//
// The markdown itself is the persisted state: descriptions written by hand
// into a map document are read back here and carried into the next render.

use crate::error::Result;
use crate::map::model::{MapFile, Section};
use crate::output::{is_placeholder, make_placeholder};
use crate::parser::{ExtractedSymbol, SymbolKind};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

/// `### [`symbol`](path#L42)` with optional trailing text
static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^###\s+\[`([^`]+)`\]\([^)]+#L(\d+)\)").unwrap());

/// `- [`method`](path#L42) `(sig)`: description`, signature optional
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s+\[`([^`]+)`\]\([^)]+#L(\d+)\)(?:\s+`[^`]*`)?:\s*(.*)$").unwrap()
});

/// `| [`symbol`](path#L42) | description |`
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|\s*\[`([^`]+)`\]\([^)]+#L(\d+)\)\s*\|\s*(.+?)\s*\|$").unwrap()
});

/// A section read back from an existing map document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    pub symbol_name: String,
    pub line_number: usize,
    pub description: String,
    pub is_placeholder: bool,
}

impl ParsedSection {
    fn new(name: &str, line: &str, description: String) -> Self {
        Self {
            symbol_name: name.to_string(),
            line_number: line.parse().unwrap_or(0),
            is_placeholder: is_placeholder(&description),
            description,
        }
    }
}

/// Content recovered from an existing map document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMapFile {
    pub file_description: String,
    pub file_description_is_placeholder: bool,
    /// Keyed by qualified name (`Class.method` for methods); a repeated key
    /// keeps its last occurrence
    pub sections: BTreeMap<String, ParsedSection>,
}

/// Result of merging an existing document with current symbols
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub map_file: MapFile,
    /// Documented before, gone from source (sorted)
    pub removed: Vec<String>,
    /// In source, not documented before (sorted)
    pub added: Vec<String>,
}

/// Parse an existing map document. Returns `None` if it does not exist.
pub fn parse_existing_map(path: &Path) -> Result<Option<ParsedMapFile>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse_map_content(&content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse map document text
pub fn parse_map_content(content: &str) -> ParsedMapFile {
    let lines: Vec<&str> = content.split('\n').collect();

    let file_description = lines
        .iter()
        .skip_while(|l| !l.starts_with("# "))
        .skip(1)
        .take_while(|l| !l.starts_with("## "))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    let mut sections = BTreeMap::new();
    let mut current: Option<OpenSection> = None;
    let mut in_classes = false;
    let mut owner: Option<String> = None;

    for &line in &lines {
        if let Some(caps) = SECTION_HEADER.captures(line) {
            close(&mut current, &mut sections);
            owner = in_classes.then(|| caps[1].to_string());
            current = Some((caps[1].to_string(), caps[2].to_string(), Vec::new()));
            continue;
        }

        if let Some(caps) = LIST_ITEM.captures(line) {
            let section = ParsedSection::new(&caps[1], &caps[2], caps[3].trim().to_string());
            let key = match &owner {
                Some(class) => format!("{}.{}", class, section.symbol_name),
                None => section.symbol_name.clone(),
            };
            sections.insert(key, section);
            continue;
        }

        if let Some(caps) = TABLE_ROW.captures(line) {
            let section = ParsedSection::new(&caps[1], &caps[2], caps[3].trim().to_string());
            sections.insert(section.symbol_name.clone(), section);
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ") {
            in_classes = heading.trim() == "Classes";
            owner = None;
        }
        if line.starts_with('#') || line.starts_with("**") {
            close(&mut current, &mut sections);
            continue;
        }

        if let Some((_, _, desc)) = current.as_mut() {
            desc.push(line);
        }
    }
    close(&mut current, &mut sections);

    ParsedMapFile {
        file_description_is_placeholder: is_placeholder(&file_description),
        file_description,
        sections,
    }
}

/// Heading section still collecting description lines: name, line, text
type OpenSection<'a> = (String, String, Vec<&'a str>);

fn close(current: &mut Option<OpenSection>, sections: &mut BTreeMap<String, ParsedSection>) {
    if let Some((name, line, desc)) = current.take() {
        let description = desc.join("\n").trim().to_string();
        sections.insert(name.clone(), ParsedSection::new(&name, &line, description));
    }
}

/// Placeholder hint for a symbol without a docstring
fn docstring_hint(symbol: &ExtractedSymbol) -> String {
    match (symbol.kind, &symbol.parent) {
        (SymbolKind::Class, _) => format!("Add docstring to class {}", symbol.name),
        (SymbolKind::Method, Some(parent)) => {
            format!("Add docstring to {}.{}", parent, symbol.name)
        }
        _ => format!("Add docstring to {}", symbol.name),
    }
}

/// Merge an existing document with the symbols currently in source.
///
/// Descriptions come from the docstring summary when there is one, then
/// from hand-written text in the existing document, and otherwise become a
/// placeholder. Line numbers always follow the source.
pub fn merge_maps(
    existing: Option<&ParsedMapFile>,
    symbols: &[ExtractedSymbol],
    source_path: &Path,
    map_path: &Path,
    module_docstring: Option<&str>,
) -> MergeOutcome {
    // A document without qualified keys is matched by bare name
    let legacy = existing.is_some_and(|e| e.sections.keys().all(|k| !k.contains('.')));
    let previous = |symbol: &ExtractedSymbol| {
        let sections = &existing?.sections;
        sections
            .get(&symbol.qualified_name())
            .or_else(|| legacy.then(|| sections.get(&symbol.name)).flatten())
            .filter(|s| !s.is_placeholder)
            .map(|s| s.description.clone())
    };

    let sections: Vec<Section> = symbols
        .iter()
        .map(|symbol| {
            let (description, placeholder) = match symbol.summary() {
                Some(summary) => (summary.to_string(), false),
                None => match previous(symbol) {
                    Some(prior) => (prior, false),
                    None => (make_placeholder(&docstring_hint(symbol)), true),
                },
            };
            Section {
                symbol_name: symbol.name.clone(),
                symbol_kind: symbol.kind,
                parent: symbol.parent.clone(),
                line_number: symbol.line,
                description,
                is_placeholder: placeholder,
            }
        })
        .collect();

    let module_summary = module_docstring
        .and_then(|d| d.lines().next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let prior_description =
        existing.filter(|e| !e.file_description_is_placeholder && !e.file_description.is_empty());
    let (file_description, file_description_is_placeholder) = match module_summary {
        Some(summary) => (summary.to_string(), false),
        None => match prior_description {
            Some(e) => (e.file_description.clone(), false),
            None => {
                let file_name = source_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (make_placeholder(&format!("Add module docstring to {}", file_name)), true)
            }
        },
    };

    let current: BTreeSet<String> = symbols.iter().map(ExtractedSymbol::qualified_name).collect();
    let before: BTreeSet<String> = existing
        .map(|e| e.sections.keys().cloned().collect())
        .unwrap_or_default();

    MergeOutcome {
        map_file: MapFile {
            source_path: source_path.to_path_buf(),
            map_path: map_path.to_path_buf(),
            file_description,
            file_description_is_placeholder,
            sections,
        },
        removed: before.difference(&current).cloned().collect(),
        added: current.difference(&before).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const EXISTING: &str = "\
# operations

Hand-written module summary.

## Overview

| Field | Value |
|-------|-------|
| Source | [operations.py](../../src/operations.py) |

## Classes

### [`Calculator`](../../src/operations.py#L6)

Keeps a running total.

**Methods:**

- [`add`](../../src/operations.py#L9) `(self, x: float) -> float`: Adds to the total.
- [`clear`](../../src/operations.py#L14): <!-- TODO: Add docstring to Calculator.clear -->

## Functions

### [`divide`](../../src/operations.py#L20) `(a, b)`

Divides a by b,
rounding toward zero.

**Parameters:**

| Name | Description |
|------|-------------|
| a | Numerator. |

### [`modulo`](../../src/operations.py#L30)

<!-- TODO: Add docstring to modulo -->

| [`power`](../../src/operations.py#L40) | Raises to a power. |
";

    #[test]
    fn test_parse_file_description() {
        let parsed = parse_map_content(EXISTING);
        assert_eq!(parsed.file_description, "Hand-written module summary.");
        assert!(!parsed.file_description_is_placeholder);
    }

    #[test]
    fn test_parse_all_section_shapes() {
        let parsed = parse_map_content(EXISTING);
        let names: Vec<_> = parsed.sections.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["Calculator", "Calculator.add", "Calculator.clear", "divide", "modulo", "power"]
        );

        assert_eq!(parsed.sections["Calculator"].description, "Keeps a running total.");
        assert_eq!(parsed.sections["Calculator"].line_number, 6);
        assert_eq!(parsed.sections["Calculator.add"].symbol_name, "add");
        assert_eq!(parsed.sections["Calculator.add"].description, "Adds to the total.");
        assert_eq!(parsed.sections["Calculator.add"].line_number, 9);
        assert!(parsed.sections["Calculator.clear"].is_placeholder);
        assert_eq!(
            parsed.sections["divide"].description,
            "Divides a by b,\nrounding toward zero."
        );
        assert!(parsed.sections["modulo"].is_placeholder);
        assert_eq!(parsed.sections["power"].description, "Raises to a power.");
        assert_eq!(parsed.sections["power"].line_number, 40);
    }

    #[test]
    fn test_repeated_name_last_wins() {
        let content = "# m\n\n- [`run`](a.py#L1): first\n- [`run`](a.py#L9): second\n";
        let parsed = parse_map_content(content);
        assert_eq!(parsed.sections["run"].description, "second");
        assert_eq!(parsed.sections["run"].line_number, 9);
    }

    #[test]
    fn test_parse_placeholder_file_description() {
        let parsed =
            parse_map_content("# m\n\n<!-- TODO: Add module docstring to m.py -->\n\n## Overview\n");
        assert!(parsed.file_description_is_placeholder);
        assert!(parsed.sections.is_empty());
    }

    #[test]
    fn test_parse_existing_missing_file() {
        assert_eq!(parse_existing_map(Path::new("/nonexistent/map.md")).unwrap(), None);
    }

    fn symbols() -> Vec<ExtractedSymbol> {
        vec![
            ExtractedSymbol::function("add", 4).with_docstring("Add two numbers."),
            ExtractedSymbol::function("divide", 19),
        ]
    }

    #[test]
    fn test_merge_first_run() {
        let outcome = merge_maps(
            None,
            &symbols(),
            Path::new("operations.py"),
            Path::new("modules/calc/operations.md"),
            Some("Basic arithmetic operations."),
        );

        let sections = &outcome.map_file.sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].description, "Add two numbers.");
        assert!(!sections[0].is_placeholder);
        assert_eq!(sections[1].description, "<!-- TODO: Add docstring to divide -->");
        assert!(sections[1].is_placeholder);
        assert_eq!(outcome.map_file.file_description, "Basic arithmetic operations.");
        assert_eq!(outcome.added, vec!["add".to_string(), "divide".to_string()]);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_merge_preserves_hand_written_and_updates_lines() {
        let existing = parse_map_content(EXISTING);
        let current = vec![
            ExtractedSymbol::function("divide", 27),
            ExtractedSymbol::function("modulo", 35),
            ExtractedSymbol::function("negate", 40),
        ];
        let outcome = merge_maps(
            Some(&existing),
            &current,
            Path::new("operations.py"),
            Path::new("modules/src/operations.md"),
            None,
        );

        let sections = &outcome.map_file.sections;
        assert_eq!(sections[0].description, "Divides a by b,\nrounding toward zero.");
        assert_eq!(sections[0].line_number, 27);
        assert!(!sections[0].is_placeholder);
        assert!(sections[1].is_placeholder);
        assert!(sections[2].is_placeholder);
        assert_eq!(outcome.map_file.file_description, "Hand-written module summary.");
        assert_eq!(outcome.added, vec!["negate".to_string()]);
        assert_eq!(
            outcome.removed,
            vec![
                "Calculator".to_string(),
                "Calculator.add".to_string(),
                "Calculator.clear".to_string(),
                "power".to_string()
            ]
        );
    }

    #[test]
    fn test_merge_docstring_replaces_placeholder() {
        let existing = parse_map_content(
            "# m\n\n## Functions\n\n### [`divide`](m.py#L3)\n\n<!-- TODO: Add docstring to divide -->\n",
        );
        let current = vec![ExtractedSymbol::function("divide", 3).with_docstring("Divide a by b.")];
        let outcome =
            merge_maps(Some(&existing), &current, Path::new("m.py"), Path::new("m.md"), None);
        assert_eq!(outcome.map_file.sections[0].description, "Divide a by b.");
        assert!(!outcome.map_file.sections[0].is_placeholder);
        assert!(outcome.added.is_empty());
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_merge_method_hints_and_parent() {
        let current = vec![
            ExtractedSymbol::class("Calculator", 1),
            ExtractedSymbol::method("clear", "Calculator", 3),
        ];
        let outcome =
            merge_maps(None, &current, Path::new("core.py"), &PathBuf::from("core.md"), None);
        let sections = &outcome.map_file.sections;
        assert_eq!(sections[0].description, "<!-- TODO: Add docstring to class Calculator -->");
        assert_eq!(sections[1].description, "<!-- TODO: Add docstring to Calculator.clear -->");
        assert_eq!(sections[1].parent.as_deref(), Some("Calculator"));
        assert_eq!(
            outcome.map_file.file_description,
            "<!-- TODO: Add module docstring to core.py -->"
        );
        assert!(outcome.map_file.file_description_is_placeholder);
    }

    const SHAPES: &str = "\
# shapes

## Classes

### [`Circle`](shapes.py#L1)

A circle.

**Methods:**

- [`area`](shapes.py#L3) `(self)`: Pi r squared.

### [`Square`](shapes.py#L6)

A square.

**Methods:**

- [`area`](shapes.py#L8) `(self)`: Side squared.

## Functions

### [`area`](shapes.py#L11)

Area of anything.
";

    fn shape_symbols() -> Vec<ExtractedSymbol> {
        vec![
            ExtractedSymbol::class("Circle", 1).with_docstring("A circle."),
            ExtractedSymbol::method("area", "Circle", 3),
            ExtractedSymbol::class("Square", 6).with_docstring("A square."),
            ExtractedSymbol::method("area", "Square", 8),
            ExtractedSymbol::function("area", 11),
        ]
    }

    #[test]
    fn test_parse_keys_methods_by_class() {
        let parsed = parse_map_content(SHAPES);
        assert_eq!(parsed.sections["Circle.area"].description, "Pi r squared.");
        assert_eq!(parsed.sections["Square.area"].description, "Side squared.");
        assert_eq!(parsed.sections["area"].description, "Area of anything.");
    }

    #[test]
    fn test_merge_keeps_same_named_methods_apart() {
        let existing = parse_map_content(SHAPES);
        let outcome = merge_maps(
            Some(&existing),
            &shape_symbols(),
            Path::new("shapes.py"),
            Path::new("shapes.md"),
            None,
        );

        let descriptions: Vec<_> = outcome
            .map_file
            .sections
            .iter()
            .map(|s| s.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            vec!["A circle.", "Pi r squared.", "A square.", "Side squared.", "Area of anything."]
        );
        assert!(outcome.added.is_empty());
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_merge_reports_method_removed_from_one_class() {
        let existing = parse_map_content(SHAPES);
        let mut current = shape_symbols();
        current.remove(3);
        let outcome = merge_maps(
            Some(&existing),
            &current,
            Path::new("shapes.py"),
            Path::new("shapes.md"),
            None,
        );
        assert_eq!(outcome.removed, vec!["Square.area".to_string()]);
        assert!(outcome.added.is_empty());
    }

    #[test]
    fn test_merge_legacy_bare_method_names() {
        let existing = parse_map_content("# m\n\n- [`clear`](m.py#L3): Resets the total.\n");
        let current = vec![
            ExtractedSymbol::class("Calculator", 1).with_docstring("Adds up."),
            ExtractedSymbol::method("clear", "Calculator", 3),
        ];
        let outcome =
            merge_maps(Some(&existing), &current, Path::new("m.py"), Path::new("m.md"), None);
        assert_eq!(outcome.map_file.sections[1].description, "Resets the total.");
    }
}
