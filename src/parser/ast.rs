// Symbol types extracted from Python source files
//
// Only top-level declarations and the methods of top-level classes are
// represented. Symbols are rebuilt on every parse and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Function,
    Method,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declaration found in a source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedSymbol {
    /// Identifier as written
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based line of the `def`/`class` keyword
    pub line: usize,
    /// Enclosing class name, set only for methods
    pub parent: Option<String>,
    /// Cleaned docstring
    pub docstring: Option<String>,
    /// Rendered parameter list and return annotation, `None` for classes
    pub signature: Option<String>,
}

impl ExtractedSymbol {
    /// Create a top-level function symbol
    pub fn function(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Function,
            line,
            parent: None,
            docstring: None,
            signature: Some("()".to_string()),
        }
    }

    /// Create a class symbol
    pub fn class(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Class,
            line,
            parent: None,
            docstring: None,
            signature: None,
        }
    }

    /// Create a method symbol belonging to `parent`
    pub fn method(name: &str, parent: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Method,
            line,
            parent: Some(parent.to_string()),
            docstring: None,
            signature: Some("(self)".to_string()),
        }
    }

    pub fn with_docstring(mut self, docstring: &str) -> Self {
        self.docstring = Some(docstring.to_string());
        self
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    /// First line of the docstring, if any
    pub fn summary(&self) -> Option<&str> {
        self.docstring
            .as_deref()
            .and_then(|d| d.lines().next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Name qualified with the parent class for methods
    pub fn qualified_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }
}

/// Google-style docstring blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocstringSections {
    pub args: Vec<(String, String)>,
    pub returns: Vec<(String, String)>,
    pub raises: Vec<(String, String)>,
}

impl DocstringSections {
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.returns.is_empty() && self.raises.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_constructors() {
        let class = ExtractedSymbol::class("Calculator", 6);
        assert_eq!(class.kind, SymbolKind::Class);
        assert!(class.parent.is_none());
        assert!(class.signature.is_none());

        let method = ExtractedSymbol::method("add", "Calculator", 25);
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent.as_deref(), Some("Calculator"));
        assert_eq!(method.qualified_name(), "Calculator.add");
    }

    #[test]
    fn test_summary_uses_first_line() {
        let sym = ExtractedSymbol::function("divide", 19)
            .with_docstring("Divide a by b.\n\nRaises:\n    ZeroDivisionError: If b is zero.");
        assert_eq!(sym.summary(), Some("Divide a by b."));
    }

    #[test]
    fn test_summary_empty_docstring() {
        let sym = ExtractedSymbol::function("noop", 1).with_docstring("");
        assert_eq!(sym.summary(), None);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SymbolKind::Method).unwrap();
        assert_eq!(json, "\"method\"");
    }
}
