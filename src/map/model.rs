// Data model for generated map documents
//
// Sections round-trip through markdown; nothing here is stored anywhere
// else between runs.

use crate::parser::SymbolKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One symbol's documentation record in a map document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub symbol_name: String,
    pub symbol_kind: SymbolKind,
    /// Enclosing class for methods
    pub parent: Option<String>,
    pub line_number: usize,
    pub description: String,
    pub is_placeholder: bool,
}

/// A single generated map document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFile {
    /// Source file, relative to the source root
    pub source_path: PathBuf,
    /// Map document, relative to the map root
    pub map_path: PathBuf,
    pub file_description: String,
    pub file_description_is_placeholder: bool,
    pub sections: Vec<Section>,
}

impl MapFile {
    /// Sections that are classes or top-level functions
    pub fn top_level(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.parent.is_none())
    }

    /// Methods of the named class, in source order
    pub fn methods_of<'a>(&'a self, class_name: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections.iter().filter(move |s| {
            s.symbol_kind == SymbolKind::Method && s.parent.as_deref() == Some(class_name)
        })
    }
}

/// A source symbol lacking a docstring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDocstring {
    /// Relative to the source root
    pub source_path: PathBuf,
    pub line: usize,
    pub symbol_name: String,
}

/// Everything one generation run changed or found lacking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub created_files: Vec<PathBuf>,
    pub updated_files: Vec<PathBuf>,
    /// Module documents whose source no longer exists (left on disk)
    pub deleted_files: Vec<PathBuf>,
    pub new_sections: Vec<(PathBuf, String)>,
    pub removed_sections: Vec<(PathBuf, String)>,
    pub missing_docstrings: Vec<MissingDocstring>,
    /// Documents that still need a hand-written summary
    pub missing_descriptions: Vec<PathBuf>,
}

impl ChangeReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the run created, updated, orphaned or re-sectioned anything
    pub fn has_changes(&self) -> bool {
        !(self.created_files.is_empty()
            && self.updated_files.is_empty()
            && self.deleted_files.is_empty()
            && self.new_sections.is_empty()
            && self.removed_sections.is_empty())
    }
}
