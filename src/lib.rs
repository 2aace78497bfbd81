//! Codemap - Markdown code maps for Python codebases
//!
//! Extracts classes, functions and methods from Python sources, renders
//! them into per-module markdown documents that keep hand-written
//! descriptions across regenerations, and validates the links in a map
//! against the live source.

pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod map;
pub mod output;
pub mod parser;
pub mod validate;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use generate::{generate_maps, Generator, GeneratorConfig};
pub use map::{ChangeReport, MapFile, MissingDocstring, Section};
pub use parser::{extract_module_docstring, extract_symbols, ExtractedSymbol, SymbolKind};
pub use validate::{validate_map, ErrorType, ValidationError, Validator};
