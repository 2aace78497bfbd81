// Parser module for extracting symbols from Python source files

pub mod ast;
mod python;

pub use ast::*;
pub use python::{
    clean_docstring, extract_module_docstring, extract_source_symbols, extract_symbols,
    parse_docstring_sections, PythonParser,
};
