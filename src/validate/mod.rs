// Map validation: structure, links, code anchors and document size
//
// Findings are data, not errors. Each check runs independently and never
// stops the others.

mod links;

use crate::config::{Config, SizeLimits};
use crate::error::{Error, Result};
use crate::parser::{ExtractedSymbol, PythonParser};
use links::{in_inline_code, is_external, prose_lines, CODE_LINK, FILE_LINK, SOURCE_LINK};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default allowed drift, in lines, between a code link and its symbol
pub const DEFAULT_TOLERANCE: usize = 5;

/// Category of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Structure,
    BrokenLink,
    BrokenSymbol,
    SizeLimit,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Structure => "structure",
            ErrorType::BrokenLink => "broken_link",
            ErrorType::BrokenSymbol => "broken_symbol",
            ErrorType::SizeLimit => "size_limit",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found in a map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Relative to the map root
    pub file: PathBuf,
    /// 1-based; 0 for whole-file findings
    pub line: usize,
    pub message: String,
    pub error_type: ErrorType,
}

impl ValidationError {
    fn new(
        file: impl Into<PathBuf>,
        line: usize,
        message: impl Into<String>,
        error_type: ErrorType,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
            error_type,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}", self.file.display(), self.line, self.message)
    }
}

/// The four independent checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Structure,
    FileLinks,
    CodeLinks,
    SizeLimits,
}

impl Check {
    pub const ALL: [Check; 4] = [
        Check::Structure,
        Check::FileLinks,
        Check::CodeLinks,
        Check::SizeLimits,
    ];

    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Check::Structure => "Structure",
            Check::FileLinks => "File links",
            Check::CodeLinks => "Code links",
            Check::SizeLimits => "Size limits",
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: Check,
    /// Number of artifacts, links or documents examined
    pub checked: usize,
    pub errors: Vec<ValidationError>,
}

impl CheckResult {
    fn new(check: Check) -> Self {
        Self {
            check,
            checked: 0,
            errors: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of a full validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.checks.iter().flat_map(|c| c.errors.iter())
    }

    pub fn error_count(&self) -> usize {
        self.checks.iter().map(|c| c.errors.len()).sum()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.checks.into_iter().flat_map(|c| c.errors).collect()
    }
}

/// Validation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    pub tolerance: usize,
    pub limits: SizeLimits,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            limits: SizeLimits::default(),
        }
    }
}

impl From<&Config> for ValidateOptions {
    fn from(config: &Config) -> Self {
        Self {
            tolerance: config.validate.tolerance,
            limits: config.validate.limits,
        }
    }
}

/// Runs all checks over a map directory
pub struct Validator {
    options: ValidateOptions,
}

impl Validator {
    pub fn new(options: ValidateOptions) -> Self {
        Self { options }
    }

    /// Run every check. Fails only if `map_dir` is not a directory.
    pub fn run(&self, map_dir: &Path) -> Result<ValidationReport> {
        if !map_dir.is_dir() {
            return Err(Error::PathNotFound(map_dir.to_path_buf()));
        }

        let documents = MapDocuments::load(map_dir);
        let checks = Check::ALL
            .into_iter()
            .map(|check| {
                let result = match check {
                    Check::Structure => structure(map_dir),
                    Check::FileLinks => file_links(&documents),
                    Check::CodeLinks => code_links(&documents, self.options.tolerance),
                    Check::SizeLimits => size_limits(&documents, &self.options.limits),
                };
                tracing::debug!(
                    "{}: {} checked, {} errors",
                    check.label(),
                    result.checked,
                    result.errors.len()
                );
                result
            })
            .collect();

        Ok(ValidationReport { checks })
    }
}

/// Run every check with default settings and return all findings
pub fn validate_map(map_dir: &Path) -> Vec<ValidationError> {
    let mut errors = check_structure(map_dir);
    errors.extend(check_file_links(map_dir));
    errors.extend(check_code_links(map_dir, DEFAULT_TOLERANCE));
    errors.extend(check_size_limits(map_dir, &SizeLimits::default()));
    errors
}

/// Missing index, architecture document or domain directory
pub fn check_structure(map_dir: &Path) -> Vec<ValidationError> {
    structure(map_dir).errors
}

/// Relative links to files that do not exist
pub fn check_file_links(map_dir: &Path) -> Vec<ValidationError> {
    file_links(&MapDocuments::load(map_dir)).errors
}

/// Code and source links whose target, symbol or line is wrong
pub fn check_code_links(map_dir: &Path, tolerance: usize) -> Vec<ValidationError> {
    code_links(&MapDocuments::load(map_dir), tolerance).errors
}

/// Documents longer than their tier allows
pub fn check_size_limits(map_dir: &Path, limits: &SizeLimits) -> Vec<ValidationError> {
    size_limits(&MapDocuments::load(map_dir), limits).errors
}

/// Markdown documents of a map, read once and kept in sorted order
struct MapDocuments {
    root: PathBuf,
    /// (path relative to root, content)
    docs: Vec<(PathBuf, String)>,
}

impl MapDocuments {
    fn load(root: &Path) -> Self {
        let mut docs = Vec::new();
        if root.is_dir() {
            let entries = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok());
            for entry in entries {
                let path = entry.path();
                let is_markdown = path.extension().is_some_and(|ext| ext == "md");
                if !entry.file_type().is_file() || !is_markdown {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(root) else {
                    continue;
                };
                match std::fs::read_to_string(path) {
                    Ok(content) => docs.push((rel.to_path_buf(), content)),
                    Err(e) => tracing::warn!("Skipping unreadable {}: {}", path.display(), e),
                }
            }
        }
        Self {
            root: root.to_path_buf(),
            docs,
        }
    }

    /// Directory that links in `rel` resolve against
    fn base_dir(&self, rel: &Path) -> PathBuf {
        match rel.parent() {
            Some(parent) => self.root.join(parent),
            None => self.root.clone(),
        }
    }
}

fn structure(map_dir: &Path) -> CheckResult {
    let mut result = CheckResult::new(Check::Structure);
    result.checked = 3;

    if !map_dir.join("README.md").is_file() && !map_dir.join("MAP.md").is_file() {
        result.errors.push(ValidationError::new(
            "README.md",
            0,
            "README.md not found",
            ErrorType::Structure,
        ));
    }
    if !map_dir.join("ARCHITECTURE.md").is_file() {
        result.errors.push(ValidationError::new(
            "ARCHITECTURE.md",
            0,
            "ARCHITECTURE.md not found",
            ErrorType::Structure,
        ));
    }
    if !map_dir.join("domains").is_dir() && !map_dir.join("modules").is_dir() {
        result.errors.push(ValidationError::new(
            "domains",
            0,
            "domains/ directory not found",
            ErrorType::Structure,
        ));
    }

    result
}

fn file_links(documents: &MapDocuments) -> CheckResult {
    let mut result = CheckResult::new(Check::FileLinks);

    for (rel, content) in &documents.docs {
        let base = documents.base_dir(rel);
        for (line_num, line) in prose_lines(content) {
            for caps in FILE_LINK.captures_iter(line) {
                let (Some(whole), Some(text), Some(target)) =
                    (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                if in_inline_code(line, whole.start()) {
                    continue;
                }
                let (text, target) = (text.as_str(), target.as_str());
                if is_external(target)
                    || (text.starts_with('`') && whole.as_str().contains("#L"))
                    || target.ends_with(".py")
                {
                    continue;
                }

                result.checked += 1;
                if !base.join(target).exists() {
                    result.errors.push(ValidationError::new(
                        rel,
                        line_num,
                        format!("[{}]({}) -> file not found", text, target),
                        ErrorType::BrokenLink,
                    ));
                }
            }
        }
    }

    result
}

/// Symbols per target file, extracted at most once per run
struct SymbolCache {
    parser: Option<PythonParser>,
    files: HashMap<PathBuf, Vec<ExtractedSymbol>>,
}

impl SymbolCache {
    fn new() -> Self {
        let parser = match PythonParser::new() {
            Ok(parser) => Some(parser),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };
        Self {
            parser,
            files: HashMap::new(),
        }
    }

    fn symbols(&mut self, path: &Path) -> &[ExtractedSymbol] {
        let parser = &mut self.parser;
        self.files.entry(path.to_path_buf()).or_insert_with(|| {
            parser
                .as_mut()
                .map(|p| p.extract_file(path))
                .unwrap_or_default()
        })
    }
}

fn code_links(documents: &MapDocuments, tolerance: usize) -> CheckResult {
    let mut result = CheckResult::new(Check::CodeLinks);
    let mut cache = SymbolCache::new();

    for (rel, content) in &documents.docs {
        let base = documents.base_dir(rel);
        for (line_num, line) in prose_lines(content) {
            for caps in CODE_LINK.captures_iter(line) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                if in_inline_code(line, whole.start()) {
                    continue;
                }
                let (symbol, path) = (&caps[1], &caps[2]);
                let Ok(line_number) = caps[3].parse::<usize>() else {
                    continue;
                };

                result.checked += 1;
                let link = format!("[`{}`]({}#L{})", symbol, path, line_number);
                let target = base.join(path);
                let problem = if !target.is_file() {
                    Some("file not found".to_string())
                } else {
                    let matches: Vec<&ExtractedSymbol> = cache
                        .symbols(&target)
                        .iter()
                        .filter(|s| s.name == symbol || s.qualified_name() == symbol)
                        .collect();
                    if matches.is_empty() {
                        Some("symbol not found".to_string())
                    } else if !matches.iter().any(|s| s.line.abs_diff(line_number) <= tolerance) {
                        Some(format!("symbol not at line {}", line_number))
                    } else {
                        None
                    }
                };

                if let Some(problem) = problem {
                    result.errors.push(ValidationError::new(
                        rel,
                        line_num,
                        format!("{} -> {}", link, problem),
                        ErrorType::BrokenSymbol,
                    ));
                }
            }

            for caps in SOURCE_LINK.captures_iter(line) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                if in_inline_code(line, whole.start()) {
                    continue;
                }
                let path = &caps[1];
                let Ok(line_number) = caps[2].parse::<usize>() else {
                    continue;
                };

                result.checked += 1;
                let link = format!("[Source]({}#L{})", path, line_number);
                let target = base.join(path);
                let problem = match std::fs::read_to_string(&target) {
                    Err(_) if !target.is_file() => Some("file not found".to_string()),
                    Err(e) => {
                        tracing::debug!("Cannot read {}: {}", target.display(), e);
                        None
                    }
                    Ok(source) => {
                        let total = source.lines().count();
                        (line_number > total).then(|| {
                            format!("line {} exceeds file length ({} lines)", line_number, total)
                        })
                    }
                };

                if let Some(problem) = problem {
                    result.errors.push(ValidationError::new(
                        rel,
                        line_num,
                        format!("{} -> {}", link, problem),
                        ErrorType::BrokenSymbol,
                    ));
                }
            }
        }
    }

    result
}

/// Size tier of a document, if it has one
fn tier(rel: &Path, limits: &SizeLimits) -> Option<(&'static str, usize)> {
    let parts: Vec<_> = rel.iter().collect();
    match parts.as_slice() {
        [name] if *name == "ARCHITECTURE.md" => Some(("L0", limits.architecture)),
        [dir, _] if *dir == "domains" => Some(("L1", limits.domain)),
        [dir, ..] if *dir == "modules" => Some(("L2", limits.module)),
        _ => None,
    }
}

fn size_limits(documents: &MapDocuments, limits: &SizeLimits) -> CheckResult {
    let mut result = CheckResult::new(Check::SizeLimits);

    for (rel, content) in &documents.docs {
        let Some((level, limit)) = tier(rel, limits) else {
            continue;
        };
        result.checked += 1;
        let count = content.lines().count();
        if count > limit {
            result.errors.push(ValidationError::new(
                rel,
                0,
                format!("Exceeds {} limit: {} lines > {}", level, count, limit),
                ErrorType::SizeLimit,
            ));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "\
def add(a, b):
    return a + b


class Calculator:
    def clear(self):
        pass
";

    /// map/ with a valid scaffold, src/ops.py beside it
    fn create_map() -> TempDir {
        let dir = TempDir::new().unwrap();
        let map = dir.path().join("map");
        fs::create_dir_all(map.join("domains")).unwrap();
        fs::create_dir_all(map.join("modules/src")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/ops.py"), SOURCE).unwrap();
        fs::write(map.join("README.md"), "# Ops\n\n[Architecture](ARCHITECTURE.md)\n").unwrap();
        fs::write(map.join("ARCHITECTURE.md"), "# Ops Architecture\n").unwrap();
        dir
    }

    fn write_module(dir: &TempDir, content: &str) {
        fs::write(dir.path().join("map/modules/src/ops.md"), content).unwrap();
    }

    #[test]
    fn test_valid_map_passes() {
        let dir = create_map();
        write_module(
            &dir,
            "# ops\n\n### [`add`](../../../src/ops.py#L1)\n\n- [`clear`](../../../src/ops.py#L6): Clears.\n\n[Source](../../../src/ops.py#L7)\n",
        );
        let errors = validate_map(&dir.path().join("map"));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_structure_errors() {
        let dir = TempDir::new().unwrap();
        let errors = check_structure(dir.path());
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["README.md not found", "ARCHITECTURE.md not found", "domains/ directory not found"]
        );
        assert!(errors.iter().all(|e| e.error_type == ErrorType::Structure));
    }

    #[test]
    fn test_structure_accepts_legacy_index() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("MAP.md"), "# Map\n").unwrap();
        fs::write(dir.path().join("ARCHITECTURE.md"), "# Arch\n").unwrap();
        fs::create_dir(dir.path().join("modules")).unwrap();
        assert!(check_structure(dir.path()).is_empty());
    }

    #[test]
    fn test_broken_file_link() {
        let dir = create_map();
        fs::write(
            dir.path().join("map/domains/core.md"),
            "# Core\n\n[Ops](../modules/src/missing.md)\n[Web](https://example.com)\n`[Code](nope.md)`\n",
        )
        .unwrap();
        let errors = check_file_links(&dir.path().join("map"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, PathBuf::from("domains/core.md"));
        assert_eq!(errors[0].line, 3);
        assert_eq!(errors[0].message, "[Ops](../modules/src/missing.md) -> file not found");
        assert_eq!(errors[0].error_type, ErrorType::BrokenLink);
    }

    #[test]
    fn test_links_in_fences_ignored() {
        let dir = create_map();
        write_module(&dir, "# ops\n\n```markdown\n[x](missing.md)\n[`add`](gone.py#L1)\n```\n");
        let map = dir.path().join("map");
        assert!(check_file_links(&map).is_empty());
        assert!(check_code_links(&map, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn test_code_link_tolerance() {
        let dir = create_map();
        let map = dir.path().join("map");

        // `clear` is on line 6
        write_module(&dir, "- [`clear`](../../../src/ops.py#L11): Clears.\n");
        assert!(check_code_links(&map, 5).is_empty());

        write_module(&dir, "- [`clear`](../../../src/ops.py#L12): Clears.\n");
        let errors = check_code_links(&map, 5);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "[`clear`](../../../src/ops.py#L12) -> symbol not at line 12"
        );
        assert_eq!(errors[0].error_type, ErrorType::BrokenSymbol);
    }

    #[test]
    fn test_code_link_missing_symbol_and_file() {
        let dir = create_map();
        write_module(
            &dir,
            "- [`subtract`](../../../src/ops.py#L1): x\n- [`add`](../../../src/gone.py#L1): y\n",
        );
        let errors = check_code_links(&dir.path().join("map"), DEFAULT_TOLERANCE);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "[`subtract`](../../../src/ops.py#L1) -> symbol not found");
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].message, "[`add`](../../../src/gone.py#L1) -> file not found");
        assert_eq!(errors[1].line, 2);
    }

    #[test]
    fn test_qualified_method_link() {
        let dir = create_map();
        write_module(&dir, "- [`Calculator.clear`](../../../src/ops.py#L6): x\n");
        assert!(check_code_links(&dir.path().join("map"), 0).is_empty());
    }

    #[test]
    fn test_source_link_beyond_file() {
        let dir = create_map();
        write_module(&dir, "[Source](../../../src/ops.py#L99)\n");
        let errors = check_code_links(&dir.path().join("map"), DEFAULT_TOLERANCE);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "[Source](../../../src/ops.py#L99) -> line 99 exceeds file length (7 lines)"
        );
    }

    #[test]
    fn test_size_limit_boundary() {
        let dir = create_map();
        let map = dir.path().join("map");
        let limits = SizeLimits::default();

        fs::write(map.join("domains/core.md"), "line\n".repeat(300)).unwrap();
        assert!(check_size_limits(&map, &limits).is_empty());

        fs::write(map.join("domains/core.md"), "line\n".repeat(301)).unwrap();
        let errors = check_size_limits(&map, &limits);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, PathBuf::from("domains/core.md"));
        assert_eq!(errors[0].message, "Exceeds L1 limit: 301 lines > 300");
        assert_eq!(errors[0].error_type, ErrorType::SizeLimit);
    }

    #[test]
    fn test_size_limit_tiers() {
        let limits = SizeLimits::default();
        assert_eq!(tier(Path::new("ARCHITECTURE.md"), &limits), Some(("L0", 500)));
        assert_eq!(tier(Path::new("domains/core.md"), &limits), Some(("L1", 300)));
        assert_eq!(tier(Path::new("modules/calc/advanced/sci.md"), &limits), Some(("L2", 200)));
        assert_eq!(tier(Path::new("README.md"), &limits), None);
        assert_eq!(tier(Path::new("domains/nested/x.md"), &limits), None);
    }

    #[test]
    fn test_validator_report() {
        let dir = create_map();
        write_module(&dir, "- [`add`](../../../src/ops.py#L30): Adds.\n");
        let options = ValidateOptions {
            tolerance: 5,
            limits: SizeLimits::default(),
        };
        let report = Validator::new(options).run(&dir.path().join("map")).unwrap();

        assert_eq!(report.checks.len(), 4);
        assert!(report.checks[0].passed());
        assert_eq!(report.checks[2].check, Check::CodeLinks);
        assert_eq!(report.checks[2].checked, 1);
        assert_eq!(report.error_count(), 1);
        assert!(!report.is_ok());
    }

    #[test]
    fn test_validator_missing_dir() {
        let result = Validator::new(ValidateOptions::default()).run(Path::new("/nonexistent/map"));
        assert!(matches!(result, Err(Error::PathNotFound(_))));
    }

    #[test]
    fn test_error_type_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorType::BrokenSymbol).unwrap();
        assert_eq!(json, "\"broken_symbol\"");
    }
}
