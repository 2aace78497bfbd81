// Generation pipeline: discover sources, merge with existing documents, write
//
// README.md and ARCHITECTURE.md are scaffolds written once and then owned by
// whoever edits them. Module documents are regenerated every run and only
// rewritten when their bytes change.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::map::{merge_maps, parse_existing_map, ChangeReport, MapFile, MissingDocstring};
use crate::output::{
    absolutize, compute_relative_path, contains_placeholder, make_placeholder, render_module,
    ModuleDocument, Slot, Substitutions, Template, TemplateEngine,
};
use crate::parser::{ExtractedSymbol, PythonParser};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOMAINS_DIR: &str = "domains";
const MODULES_DIR: &str = "modules";

/// Settings for one generation run
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub src_dir: PathBuf,
    pub map_dir: PathBuf,
    /// Defaults to the title-cased name of `src_dir`
    pub project_name: Option<String>,
    pub project_description: String,
    /// Relative to `src_dir`
    pub src_glob: String,
    /// Globs matched against paths relative to `src_dir`
    pub exclude: Vec<String>,
    /// Directory of template overrides
    pub templates: Option<PathBuf>,
    /// Compute everything, write nothing
    pub dry_run: bool,
}

impl GeneratorConfig {
    pub fn new(src_dir: impl Into<PathBuf>, map_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            map_dir: map_dir.into(),
            project_name: None,
            project_description: make_placeholder("Describe this project"),
            src_glob: "**/*.py".to_string(),
            exclude: Vec::new(),
            templates: None,
            dry_run: false,
        }
    }

    /// Build from a loaded config file
    pub fn from_config(
        src_dir: impl Into<PathBuf>,
        map_dir: impl Into<PathBuf>,
        config: &Config,
    ) -> Self {
        let mut generator_config = Self::new(src_dir, map_dir);
        generator_config.project_name = config.project.name.clone();
        if let Some(description) = &config.project.description {
            generator_config.project_description = description.clone();
        }
        generator_config.src_glob = config.generate.src_glob.clone();
        generator_config.exclude = config.generate.exclude.clone();
        generator_config.templates = config.generate.templates.clone();
        generator_config
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A source file with at least one symbol
struct SourceModule {
    /// Relative to `src_dir`
    source_path: PathBuf,
    symbols: Vec<ExtractedSymbol>,
    module_docstring: Option<String>,
}

/// Orchestrates a generation run
pub struct Generator {
    config: GeneratorConfig,
    parser: PythonParser,
    engine: TemplateEngine,
    verbose: bool,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let engine = match &config.templates {
            Some(dir) => TemplateEngine::from_dir(dir)?,
            None => TemplateEngine::new(),
        };

        Ok(Self {
            config,
            parser: PythonParser::new()?,
            engine,
            verbose: false,
        })
    }

    /// Show a progress bar while extracting
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Generate or update the map
    pub fn run(&mut self) -> Result<(ChangeReport, Vec<MapFile>)> {
        // `..` must be resolved before the folder name is taken
        let src_dir = absolutize(&self.config.src_dir);
        let map_dir = absolutize(&self.config.map_dir);
        if !src_dir.is_dir() {
            return Err(Error::PathNotFound(self.config.src_dir.clone()));
        }

        let folder = src_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let domain_id = folder.to_lowercase();
        let project_name = self
            .config
            .project_name
            .clone()
            .unwrap_or_else(|| title_case(&folder.replace('_', " ")));

        let files = self.discover_files(&src_dir)?;
        tracing::info!("Found {} source files under {}", files.len(), src_dir.display());
        let modules = self.extract_modules(&files, &src_dir);

        let dry_run = self.config.dry_run;
        let mut report = ChangeReport::new();
        if !dry_run {
            std::fs::create_dir_all(&map_dir)?;
        }

        // Scaffolds, written only when absent
        let modules_list = render_modules_list(&modules, &domain_id);
        let index_subs = Substitutions::new()
            .with(Slot::ProjectName, project_name.as_str())
            .with(Slot::ProjectDescription, self.config.project_description.as_str())
            .with(Slot::DomainsTable, "| *Create domains by analyzing modules* | |")
            .with(Slot::ModulesList, modules_list);
        let architecture_subs = Substitutions::new()
            .with(Slot::ProjectName, project_name.as_str())
            .with(
                Slot::DomainsTable,
                "| *Analyze modules and create semantic domain groupings* | |",
            );

        for (template, subs) in [
            (Template::Index, &index_subs),
            (Template::Architecture, &architecture_subs),
        ] {
            let name = template.file_name();
            let path = map_dir.join(name);
            let content = if path.exists() {
                std::fs::read_to_string(&path).unwrap_or_default()
            } else {
                let content = self.engine.render(template, subs)?;
                if !dry_run {
                    std::fs::write(&path, &content)?;
                    tracing::debug!("Wrote {}", path.display());
                }
                report.created_files.push(PathBuf::from(name));
                content
            };
            if contains_placeholder(&content) {
                report.missing_descriptions.push(PathBuf::from(name));
            }
        }

        let domains_dir = map_dir.join(DOMAINS_DIR);
        if !dry_run {
            std::fs::create_dir_all(&domains_dir)?;
        }
        for domain_doc in markdown_files(&domains_dir) {
            let content = std::fs::read_to_string(&domain_doc).unwrap_or_default();
            if contains_placeholder(&content) {
                if let Ok(rel) = domain_doc.strip_prefix(&map_dir) {
                    report.missing_descriptions.push(rel.to_path_buf());
                }
            }
        }

        // Module documents
        let mut map_files = Vec::new();
        let mut written = BTreeSet::new();

        for module in &modules {
            let module_path = module_doc_path(&domain_id, &module.source_path);
            let abs_map = map_dir.join(&module_path);
            let abs_src = src_dir.join(&module.source_path);

            let existing = parse_existing_map(&abs_map)?;
            let outcome = merge_maps(
                existing.as_ref(),
                &module.symbols,
                &module.source_path,
                &module_path,
                module.module_docstring.as_deref(),
            );

            let source_link = compute_relative_path(&abs_map, &abs_src);
            let module_id = module_id(&domain_id, &module.source_path);
            let content = render_module(
                &self.engine,
                &ModuleDocument {
                    module_id: &module_id,
                    source_link: &source_link,
                    map_file: &outcome.map_file,
                    symbols: &module.symbols,
                },
            )?;

            let previous = std::fs::read_to_string(&abs_map).ok();
            let changed = previous.as_deref() != Some(content.as_str());
            match previous {
                None => report.created_files.push(module_path.clone()),
                Some(_) if changed => report.updated_files.push(module_path.clone()),
                Some(_) => {}
            }
            if changed && !dry_run {
                if let Some(parent) = abs_map.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&abs_map, &content)?;
                tracing::debug!("Wrote {}", abs_map.display());
            }

            for name in &outcome.added {
                report.new_sections.push((module_path.clone(), name.clone()));
            }
            for name in &outcome.removed {
                report.removed_sections.push((module_path.clone(), name.clone()));
            }
            for section in outcome.map_file.sections.iter().filter(|s| s.is_placeholder) {
                report.missing_docstrings.push(MissingDocstring {
                    source_path: module.source_path.clone(),
                    line: section.line_number,
                    symbol_name: section.symbol_name.clone(),
                });
            }
            if outcome.map_file.file_description_is_placeholder {
                report.missing_descriptions.push(module_path.clone());
            }

            written.insert(module_path);
            map_files.push(outcome.map_file);
        }

        // Orphans are reported, never removed
        let domain_modules = map_dir.join(MODULES_DIR).join(&domain_id);
        for doc in markdown_files(&domain_modules) {
            if let Ok(rel) = doc.strip_prefix(&map_dir) {
                if !written.contains(rel) {
                    tracing::info!("Orphaned module document {}", rel.display());
                    report.deleted_files.push(rel.to_path_buf());
                }
            }
        }

        Ok((report, map_files))
    }

    /// Source files matching the glob, sorted, minus package markers,
    /// bytecode caches and excluded paths
    fn discover_files(&self, src_dir: &Path) -> Result<Vec<PathBuf>> {
        let excludes = self
            .config
            .exclude
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let pattern = format!(
            "{}/{}",
            glob::Pattern::escape(&src_dir.to_string_lossy()),
            self.config.src_glob
        );

        let mut files = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(src_dir) else {
                continue;
            };
            if path.file_name().is_some_and(|n| n == "__init__.py")
                || relative.components().any(|c| c.as_os_str() == "__pycache__")
            {
                continue;
            }
            if excludes.iter().any(|p| p.matches_path(relative)) {
                tracing::debug!("Excluded {}", relative.display());
                continue;
            }
            files.push(path);
        }

        files.sort();
        Ok(files)
    }

    fn extract_modules(&mut self, files: &[PathBuf], src_dir: &Path) -> Vec<SourceModule> {
        let progress = if self.verbose {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut modules = Vec::new();
        for path in files {
            if let Some(ref pb) = progress {
                let msg = path.file_name().unwrap_or_default().to_string_lossy().to_string();
                pb.set_message(msg);
                pb.inc(1);
            }

            let symbols = self.parser.extract_file(path);
            if symbols.is_empty() {
                tracing::debug!("No symbols in {}, skipping", path.display());
                continue;
            }
            let Ok(relative) = path.strip_prefix(src_dir) else {
                continue;
            };
            modules.push(SourceModule {
                source_path: relative.to_path_buf(),
                module_docstring: self.parser.module_docstring_file(path),
                symbols,
            });
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Extraction complete");
        }

        modules
    }
}

/// Generate or update the map described by `config`
pub fn generate_maps(config: &GeneratorConfig) -> Result<(ChangeReport, Vec<MapFile>)> {
    Generator::new(config.clone())?.run()
}

/// `modules/<domain>/<relative source path>.md`
fn module_doc_path(domain_id: &str, source_path: &Path) -> PathBuf {
    Path::new(MODULES_DIR)
        .join(domain_id)
        .join(source_path.with_extension("md"))
}

/// Dotted id, e.g. `calculator.advanced.scientific`
fn module_id(domain_id: &str, source_path: &Path) -> String {
    let mut parts = vec![domain_id.to_string()];
    parts.extend(
        source_path
            .with_extension("")
            .iter()
            .map(|p| p.to_string_lossy().into_owned()),
    );
    parts.join(".")
}

fn render_modules_list(modules: &[SourceModule], domain_id: &str) -> String {
    if modules.is_empty() {
        return "*No modules found*".to_string();
    }
    modules
        .iter()
        .map(|m| {
            let link = module_doc_path(domain_id, &m.source_path)
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            format!("- [{}]({})", module_id(domain_id, &m.source_path), link)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown files under `dir`, sorted; empty if `dir` is missing
fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect()
}

/// Upper-case the first letter of every word, lower-case the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
