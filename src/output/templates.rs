// Template engine for the generated markdown documents
//
// Templates use `${slot}` markers. Each template declares the closed set of
// slots it accepts; a marker outside that set, or a slot left without a
// value, fails the render instead of leaking into the output.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(?:\$|\{([A-Za-z_][A-Za-z0-9_]*)\})").unwrap());

/// A named substitution point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    ProjectName,
    ProjectDescription,
    DomainsTable,
    ModulesList,
    ModuleName,
    ModuleId,
    ModuleDescription,
    SourceName,
    SourceLink,
    Components,
}

impl Slot {
    const ALL: [Slot; 10] = [
        Slot::ProjectName,
        Slot::ProjectDescription,
        Slot::DomainsTable,
        Slot::ModulesList,
        Slot::ModuleName,
        Slot::ModuleId,
        Slot::ModuleDescription,
        Slot::SourceName,
        Slot::SourceLink,
        Slot::Components,
    ];

    /// Marker name as written inside `${...}`
    pub fn name(&self) -> &'static str {
        match self {
            Slot::ProjectName => "project_name",
            Slot::ProjectDescription => "project_description",
            Slot::DomainsTable => "domains_table",
            Slot::ModulesList => "modules_list",
            Slot::ModuleName => "module_name",
            Slot::ModuleId => "module_id",
            Slot::ModuleDescription => "module_description",
            Slot::SourceName => "source_name",
            Slot::SourceLink => "source_link",
            Slot::Components => "components",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// The bundled document templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// README.md, the map index
    Index,
    /// ARCHITECTURE.md, the L0 overview
    Architecture,
    /// One document per source module
    Module,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Index, Template::Architecture, Template::Module];

    pub fn file_name(&self) -> &'static str {
        match self {
            Template::Index => "README.md",
            Template::Architecture => "ARCHITECTURE.md",
            Template::Module => "module.md",
        }
    }

    pub fn slots(&self) -> &'static [Slot] {
        match self {
            Template::Index => &[
                Slot::ProjectName,
                Slot::ProjectDescription,
                Slot::DomainsTable,
                Slot::ModulesList,
            ],
            Template::Architecture => &[Slot::ProjectName, Slot::DomainsTable],
            Template::Module => &[
                Slot::ModuleName,
                Slot::ModuleId,
                Slot::ModuleDescription,
                Slot::SourceName,
                Slot::SourceLink,
                Slot::Components,
            ],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.file_name() == name)
    }

    fn embedded(&self) -> &'static str {
        match self {
            Template::Index => include_str!("../../templates/README.md"),
            Template::Architecture => include_str!("../../templates/ARCHITECTURE.md"),
            Template::Module => include_str!("../../templates/module.md"),
        }
    }
}

/// Values for a single render
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: BTreeMap<Slot, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.values.insert(slot, value.into());
        self
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}

/// Holds template text and renders it
pub struct TemplateEngine {
    templates: HashMap<Template, String>,
}

impl TemplateEngine {
    /// Create a template engine with the embedded templates
    pub fn new() -> Self {
        let templates = Template::ALL
            .into_iter()
            .map(|t| (t, t.embedded().to_string()))
            .collect();
        Self { templates }
    }

    /// Create a template engine that prefers templates found in `dir`,
    /// falling back to the embedded ones
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::PathNotFound(dir.to_path_buf()));
        }

        let mut engine = Self::new();
        for template in Template::ALL {
            let path = dir.join(template.file_name());
            if path.is_file() {
                tracing::debug!("Using template override {}", path.display());
                engine
                    .templates
                    .insert(template, std::fs::read_to_string(&path)?);
            }
        }
        Ok(engine)
    }

    /// Render a template. The result ends with exactly one newline.
    pub fn render(&self, template: Template, subs: &Substitutions) -> Result<String> {
        let text = self
            .templates
            .get(&template)
            .map(String::as_str)
            .unwrap_or_else(|| template.embedded());
        substitute(template, text, subs)
    }

    /// Render a template looked up by file name
    pub fn render_named(&self, name: &str, subs: &Substitutions) -> Result<String> {
        let template =
            Template::from_name(name).ok_or_else(|| Error::UnknownTemplate(name.to_string()))?;
        self.render(template, subs)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an embedded template by file name
pub fn render_template(name: &str, subs: &Substitutions) -> Result<String> {
    TemplateEngine::new().render_named(name, subs)
}

/// Single literal pass; substituted values are never rescanned
fn substitute(template: Template, text: &str, subs: &Substitutions) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in MARKER.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let Some(key) = caps.get(1) else {
            out.push('$');
            continue;
        };
        let value = Slot::from_name(key.as_str())
            .filter(|slot| template.slots().contains(slot))
            .and_then(|slot| subs.get(slot))
            .ok_or_else(|| Error::missing_substitution(template.file_name(), key.as_str()))?;
        out.push_str(value);
    }
    out.push_str(&text[last..]);

    let mut rendered = out.trim_end().to_string();
    rendered.push('\n');
    Ok(rendered)
}
