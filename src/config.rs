use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "codemap.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub generate: GenerateConfig,
    pub validate: ValidateConfig,
}

/// Project metadata used in the index and architecture documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub src_glob: String,
    pub exclude: Vec<String>,
    pub templates: Option<PathBuf>,
}

/// Validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Allowed drift, in lines, between a code link and its symbol
    pub tolerance: usize,
    pub limits: SizeLimits,
}

/// Maximum line counts per document tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    /// L0: ARCHITECTURE.md
    pub architecture: usize,
    /// L1: domains/*.md
    pub domain: usize,
    /// L2: modules/**/*.md
    pub module: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            src_glob: "**/*.py".to_string(),
            exclude: Vec::new(),
            templates: None,
        }
    }
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            tolerance: 5,
            limits: SizeLimits::default(),
        }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            architecture: 500,
            domain: 300,
            module: 200,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        project_name: Option<String>,
        project_description: Option<String>,
        src_glob: Option<String>,
        exclude: Vec<String>,
        tolerance: Option<usize>,
    ) {
        if project_name.is_some() {
            self.project.name = project_name;
        }

        if project_description.is_some() {
            self.project.description = project_description;
        }

        if let Some(glob) = src_glob {
            self.generate.src_glob = glob;
        }

        if !exclude.is_empty() {
            self.generate.exclude.extend(exclude);
        }

        if let Some(t) = tolerance {
            self.validate.tolerance = t;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.generate.src_glob.trim().is_empty() {
            return Err(Error::config_validation("src_glob cannot be empty"));
        }

        if self.validate.tolerance > 100 {
            return Err(Error::config_validation("tolerance cannot exceed 100"));
        }

        let limits = &self.validate.limits;
        if limits.architecture == 0 || limits.domain == 0 || limits.module == 0 {
            return Err(Error::config_validation("size limits must be at least 1"));
        }

        Ok(())
    }
}
