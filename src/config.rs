use crate::errors::{GeneratorError, Result};
use crate::scanner::PatternSet;
use crate::tokens::{merge_theme, TokenTable, TokenTree};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tailwind-style configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TailwindConfig {
    /// Content paths to scan
    pub content: ContentConfig,

    /// Theme configuration
    pub theme: ThemeConfig,

    /// Plugin identifiers, carried through untouched
    pub plugins: Vec<String>,
}

/// Where to look for class names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawContent")]
pub struct ContentConfig {
    /// Resolve patterns against the config file's directory instead of the working directory
    pub relative: bool,

    /// Ordered glob patterns; entries starting with `!` exclude
    pub files: Vec<String>,
}

/// `content` is accepted either as a bare list or as `{ relative, files }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Files(Vec<String>),
    Detailed {
        #[serde(default)]
        relative: bool,
        #[serde(default)]
        files: Vec<String>,
    },
}

impl From<RawContent> for ContentConfig {
    fn from(raw: RawContent) -> Self {
        match raw {
            RawContent::Files(files) => Self {
                relative: false,
                files,
            },
            RawContent::Detailed { relative, files } => Self { relative, files },
        }
    }
}

/// Theme configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Theme extensions, layered over the base tokens
    pub extend: IndexMap<String, TokenTree>,

    /// Namespaces that replace the base tokens wholesale
    #[serde(flatten)]
    pub overrides: IndexMap<String, TokenTree>,
}

impl TailwindConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = read_config(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = read_config(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| GeneratorError::ConfigError {
            message: format!("Failed to parse YAML config: {}", e),
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| GeneratorError::ConfigError {
            message: format!("Failed to parse JSON config: {}", e),
        })
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(GeneratorError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .json",
                    path.display()
                ),
            }),
        }
    }

    /// Load and layer several configuration files, later files winning
    pub fn from_files(paths: &[PathBuf]) -> Result<Self> {
        let mut layers = paths.iter();
        let first = match layers.next() {
            Some(path) => Self::from_file(path)?,
            None => return Ok(Self::default()),
        };
        layers.try_fold(first, |merged, path| Ok(merged.merge(Self::from_file(path)?)))
    }

    /// Merge with another configuration
    pub fn merge(mut self, other: Self) -> Self {
        for path in other.content.files {
            if !self.content.files.contains(&path) {
                self.content.files.push(path);
            }
        }
        self.content.relative |= other.content.relative;

        self.theme.extend = merge_theme(&self.theme.extend, &other.theme.extend);
        for (namespace, tree) in other.theme.overrides {
            self.theme.overrides.insert(namespace, tree);
        }

        for plugin in other.plugins {
            if !self.plugins.contains(&plugin) {
                self.plugins.push(plugin);
            }
        }

        self
    }

    /// Check the document before any file I/O happens
    pub fn validate(&self) -> Result<()> {
        if self.content.files.is_empty() {
            return Err(GeneratorError::config("content.files must list at least one pattern"));
        }
        self.pattern_set()?;
        self.token_table()?;
        Ok(())
    }

    /// The validated content pattern set
    pub fn pattern_set(&self) -> Result<PatternSet> {
        PatternSet::new(self.content.files.clone(), self.content.relative)
    }

    /// Base tokens, then namespace overrides, then extensions
    pub fn token_table(&self) -> Result<TokenTable> {
        let overrides = TokenTable::from_trees(&self.theme.overrides)?;
        let extension = TokenTable::from_trees(&self.theme.extend)?;
        Ok(TokenTable::base()
            .replace_namespaces(&overrides)
            .merge(&extension))
    }

    /// Directory that content patterns are evaluated against
    pub fn content_root(&self, config_path: Option<&Path>) -> Result<PathBuf> {
        match config_path {
            Some(path) if self.content.relative => Ok(match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }),
            _ => Ok(std::env::current_dir()?),
        }
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| GeneratorError::ConfigError {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })
}
