use crate::errors::Diagnostic;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Metadata for the generated manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Version of the manifest format
    pub version: String,

    /// Timestamp when the manifest was generated
    pub generated_at: DateTime<Utc>,

    /// Number of files scanned
    pub files_processed: usize,

    /// Number of classes that produced a rule
    pub classes_resolved: usize,

    /// Number of candidates that matched no utility
    pub candidates_unresolved: usize,

    /// Plugin identifiers from the configuration, not executed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    /// Generator version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_version: Option<String>,
}

/// Detailed class information in the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestClassInfo {
    /// Number of occurrences of this class
    pub count: usize,

    /// Locations where this class was found (file:line:column)
    pub files: Vec<String>,
}

/// Complete manifest structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the build
    pub metadata: ManifestMetadata,

    /// Map of class names to their usage information
    pub classes: IndexMap<String, ManifestClassInfo>,

    /// Files skipped during the build and why
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ManifestDiagnostic>,

    /// Statistics about the build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ManifestStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDiagnostic {
    pub path: String,
    pub message: String,
}

impl From<&Diagnostic> for ManifestDiagnostic {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            path: diagnostic.path.display().to_string(),
            message: diagnostic.message.clone(),
        }
    }
}

/// Statistics about the build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStatistics {
    /// Total CSS size in bytes
    pub css_size_bytes: usize,

    /// Number of files that matched patterns
    pub files_matched: usize,

    /// Number of files actually containing resolved classes
    pub files_with_classes: usize,

    /// Processing time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,

    /// Top used classes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_classes: Option<Vec<TopClass>>,
}

/// Information about frequently used classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopClass {
    pub name: String,
    pub count: usize,
    pub file_count: usize,
}

impl Manifest {
    /// Create a new manifest with default metadata
    pub fn new() -> Self {
        Self {
            metadata: ManifestMetadata {
                version: "1.0.0".to_string(),
                generated_at: Utc::now(),
                files_processed: 0,
                classes_resolved: 0,
                candidates_unresolved: 0,
                plugins: Vec::new(),
                generator_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            classes: IndexMap::new(),
            diagnostics: Vec::new(),
            statistics: None,
        }
    }

    /// Add or update class information
    pub fn add_class(&mut self, class_name: String, location: String) {
        let entry = self
            .classes
            .entry(class_name)
            .or_insert_with(|| ManifestClassInfo {
                count: 0,
                files: Vec::new(),
            });

        entry.count += 1;
        if !entry.files.contains(&location) {
            entry.files.push(location);
        }
    }

    /// Calculate and set statistics
    pub fn calculate_statistics(&mut self, css_size: usize, processing_time_ms: Option<u64>) {
        let mut files_with_classes = HashSet::new();
        for class_info in self.classes.values() {
            for location in &class_info.files {
                // Locations end in ":line:column"
                let path = location.rsplitn(3, ':').last().unwrap_or(location);
                files_with_classes.insert(path.to_string());
            }
        }

        let mut class_list: Vec<_> = self
            .classes
            .iter()
            .map(|(name, info)| TopClass {
                name: name.clone(),
                count: info.count,
                file_count: info.files.len(),
            })
            .collect();

        class_list.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        let top_classes = class_list.into_iter().take(10).collect();

        self.statistics = Some(ManifestStatistics {
            css_size_bytes: css_size,
            files_matched: self.metadata.files_processed,
            files_with_classes: files_with_classes.len(),
            processing_time_ms,
            top_classes: Some(top_classes),
        });
    }

    /// Convert manifest to JSON value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Convert manifest to pretty JSON string
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Convert manifest to compact JSON string
    pub fn to_compact_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder pattern for creating manifests
pub struct ManifestBuilder {
    manifest: Manifest,
    processing_time_ms: Option<u64>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: Manifest::new(),
            processing_time_ms: None,
        }
    }

    pub fn with_files_processed(mut self, count: usize) -> Self {
        self.manifest.metadata.files_processed = count;
        self
    }

    pub fn with_unresolved(mut self, count: usize) -> Self {
        self.manifest.metadata.candidates_unresolved = count;
        self
    }

    pub fn with_plugins(mut self, plugins: &[String]) -> Self {
        self.manifest.metadata.plugins = plugins.to_vec();
        self
    }

    /// Add class locations; classes keep the order given
    pub fn with_class_info(mut self, classes: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        for (class_name, locations) in classes {
            let info = ManifestClassInfo {
                count: locations.len(),
                files: locations,
            };
            self.manifest.classes.insert(class_name, info);
        }
        self.manifest.metadata.classes_resolved = self.manifest.classes.len();
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: &[Diagnostic]) -> Self {
        self.manifest.diagnostics = diagnostics.iter().map(ManifestDiagnostic::from).collect();
        self
    }

    pub fn with_processing_time(mut self, millis: u64) -> Self {
        self.processing_time_ms = Some(millis);
        self
    }

    /// Build the final manifest with statistics
    pub fn build(mut self, css_size: usize) -> Manifest {
        self.manifest
            .calculate_statistics(css_size, self.processing_time_ms);
        self.manifest
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
