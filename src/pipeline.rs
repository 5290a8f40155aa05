//! Scanner → extractor → resolver → generator orchestration.
//!
//! A [`Pipeline`] owns the per-file candidate cache. [`Pipeline::run`] does a
//! full cycle; [`Pipeline::rebuild`] re-reads only the files it is told about,
//! then resolves and regenerates from the complete union so the output is the
//! same as a fresh run over the same files.

use crate::config::TailwindConfig;
use crate::errors::{Diagnostic, Result};
use crate::extractor::{self, Candidate};
use crate::resolver::{Plugin, ResolvedUtility, Resolver};
use crate::scanner::{ContentScanner, ScanOptions};
use crate::stylesheet::{self, RenderOptions};
use crate::tokens::TokenTable;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Scanning,
    Extracting,
    Resolving,
    Generating,
}

/// Called once for every file read during a cycle
pub type ProgressHook = Arc<dyn Fn(&Path) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub scan: ScanOptions,
    pub render: RenderOptions,
    /// Emit the base reset layer ahead of the utilities
    pub preflight: bool,
    /// Extra exclusion globs on top of the configured `!` patterns
    pub excludes: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            render: RenderOptions {
                minify: false,
                header: true,
            },
            preflight: true,
            excludes: Vec::new(),
        }
    }
}

/// Performance statistics
#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    pub total_duration: Duration,
    pub extraction_duration: Duration,
    pub resolution_duration: Duration,
    pub css_generation_duration: Duration,
    pub files_per_second: f64,
    pub bytes_processed: u64,
    /// Files read this cycle; smaller than the cached total on a rebuild
    pub files_read: usize,
}

/// Result of one cycle
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub css: String,
    /// Resolved classes and the `file:line:column` locations they came from
    pub class_locations: BTreeMap<String, Vec<String>>,
    /// Number of utility rules in the stylesheet
    pub rules: usize,
    /// Distinct candidates that matched no utility
    pub unresolved: usize,
    pub files_scanned: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: PerformanceStats,
}

impl BuildOutput {
    pub fn resolved(&self) -> usize {
        self.class_locations.len()
    }
}

pub struct Pipeline {
    scanner: ContentScanner,
    resolver: Resolver,
    options: PipelineOptions,
    plugins: Vec<String>,
    state: PipelineState,
    cache: BTreeMap<PathBuf, Vec<Candidate>>,
    read_errors: BTreeMap<PathBuf, Diagnostic>,
    progress: Option<ProgressHook>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.scanner.root())
            .field("state", &self.state)
            .field("cached_files", &self.cache.len())
            .finish()
    }
}

impl Pipeline {
    /// Validate the configuration and the content root. Nothing is scanned yet.
    pub fn new(
        config: &TailwindConfig,
        config_path: Option<&Path>,
        options: PipelineOptions,
    ) -> Result<Self> {
        config.validate()?;

        let patterns = config.pattern_set()?.with_excludes(&options.excludes)?;
        let tokens = config.token_table()?;
        let root = config.content_root(config_path)?;
        let scanner = ContentScanner::new(patterns, &root, options.scan.clone())?;

        for plugin in &config.plugins {
            tracing::debug!("Plugin '{}' declared in config; carried through, not executed", plugin);
        }
        tracing::debug!(
            "Pipeline ready: root={}, {} token namespaces",
            scanner.root().display(),
            tokens.namespace_names().count()
        );

        Ok(Self {
            scanner,
            resolver: Resolver::new(tokens),
            options,
            plugins: config.plugins.clone(),
            state: PipelineState::Idle,
            cache: BTreeMap::new(),
            read_errors: BTreeMap::new(),
            progress: None,
        })
    }

    pub fn with_plugin<P: Plugin + ?Sized>(mut self, plugin: &P) -> Self {
        self.resolver = self.resolver.with_plugin(plugin);
        self
    }

    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    pub fn scanner(&self) -> &ContentScanner {
        &self.scanner
    }

    pub fn tokens(&self) -> &TokenTable {
        self.resolver.tokens()
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Full cycle over every matched file
    pub fn run(&mut self) -> Result<BuildOutput> {
        self.cache.clear();
        self.read_errors.clear();
        self.cycle(None)
    }

    /// Incremental cycle: re-read `changed`, drop files that no longer match,
    /// pick up new ones, then regenerate from the full candidate union
    pub fn rebuild(&mut self, changed: &BTreeSet<PathBuf>) -> Result<BuildOutput> {
        self.cycle(Some(changed))
    }

    fn cycle(&mut self, changed: Option<&BTreeSet<PathBuf>>) -> Result<BuildOutput> {
        let start = Instant::now();
        let mut stats = PerformanceStats::default();

        self.transition(PipelineState::Scanning);
        let listing = match self.scanner.files() {
            Ok(listing) => listing,
            Err(e) => {
                self.transition(PipelineState::Idle);
                return Err(e);
            }
        };
        for diagnostic in &listing.diagnostics {
            tracing::warn!("Skipping file - {}", diagnostic);
        }
        let matched: BTreeSet<&PathBuf> = listing.files.iter().collect();

        self.cache.retain(|path, _| matched.contains(path));
        self.read_errors.retain(|path, _| matched.contains(path));

        let to_read: Vec<&PathBuf> = listing
            .files
            .iter()
            .filter(|path| {
                changed.map_or(true, |set| set.contains(*path))
                    || !(self.cache.contains_key(*path) || self.read_errors.contains_key(*path))
            })
            .collect();
        tracing::debug!("{} files matched, {} to read", listing.files.len(), to_read.len());

        self.transition(PipelineState::Extracting);
        let extraction_start = Instant::now();
        let scanner = &self.scanner;
        let progress = self.progress.as_ref();
        let root = scanner.root();
        let results: Vec<(PathBuf, std::result::Result<(u64, Vec<Candidate>), Diagnostic>)> = to_read
            .par_iter()
            .map(|path| {
                let outcome = scanner.read(path).map(|source| {
                    let display = source.path.strip_prefix(root).unwrap_or(&source.path);
                    let candidates =
                        extractor::extract_candidates(&source.text, &display.to_string_lossy());
                    (source.text.len() as u64, candidates)
                });
                if let Some(hook) = progress {
                    hook(path.as_path());
                }
                ((*path).clone(), outcome)
            })
            .collect();

        for (path, outcome) in results {
            match outcome {
                Ok((bytes, candidates)) => {
                    stats.bytes_processed += bytes;
                    stats.files_read += 1;
                    self.read_errors.remove(&path);
                    self.cache.insert(path, candidates);
                }
                Err(diagnostic) => {
                    tracing::warn!("Skipping unreadable file - {}", diagnostic);
                    self.cache.remove(&path);
                    self.read_errors.insert(path, diagnostic);
                }
            }
        }
        stats.extraction_duration = extraction_start.elapsed();

        self.transition(PipelineState::Resolving);
        let resolution_start = Instant::now();
        let unique: Vec<&str> = self
            .cache
            .values()
            .flatten()
            .map(|candidate| candidate.value.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let resolver = &self.resolver;
        let resolved: Vec<ResolvedUtility> =
            unique.par_iter().filter_map(|value| resolver.resolve(value)).collect();
        let unresolved = unique.len() - resolved.len();

        let resolved_classes: HashSet<&str> = resolved.iter().map(|r| r.class.as_str()).collect();
        let mut class_locations: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for candidate in self.cache.values().flatten() {
            if resolved_classes.contains(candidate.value.as_str()) {
                class_locations
                    .entry(candidate.value.clone())
                    .or_default()
                    .push(format!("{}:{}:{}", candidate.file_path, candidate.line, candidate.column));
            }
        }
        stats.resolution_duration = resolution_start.elapsed();
        tracing::debug!("{} candidates resolved, {} unresolved", resolved.len(), unresolved);

        self.transition(PipelineState::Generating);
        let generation_start = Instant::now();
        let mut sheet = stylesheet::generate(resolved);
        let rules = sheet.utility_count();
        if self.options.preflight {
            sheet = sheet.with_preflight(self.resolver.tokens());
        }
        let css = sheet.render(&self.options.render);
        stats.css_generation_duration = generation_start.elapsed();

        let mut diagnostics = listing.diagnostics;
        diagnostics.extend(self.read_errors.values().cloned());

        stats.total_duration = start.elapsed();
        stats.files_per_second = stats.files_read as f64 / stats.total_duration.as_secs_f64().max(1e-9);

        self.transition(PipelineState::Idle);

        Ok(BuildOutput {
            css,
            class_locations,
            rules,
            unresolved,
            files_scanned: self.cache.len(),
            diagnostics,
            stats,
        })
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::trace!("Pipeline {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Generate a stylesheet straight from text, without scanning
pub fn render_text(resolver: &Resolver, text: &str, options: &PipelineOptions) -> String {
    let candidates: Vec<String> = extractor::extract(text).into_iter().collect();
    let resolved: Vec<ResolvedUtility> = candidates
        .par_iter()
        .filter_map(|value| resolver.resolve(value))
        .collect();

    let mut sheet = stylesheet::generate(resolved);
    if options.preflight {
        sheet = sheet.with_preflight(resolver.tokens());
    }
    sheet.render(&options.render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r##"{
  "content": { "relative": true, "files": ["*.html", "./src/**/*.rs"] },
  "theme": { "extend": { "colors": { "brown-3": "#A27B4C" } } }
}"##;

    fn project() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("tailwind.config.json");
        fs::write(&config_path, CONFIG).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        (dir, config_path)
    }

    fn pipeline(config_path: &Path) -> Pipeline {
        let config = TailwindConfig::from_file(config_path).unwrap();
        let options = PipelineOptions {
            render: RenderOptions::default(),
            preflight: false,
            ..PipelineOptions::default()
        };
        Pipeline::new(&config, Some(config_path), options).unwrap()
    }

    #[test]
    fn test_end_to_end_deduplicates_across_files() {
        let (dir, config_path) = project();
        fs::write(dir.path().join("index.html"), r#"<p class="text-brown-3">hi</p>"#).unwrap();
        fs::write(dir.path().join("src/app.rs"), r#"view! { <p class="text-brown-3"/> }"#).unwrap();

        let mut pipeline = pipeline(&config_path);
        let output = pipeline.run().unwrap();

        assert_eq!(output.files_scanned, 2);
        assert_eq!(output.css.matches(".text-brown-3 {").count(), 1);
        assert!(output.css.contains("color: #A27B4C;"));
        assert_eq!(output.class_locations["text-brown-3"].len(), 2);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_missing_root_fails_before_scanning() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("missing").join("tailwind.config.json");
        let config = TailwindConfig::from_json_str(CONFIG).unwrap();

        let err = Pipeline::new(&config, Some(&config_path), PipelineOptions::default()).unwrap_err();
        assert!(matches!(err, crate::GeneratorError::RootNotFound(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TailwindConfig::from_json_str(r#"{"content": {"files": []}}"#).unwrap();
        let err = Pipeline::new(&config, None, PipelineOptions::default()).unwrap_err();
        assert!(matches!(err, crate::GeneratorError::ConfigError { .. }));
    }

    #[test]
    fn test_unreadable_file_is_a_diagnostic() {
        let (dir, config_path) = project();
        fs::write(dir.path().join("index.html"), r#"<b class="flex">"#).unwrap();
        fs::write(dir.path().join("broken.html"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let output = pipeline(&config_path).run().unwrap();
        assert_eq!(output.files_scanned, 1);
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("UTF-8"));
        assert!(output.css.contains(".flex {"));
    }

    #[test]
    fn test_rebuild_reads_changed_files_only() {
        let (dir, config_path) = project();
        fs::write(dir.path().join("index.html"), r#"<b class="flex">"#).unwrap();
        fs::write(dir.path().join("src/app.rs"), r#"class="p-4""#).unwrap();

        let mut pipeline = pipeline(&config_path);
        let first = pipeline.run().unwrap();
        assert_eq!(first.stats.files_read, 2);

        let page = pipeline.scanner().root().join("index.html");
        fs::write(&page, r#"<b class="hidden">"#).unwrap();
        let second = pipeline.rebuild(&BTreeSet::from([page.clone()])).unwrap();

        assert_eq!(second.stats.files_read, 1);
        assert!(second.css.contains(".hidden {"));
        assert!(!second.css.contains(".flex {"));
        assert!(second.css.contains(".p-4 {"));
    }

    #[test]
    fn test_rebuild_drops_removed_and_adds_new_files() {
        let (dir, config_path) = project();
        fs::write(dir.path().join("index.html"), r#"<b class="flex">"#).unwrap();

        let mut pipeline = pipeline(&config_path);
        pipeline.run().unwrap();

        let root = pipeline.scanner().root().to_path_buf();
        fs::remove_file(root.join("index.html")).unwrap();
        fs::write(root.join("about.html"), r#"<b class="italic">"#).unwrap();

        let changes = BTreeSet::from([root.join("index.html"), root.join("about.html")]);
        let output = pipeline.rebuild(&changes).unwrap();
        assert!(!output.css.contains(".flex"));
        assert!(output.css.contains(".italic {"));
        assert_eq!(output.files_scanned, 1);
    }

    #[test]
    fn test_rebuild_matches_fresh_run() {
        let (dir, config_path) = project();
        fs::write(dir.path().join("index.html"), r#"<b class="flex md:p-4">"#).unwrap();
        fs::write(dir.path().join("src/app.rs"), r#"class="text-brown-3""#).unwrap();

        let mut incremental = pipeline(&config_path);
        incremental.run().unwrap();
        let app = incremental.scanner().root().join("src/app.rs");
        fs::write(&app, r#"class="hover:text-brown-3 m-2""#).unwrap();
        let rebuilt = incremental.rebuild(&BTreeSet::from([app])).unwrap();

        let fresh = pipeline(&config_path).run().unwrap();
        assert_eq!(rebuilt.css, fresh.css);
    }

    #[test]
    fn test_progress_hook_sees_every_file() {
        let (dir, config_path) = project();
        fs::write(dir.path().join("a.html"), "flex").unwrap();
        fs::write(dir.path().join("b.html"), "grid").unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut pipeline = pipeline(&config_path).with_progress(Arc::new(move |path: &Path| {
            sink.lock().unwrap().push(path.to_path_buf());
        }));
        pipeline.run().unwrap();

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_render_text() {
        let resolver = Resolver::new(TokenTable::base());
        let options = PipelineOptions {
            render: RenderOptions::default(),
            preflight: false,
            ..PipelineOptions::default()
        };
        let css = render_text(&resolver, r#"<div class="flex not-a-class">"#, &options);
        assert_eq!(css, ".flex {\n  display: flex;\n}\n");
    }
}
