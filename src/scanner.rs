//! Content scanning: glob enumeration under a root directory and lazy reading
//! of the matched files.

use crate::errors::{Diagnostic, GeneratorError, Result};
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ordered content patterns. Entries prefixed with `!` exclude matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    includes: Vec<String>,
    excludes: Vec<String>,
    relative: bool,
}

impl PatternSet {
    pub fn new(patterns: Vec<String>, relative: bool) -> Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for raw in patterns {
            let (negated, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let normalized = normalize_pattern(body);
            if normalized.is_empty() {
                return Err(GeneratorError::config(format!("empty content pattern '{}'", raw)));
            }
            if relative {
                let path = Path::new(&normalized);
                if path.is_absolute() {
                    return Err(GeneratorError::config(format!(
                        "absolute content pattern '{}' is not allowed when content is relative",
                        raw
                    )));
                }
                if path.components().any(|c| c == Component::ParentDir) {
                    return Err(GeneratorError::config(format!(
                        "content pattern '{}' escapes the content root",
                        raw
                    )));
                }
            }
            Pattern::new(&normalized).map_err(|e| {
                GeneratorError::config(format!("invalid content pattern '{}': {}", raw, e))
            })?;

            if negated {
                excludes.push(normalized);
            } else {
                includes.push(normalized);
            }
        }

        if includes.is_empty() {
            return Err(GeneratorError::config(
                "content.files must contain at least one include pattern",
            ));
        }

        Ok(Self {
            includes,
            excludes,
            relative,
        })
    }

    /// Add exclusion patterns on top of the configured ones
    pub fn with_excludes(mut self, extra: &[String]) -> Result<Self> {
        for pattern in extra {
            let normalized = normalize_pattern(pattern.trim_start_matches('!'));
            Pattern::new(&normalized)?;
            self.excludes.push(normalized);
        }
        Ok(self)
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }
}

fn normalize_pattern(pattern: &str) -> String {
    let mut rest = pattern.trim();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}

/// Limits applied while scanning
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum file size in bytes (default: 10MB)
    pub max_file_size: u64,
    /// Allow symbolic links
    pub allow_symlinks: bool,
    /// Give up on a single read after this long
    pub read_timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            allow_symlinks: false,
            read_timeout: None,
        }
    }
}

/// A matched file and its decoded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// Matched paths plus the problems met while enumerating them
#[derive(Debug, Default)]
pub struct FileListing {
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Modification stamp of a scanned file, used to detect changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// Enumerates and reads the files selected by a [`PatternSet`]
#[derive(Debug, Clone)]
pub struct ContentScanner {
    patterns: PatternSet,
    root: PathBuf,
    options: ScanOptions,
}

impl ContentScanner {
    /// Fails with [`GeneratorError::RootNotFound`] when `root` is not a directory
    pub fn new(patterns: PatternSet, root: &Path, options: ScanOptions) -> Result<Self> {
        if !root.is_dir() {
            return Err(GeneratorError::RootNotFound(root.to_path_buf()));
        }
        let root = root
            .canonicalize()
            .map_err(|_| GeneratorError::RootNotFound(root.to_path_buf()))?;

        Ok(Self {
            patterns,
            root,
            options,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Enumerate matching files, sorted and deduplicated. Rejected files are
    /// returned as diagnostics; reporting them is up to the caller.
    pub fn files(&self) -> Result<FileListing> {
        let root_pattern = Pattern::escape(&self.root.to_string_lossy());
        let excludes = self
            .patterns
            .excludes
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        let mut diagnostics = Vec::new();

        for include in &self.patterns.includes {
            // Absolute patterns only pass validation outside relative mode
            let full = if Path::new(include).is_absolute() {
                include.clone()
            } else {
                format!("{}/{}", root_pattern.trim_end_matches('/'), include)
            };
            for entry in glob::glob_with(&full, MATCH_OPTIONS)? {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        diagnostics.push(Diagnostic::new(e.path(), e.error().to_string()));
                        continue;
                    }
                };

                if fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
                    continue;
                }

                let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                if excludes.iter().any(|p| p.matches_path_with(relative, MATCH_OPTIONS)) {
                    continue;
                }

                if let Err(reason) = self.validate_input_file(&path) {
                    tracing::debug!("Skipping file - {}", reason);
                    diagnostics.push(reason);
                    continue;
                }

                seen.insert(path);
            }
        }

        Ok(FileListing {
            files: seen.into_iter().collect(),
            diagnostics,
        })
    }

    /// Lazily read every matched file. Each call enumerates afresh.
    pub fn scan(&self) -> Result<Scan<'_>> {
        let listing = self.files()?;
        Ok(Scan {
            scanner: self,
            pending: listing.files.into_iter(),
            diagnostics: listing.diagnostics,
        })
    }

    /// Read one file, honouring the read timeout
    pub fn read(&self, path: &Path) -> std::result::Result<SourceFile, Diagnostic> {
        let bytes = match self.options.read_timeout {
            None => fs::read(path).map_err(|e| Diagnostic::new(path, e.to_string()))?,
            Some(timeout) => read_with_timeout(path, timeout)?,
        };
        let text = String::from_utf8(bytes)
            .map_err(|_| Diagnostic::new(path, "file is not valid UTF-8"))?;

        Ok(SourceFile {
            path: path.to_path_buf(),
            text,
        })
    }

    /// Stamp every matched file
    pub fn snapshot(&self) -> Result<BTreeMap<PathBuf, FileStamp>> {
        let listing = self.files()?;
        Ok(listing
            .files
            .into_iter()
            .filter_map(|path| {
                let metadata = fs::metadata(&path).ok()?;
                let stamp = FileStamp {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                };
                Some((path, stamp))
            })
            .collect())
    }

    /// Check if a file is safe to read
    fn validate_input_file(&self, path: &Path) -> std::result::Result<(), Diagnostic> {
        let link_metadata =
            fs::symlink_metadata(path).map_err(|e| Diagnostic::new(path, e.to_string()))?;

        if link_metadata.file_type().is_symlink() && !self.options.allow_symlinks {
            return Err(Diagnostic::new(path, "symbolic link not allowed"));
        }

        if self.patterns.relative {
            let canonical = path
                .canonicalize()
                .map_err(|e| Diagnostic::new(path, e.to_string()))?;
            if !canonical.starts_with(&self.root) {
                return Err(Diagnostic::new(
                    path,
                    format!("resolves to '{}' outside the content root", canonical.display()),
                ));
            }
        }

        let metadata = fs::metadata(path).map_err(|e| Diagnostic::new(path, e.to_string()))?;
        if metadata.len() > self.options.max_file_size {
            return Err(Diagnostic::new(
                path,
                format!(
                    "exceeds maximum size limit ({} MB > {} MB)",
                    metadata.len() / (1024 * 1024),
                    self.options.max_file_size / (1024 * 1024)
                ),
            ));
        }

        Ok(())
    }
}

fn read_with_timeout(path: &Path, timeout: Duration) -> std::result::Result<Vec<u8>, Diagnostic> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let owned = path.to_path_buf();
    std::thread::spawn(move || {
        let _ = tx.send(fs::read(&owned));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(Diagnostic::new(path, e.to_string())),
        Err(_) => Err(Diagnostic::new(
            path,
            format!("read timed out after {} ms", timeout.as_millis()),
        )),
    }
}

/// One pass over the matched files
pub struct Scan<'a> {
    scanner: &'a ContentScanner,
    pending: std::vec::IntoIter<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl Scan<'_> {
    /// Problems recorded so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Iterator for Scan<'_> {
    type Item = SourceFile;

    fn next(&mut self) -> Option<SourceFile> {
        for path in self.pending.by_ref() {
            match self.scanner.read(&path) {
                Ok(source) => return Some(source),
                Err(diagnostic) => {
                    tracing::warn!("Skipping unreadable file - {}", diagnostic);
                    self.diagnostics.push(diagnostic);
                }
            }
        }
        None
    }
}
