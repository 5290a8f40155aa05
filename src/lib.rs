pub mod args;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod manifest;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod stylesheet;
pub mod tokens;
pub mod utilities;
pub mod variants;
pub mod watch;

pub use args::{BuildArgs, Cli, Commands, PipeArgs};
pub use config::{ContentConfig, TailwindConfig, ThemeConfig};
pub use errors::{Diagnostic, GeneratorError, Result};
pub use extractor::{extract, extract_candidates, Candidate};
pub use manifest::{Manifest, ManifestBuilder};
pub use pipeline::{BuildOutput, PerformanceStats, Pipeline, PipelineOptions, PipelineState};
pub use resolver::{Declaration, Plugin, ResolvedUtility, Resolver};
pub use scanner::{ContentScanner, PatternSet, ScanOptions, SourceFile};
pub use stylesheet::{generate, RenderOptions, Stylesheet};
pub use tokens::{TokenTable, TokenTree};
pub use watch::WatchOptions;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of the build command
#[derive(Debug)]
pub struct BuildResult {
    pub css_content: String,
    pub manifest: Manifest,
    pub total_classes: usize,
    pub total_files_processed: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub performance_stats: PerformanceStats,
}

/// Turn the CLI arguments into a ready pipeline. Fails before any scanning on
/// a bad config, a missing content root or an unsafe output path.
pub fn prepare_pipeline(args: &BuildArgs) -> Result<Pipeline> {
    args.validate().map_err(GeneratorError::InvalidInput)?;

    let working_dir = std::env::current_dir()?;
    validate_output_path(&args.output_css, &working_dir)?;
    if let Some(manifest) = &args.output_manifest {
        validate_output_path(manifest, &working_dir)?;
    }

    let config = TailwindConfig::from_files(&args.config)?;
    let options = PipelineOptions {
        scan: ScanOptions {
            max_file_size: args.max_file_size_mb * 1024 * 1024,
            allow_symlinks: args.allow_symlinks,
            read_timeout: args.read_timeout_ms.map(Duration::from_millis),
        },
        render: RenderOptions {
            minify: args.minify,
            header: true,
        },
        preflight: !args.no_preflight,
        excludes: args.exclude.clone(),
    };

    if let Some(jobs) = args.jobs {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global();
    }

    let pipeline = Pipeline::new(&config, args.config.last().map(PathBuf::as_path), options)?;

    if args.verbose {
        tracing::info!("Config: {:?}", args.config);
        tracing::info!("Content root: {}", pipeline.scanner().root().display());
        tracing::info!("Content patterns: {:?}", pipeline.scanner().patterns().includes());
        tracing::info!("Output CSS: {}", args.output_css.display());
        tracing::info!("Security: max file size = {} MB", args.max_file_size_mb);
    }

    Ok(pipeline)
}

/// One-shot build
pub async fn build(args: BuildArgs) -> Result<BuildResult> {
    let pipeline = prepare_pipeline(&args)?;

    #[cfg(feature = "cli")]
    let (mut pipeline, progress_bar) = if args.verbose {
        (pipeline, None)
    } else {
        let total = pipeline.scanner().files()?.files.len() as u64;
        let pb = new_progress_bar(total);
        let hook_pb = pb.clone();
        let pipeline = pipeline.with_progress(std::sync::Arc::new(move |path: &Path| {
            hook_pb.inc(1);
            hook_pb.set_message(format!(
                "Processing: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ));
        }));
        (pipeline, Some(pb))
    };
    #[cfg(not(feature = "cli"))]
    let mut pipeline = pipeline;

    let output = pipeline.run()?;

    #[cfg(feature = "cli")]
    {
        if let Some(pb) = progress_bar {
            pb.finish_with_message(format!(
                "✓ Complete ({:.1} files/sec)",
                output.stats.files_per_second
            ));
        }
    }

    let manifest = manifest_for(&output, pipeline.plugins());

    if !args.dry_run {
        write_output_files(&args, &output.css, &manifest)?;
    }

    log_summary(&output, args.verbose);

    Ok(BuildResult {
        total_classes: output.resolved(),
        total_files_processed: output.files_scanned,
        css_content: output.css,
        manifest,
        diagnostics: output.diagnostics,
        performance_stats: output.stats,
    })
}

/// Build, then keep rebuilding on changes until Ctrl-C
pub async fn watch_build(args: BuildArgs) -> Result<()> {
    let pipeline = prepare_pipeline(&args)?;
    let plugins = pipeline.plugins().to_vec();
    let options = WatchOptions::new(Duration::from_millis(args.debounce_ms));

    watch::watch(pipeline, options, |output| {
        let manifest = manifest_for(output, &plugins);
        write_output_files(&args, &output.css, &manifest)?;
        log_summary(output, args.verbose);
        Ok(())
    })
    .await?;

    Ok(())
}

/// Handle pipe command - read text from stdin, output CSS to stdout
pub async fn handle_pipe_command(args: PipeArgs) -> Result<()> {
    use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

    let mut input = String::new();
    let mut stdin = io::stdin();
    stdin
        .read_to_string(&mut input)
        .await
        .map_err(|e| GeneratorError::InputError(format!("Failed to read from stdin: {}", e)))?;

    let config = match &args.config {
        Some(path) => TailwindConfig::from_file(path)?,
        None => TailwindConfig::default(),
    };
    let resolver = Resolver::new(config.token_table()?);
    let options = PipelineOptions {
        render: RenderOptions {
            minify: args.minify,
            header: true,
        },
        preflight: !args.no_preflight,
        ..PipelineOptions::default()
    };
    let css_content = pipeline::render_text(&resolver, &input, &options);

    let stdout_error = |e: std::io::Error| GeneratorError::OutputError {
        path: "stdout".to_string(),
        message: e.to_string(),
    };
    let mut stdout = io::stdout();
    stdout
        .write_all(css_content.as_bytes())
        .await
        .map_err(stdout_error)?;
    stdout.flush().await.map_err(stdout_error)?;

    Ok(())
}

/// Manifest describing one build
pub fn manifest_for(output: &BuildOutput, plugins: &[String]) -> Manifest {
    ManifestBuilder::new()
        .with_files_processed(output.files_scanned)
        .with_unresolved(output.unresolved)
        .with_plugins(plugins)
        .with_class_info(output.class_locations.clone())
        .with_diagnostics(&output.diagnostics)
        .with_processing_time(output.stats.total_duration.as_millis() as u64)
        .build(output.css.len())
}

fn log_summary(output: &BuildOutput, verbose: bool) {
    for diagnostic in &output.diagnostics {
        tracing::warn!("Skipped {}", diagnostic);
    }
    if !output.diagnostics.is_empty() {
        tracing::warn!("Skipped {} files", output.diagnostics.len());
    }

    tracing::info!(
        "Generated {} rules for {} classes from {} files",
        output.rules,
        output.resolved(),
        output.files_scanned
    );

    if verbose {
        let stats = &output.stats;
        tracing::info!("  - Unresolved candidates: {}", output.unresolved);
        tracing::info!("  - Total time: {:.2}s", stats.total_duration.as_secs_f64());
        tracing::info!("  - Extraction: {:.2}s", stats.extraction_duration.as_secs_f64());
        tracing::info!("  - Resolution: {:.2}s", stats.resolution_duration.as_secs_f64());
        tracing::info!("  - CSS generation: {:.2}s", stats.css_generation_duration.as_secs_f64());
        tracing::info!("  - Processing rate: {:.1} files/sec", stats.files_per_second);
        tracing::info!(
            "  - Data processed: {:.2} MB",
            stats.bytes_processed as f64 / (1024.0 * 1024.0)
        );
    }
}

#[cfg(feature = "cli")]
fn new_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb.set_message("Scanning...");
    pb
}

/// Reject relative output paths that climb out of the working directory
fn validate_output_path(path: &Path, working_dir: &Path) -> Result<()> {
    if path.is_absolute() {
        return Ok(());
    }
    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => depth -= 1,
            std::path::Component::Normal(_) => depth += 1,
            _ => {}
        }
        if depth < 0 {
            return Err(GeneratorError::SecurityError(format!(
                "Output path '{}' escapes the working directory '{}'",
                path.display(),
                working_dir.display()
            )));
        }
    }
    Ok(())
}

/// Write the stylesheet and manifest with atomic writes
fn write_output_files(args: &BuildArgs, css: &str, manifest: &Manifest) -> Result<()> {
    write_output(&args.output_css, css)?;

    if let Some(path) = &args.output_manifest {
        let manifest_content = if args.minify {
            manifest.to_compact_json()?
        } else {
            manifest.to_pretty_json()?
        };
        write_output(path, &manifest_content)?;
    }

    Ok(())
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    let output_error = |e: std::io::Error| GeneratorError::OutputError {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(output_error)?;
    }
    write_atomic(path, content).map_err(output_error)
}

/// Write file atomically by writing to temp file then renaming
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}
