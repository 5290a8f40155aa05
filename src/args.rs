use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tailwind-style stylesheet generator - scans content files for utility
/// classes and emits only the CSS they need
#[derive(Parser, Debug)]
#[command(name = "tailwind-generator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the configured content files and write the stylesheet
    Build(BuildArgs),
    /// Read text from stdin and write the matching CSS to stdout
    Pipe(PipeArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Configuration file(s), later files layered over earlier ones
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        required = true,
        help = "Configuration file (YAML or JSON); repeat to layer several"
    )]
    pub config: Vec<PathBuf>,

    /// Output CSS file path
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        required = true,
        help = "Path where the generated CSS file will be written"
    )]
    pub output_css: PathBuf,

    /// Output manifest file path (JSON)
    #[arg(
        short = 'm',
        long = "manifest",
        value_name = "PATH",
        help = "Path where the JSON build manifest will be written"
    )]
    pub output_manifest: Option<PathBuf>,

    /// Enable CSS minification
    #[arg(
        long = "minify",
        default_value_t = false,
        help = "Enable minification of the output CSS"
    )]
    pub minify: bool,

    /// Disable preflight CSS generation
    #[arg(
        long = "no-preflight",
        default_value_t = false,
        help = "Disable generation of the preflight/reset CSS"
    )]
    pub no_preflight: bool,

    /// Watch mode (continuously watch for changes)
    #[arg(
        short = 'w',
        long = "watch",
        default_value_t = false,
        help = "Watch content files and rebuild on change"
    )]
    pub watch: bool,

    #[arg(
        long = "debounce-ms",
        value_name = "MS",
        default_value_t = 100,
        help = "Quiet period before a burst of changes triggers a rebuild"
    )]
    pub debounce_ms: u64,

    /// Number of parallel threads to use
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "NUM",
        help = "Number of parallel threads to use (defaults to number of CPU cores)"
    )]
    pub jobs: Option<usize>,

    /// Verbose output
    #[arg(
        short = 'v',
        long = "verbose",
        default_value_t = false,
        help = "Enable verbose output"
    )]
    pub verbose: bool,

    /// Dry run (don't write output files)
    #[arg(
        long = "dry-run",
        default_value_t = false,
        help = "Perform the build but don't write output files"
    )]
    pub dry_run: bool,

    /// Exclude patterns (glob patterns to exclude)
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        help = "Patterns to exclude from scanning, relative to the content root"
    )]
    pub exclude: Vec<String>,

    #[arg(
        long = "max-file-size",
        value_name = "MB",
        default_value_t = 10,
        help = "Skip content files larger than this many megabytes"
    )]
    pub max_file_size_mb: u64,

    #[arg(
        long = "allow-symlinks",
        default_value_t = false,
        help = "Follow symbolic links inside the content root"
    )]
    pub allow_symlinks: bool,

    #[arg(
        long = "read-timeout-ms",
        value_name = "MS",
        help = "Give up on a content file that takes longer than this to read"
    )]
    pub read_timeout_ms: Option<u64>,
}

/// Arguments for the pipe command
#[derive(Parser, Debug, Clone)]
pub struct PipeArgs {
    /// Configuration file for theme tokens; content patterns are ignored
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Configuration file (YAML or JSON) supplying theme tokens"
    )]
    pub config: Option<PathBuf>,

    /// Enable CSS minification
    #[arg(
        long = "minify",
        default_value_t = false,
        help = "Enable minification of the output CSS"
    )]
    pub minify: bool,

    /// Disable preflight CSS generation
    #[arg(
        long = "no-preflight",
        default_value_t = false,
        help = "Disable generation of the preflight/reset CSS"
    )]
    pub no_preflight: bool,
}

impl BuildArgs {
    /// Validate that the arguments are consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.config.is_empty() {
            return Err("At least one configuration file must be provided".to_string());
        }

        if self.output_manifest.as_ref() == Some(&self.output_css) {
            return Err("Output CSS and manifest paths must be different".to_string());
        }

        if let Some(jobs) = self.jobs {
            if jobs == 0 {
                return Err("Number of jobs must be at least 1".to_string());
            }
        }

        if self.debounce_ms < 10 {
            return Err("Debounce window must be at least 10 ms".to_string());
        }

        if self.max_file_size_mb == 0 {
            return Err("Maximum file size must be at least 1 MB".to_string());
        }

        if self.read_timeout_ms == Some(0) {
            return Err("Read timeout must be at least 1 ms".to_string());
        }

        if self.watch && self.dry_run {
            return Err("--watch and --dry-run cannot be combined".to_string());
        }

        Ok(())
    }
}
