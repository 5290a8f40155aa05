use clap::Parser;
use std::fs;
use std::process::Command;
use tailwind_generator::{BuildArgs, Cli, Commands};
use tempfile::tempdir;

#[test]
fn test_cli_parse_basic() {
    let args = vec![
        "tailwind-generator",
        "build",
        "-c", "tailwind.config.json",
        "-o", "output.css",
    ];

    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Build(args) => {
            assert_eq!(args.config, vec![std::path::PathBuf::from("tailwind.config.json")]);
            assert_eq!(args.output_css.to_str().unwrap(), "output.css");
            assert!(args.output_manifest.is_none());
            assert!(!args.minify);
            assert!(!args.no_preflight);
            assert!(!args.watch);
            assert!(!args.verbose);
            assert!(!args.dry_run);
            assert_eq!(args.debounce_ms, 100);
            assert_eq!(args.max_file_size_mb, 10);
        }
        Commands::Pipe(_) => panic!("Unexpected Pipe command"),
    }
}

#[test]
fn test_cli_parse_with_flags() {
    let args = vec![
        "tailwind-generator",
        "build",
        "-c", "base.yaml",
        "-c", "overrides.json",
        "-o", "dist/styles.css",
        "-m", "dist/manifest.json",
        "--minify",
        "--no-preflight",
        "--watch",
        "--debounce-ms", "250",
        "--verbose",
        "-j", "4",
    ];

    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Build(args) => {
            assert_eq!(args.config.len(), 2);
            assert_eq!(args.output_css.to_str().unwrap(), "dist/styles.css");
            assert_eq!(
                args.output_manifest.as_deref().and_then(|p| p.to_str()),
                Some("dist/manifest.json")
            );
            assert!(args.minify);
            assert!(args.no_preflight);
            assert!(args.watch);
            assert!(args.verbose);
            assert_eq!(args.debounce_ms, 250);
            assert_eq!(args.jobs, Some(4));
        }
        Commands::Pipe(_) => panic!("Unexpected Pipe command"),
    }
}

#[test]
fn test_cli_parse_with_exclude() {
    let args = vec![
        "tailwind-generator",
        "build",
        "-c", "tailwind.config.json",
        "-o", "output.css",
        "-e", "node_modules/**",
        "-e", "dist/**",
    ];

    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Build(args) => {
            assert_eq!(args.exclude, vec!["node_modules/**", "dist/**"]);
        }
        Commands::Pipe(_) => panic!("Unexpected Pipe command"),
    }
}

#[test]
fn test_cli_requires_config_and_output() {
    assert!(Cli::try_parse_from(["tailwind-generator", "build", "-o", "out.css"]).is_err());
    assert!(Cli::try_parse_from(["tailwind-generator", "build", "-c", "tw.json"]).is_err());
}

#[test]
fn test_cli_parse_pipe() {
    let cli = Cli::parse_from(["tailwind-generator", "pipe", "-c", "tw.yaml", "--minify"]);

    match cli.command {
        Commands::Pipe(args) => {
            assert_eq!(args.config.as_deref().and_then(|p| p.to_str()), Some("tw.yaml"));
            assert!(args.minify);
            assert!(!args.no_preflight);
        }
        Commands::Build(_) => panic!("Unexpected Build command"),
    }
}

#[test]
fn test_build_args_validate() {
    let mut args = BuildArgs {
        config: vec!["tailwind.config.json".into()],
        output_css: "output.css".into(),
        output_manifest: Some("manifest.json".into()),
        minify: false,
        no_preflight: false,
        watch: false,
        debounce_ms: 100,
        jobs: None,
        verbose: false,
        dry_run: false,
        exclude: vec![],
        max_file_size_mb: 10,
        allow_symlinks: false,
        read_timeout_ms: None,
    };

    // Valid args should pass
    assert!(args.validate().is_ok());

    // Same output paths should fail
    args.output_manifest = Some(args.output_css.clone());
    assert!(args.validate().is_err());
    args.output_manifest = None;

    // Zero jobs should fail
    args.jobs = Some(0);
    assert!(args.validate().is_err());
    args.jobs = Some(4);
    assert!(args.validate().is_ok());

    // Debounce below the floor should fail
    args.debounce_ms = 9;
    assert!(args.validate().is_err());
    args.debounce_ms = 10;
    assert!(args.validate().is_ok());

    // Watching a dry run makes no sense
    args.watch = true;
    args.dry_run = true;
    assert!(args.validate().is_err());
}

#[test]
fn test_binary_exit_codes() {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();
    let config = root.join("tailwind.config.json");
    fs::write(&config, r#"{"content": {"relative": true, "files": ["*.html"]}}"#).unwrap();
    fs::write(root.join("index.html"), r#"<p class="flex italic">"#).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tailwind-generator"))
        .args(["build", "-c"])
        .arg(&config)
        .arg("-o")
        .arg(root.join("out.css"))
        .arg("--no-preflight")
        .output()
        .expect("Failed to run tailwind-generator");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let css = fs::read_to_string(root.join("out.css")).unwrap();
    assert!(css.contains(".flex {") && css.contains(".italic {"));

    let missing = Command::new(env!("CARGO_BIN_EXE_tailwind-generator"))
        .args(["build", "-c"])
        .arg(root.join("nope.json"))
        .arg("-o")
        .arg(root.join("out.css"))
        .output()
        .expect("Failed to run tailwind-generator");
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Error:"));
}
