use std::fs;
use std::path::{Path, PathBuf};
use tailwind_generator::{build, BuildArgs, GeneratorError, Pipeline, PipelineOptions, TailwindConfig};
use tempfile::TempDir;

fn build_args(config: &Path, output_css: PathBuf) -> BuildArgs {
    BuildArgs {
        config: vec![config.to_path_buf()],
        output_css,
        output_manifest: None,
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
    }
}

#[tokio::test]
async fn test_error_message_for_missing_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("missing.json");

    let result = build(build_args(&config, temp_dir.path().join("out.css"))).await;
    let error_msg = result.unwrap_err().to_string();
    assert!(
        error_msg.contains("missing.json"),
        "Error message should contain the config path: {}",
        error_msg
    );
}

#[tokio::test]
async fn test_error_message_for_malformed_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.json");
    fs::write(&config, r#"{"content": {"files": ["*.html"]"#).unwrap();

    let result = build(build_args(&config, temp_dir.path().join("out.css"))).await;
    match result {
        Err(GeneratorError::ConfigError { message }) => {
            assert!(message.contains("JSON"), "unexpected message: {}", message)
        }
        other => panic!("expected a config error, got {:?}", other.map(|r| r.css_content)),
    }
}

#[tokio::test]
async fn test_error_message_for_malformed_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.yaml");
    fs::write(&config, "content:\n  files: [\"*.html\"\ntheme: {").unwrap();

    let result = build(build_args(&config, temp_dir.path().join("out.css"))).await;
    match result {
        Err(GeneratorError::ConfigError { message }) => {
            assert!(message.contains("YAML"), "unexpected message: {}", message)
        }
        other => panic!("expected a config error, got {:?}", other.map(|r| r.css_content)),
    }
}

#[tokio::test]
async fn test_unsupported_config_format() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.config.js");
    fs::write(&config, "module.exports = {}").unwrap();

    let result = build(build_args(&config, temp_dir.path().join("out.css"))).await;
    let error_msg = result.unwrap_err().to_string();
    assert!(error_msg.contains("Unsupported config file format"), "{}", error_msg);
}

#[test]
fn test_missing_content_root_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("site").join("tailwind.json");
    let config =
        TailwindConfig::from_json_str(r#"{"content": {"relative": true, "files": ["*.html"]}}"#)
            .unwrap();

    let err = Pipeline::new(&config, Some(&config_path), PipelineOptions::default()).unwrap_err();
    assert!(matches!(err, GeneratorError::RootNotFound(_)));
    assert!(err.to_string().contains("site"), "{}", err);
}

#[tokio::test]
async fn test_error_message_for_invalid_glob_pattern() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.json");
    fs::write(&config, r#"{"content": {"relative": true, "files": ["src/[invalid"]}}"#).unwrap();

    let result = build(build_args(&config, temp_dir.path().join("out.css"))).await;
    match result {
        Err(GeneratorError::ConfigError { message }) => {
            assert!(message.contains("src/[invalid"), "{}", message)
        }
        other => panic!("expected a config error, got {:?}", other.map(|r| r.css_content)),
    }
}

#[tokio::test]
async fn test_empty_content_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.json");
    fs::write(&config, r#"{"content": []}"#).unwrap();

    let result = build(build_args(&config, temp_dir.path().join("out.css"))).await;
    assert!(matches!(result, Err(GeneratorError::ConfigError { .. })));
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.json");
    fs::write(&config, r#"{"content": ["*.html"]}"#).unwrap();

    let mut args = build_args(&config, temp_dir.path().join("out.css"));
    args.debounce_ms = 5;
    assert!(matches!(build(args).await, Err(GeneratorError::InvalidInput(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_error_message_for_write_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let config = root.join("tailwind.json");
    fs::write(&config, r#"{"content": {"relative": true, "files": ["*.html"]}}"#).unwrap();
    fs::write(root.join("index.html"), r#"<p class="flex">"#).unwrap();

    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    // Root ignores permission bits
    if fs::write(locked.join("probe"), "").is_ok() {
        return;
    }

    let result = build(build_args(&config, locked.join("out.css"))).await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    match result {
        Err(GeneratorError::OutputError { path, message }) => {
            assert!(path.ends_with("out.css"));
            assert!(!message.is_empty());
        }
        other => panic!("expected an output error, got {:?}", other.map(|r| r.css_content)),
    }
}

#[tokio::test]
async fn test_unreadable_files_do_not_abort_the_build() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let config = root.join("tailwind.json");
    fs::write(&config, r#"{"content": {"relative": true, "files": ["*.html"]}}"#).unwrap();
    fs::write(root.join("good.html"), r#"<p class="italic">"#).unwrap();
    fs::write(root.join("binary.html"), [0xc3, 0x28, 0xa0, 0xa1]).unwrap();

    let mut args = build_args(&config, root.join("out.css"));
    args.dry_run = true;
    let result = build(args).await.unwrap();

    assert_eq!(result.total_files_processed, 1);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].path.ends_with("binary.html"));
    assert!(result.css_content.contains(".italic {"));

    let manifest = result.manifest.to_json();
    assert_eq!(manifest["diagnostics"][0]["message"], "file is not valid UTF-8");
}
