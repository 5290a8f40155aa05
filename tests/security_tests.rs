use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tailwind_generator::{build, BuildArgs, GeneratorError};
use tempfile::TempDir;

const CONFIG: &str = r#"{"content": {"relative": true, "files": ["**/*.jsx"]}}"#;

fn project() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("tailwind.json");
    fs::write(&config, CONFIG).unwrap();
    (temp_dir, config)
}

fn build_args(config: &Path, output_css: PathBuf) -> BuildArgs {
    BuildArgs {
        config: vec![config.to_path_buf()],
        output_css,
        output_manifest: None,
        minify: false,
        no_preflight: true,
        watch: false,
        debounce_ms: 100,
        jobs: None,
        verbose: true,
        dry_run: true,
        exclude: vec![],
        max_file_size_mb: 10,
        allow_symlinks: false,
        read_timeout_ms: None,
    }
}

#[tokio::test]
async fn test_file_size_limit() {
    let (temp_dir, config) = project();

    let large_file = temp_dir.path().join("large_file.jsx");
    let content = "a".repeat(2 * 1024 * 1024); // 2MB
    fs::write(&large_file, content).unwrap();

    let normal_file = temp_dir.path().join("normal_file.jsx");
    fs::write(&normal_file, r#"export const Component = () => <div className="flex">Test</div>;"#).unwrap();

    let mut args = build_args(&config, temp_dir.path().join("output.css"));
    args.max_file_size_mb = 1;

    // Should succeed but skip the large file
    let result = build(args).await.unwrap();
    assert_eq!(result.total_files_processed, 1);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].message.contains("maximum size"));
}

#[tokio::test]
async fn test_symlink_handling() {
    let (temp_dir, config) = project();

    let real_file = temp_dir.path().join("real_file.jsx");
    fs::write(&real_file, r#"export const Component = () => <div className="flex">Test</div>;"#).unwrap();

    let symlink_file = temp_dir.path().join("symlink_file.jsx");
    symlink(&real_file, &symlink_file).unwrap();

    let outside_dir = TempDir::new().unwrap();
    let outside_file = outside_dir.path().join("outside.jsx");
    fs::write(&outside_file, r#"export const Bad = () => <div className="italic">Bad</div>;"#).unwrap();
    let bad_symlink = temp_dir.path().join("bad_symlink.jsx");
    symlink(&outside_file, &bad_symlink).unwrap();

    // Symlinks are skipped by default
    let result = build(build_args(&config, temp_dir.path().join("output.css")))
        .await
        .unwrap();
    assert_eq!(result.total_files_processed, 1);
    assert_eq!(result.diagnostics.len(), 2);

    // Allowed symlinks must still stay inside the content root
    let mut args = build_args(&config, temp_dir.path().join("output.css"));
    args.allow_symlinks = true;
    let result = build(args).await.unwrap();
    assert_eq!(result.total_files_processed, 2);
    assert!(!result.css_content.contains(".italic"));
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.path.ends_with("bad_symlink.jsx") && d.message.contains("outside the content root")));
}

#[tokio::test]
async fn test_path_traversal_in_content_patterns() {
    let (temp_dir, config) = project();
    fs::write(
        &config,
        r#"{"content": {"relative": true, "files": ["../../etc/*.conf"]}}"#,
    )
    .unwrap();

    let result = build(build_args(&config, temp_dir.path().join("output.css"))).await;
    match result {
        Err(GeneratorError::ConfigError { message }) => {
            assert!(message.contains("escapes the content root"), "{}", message)
        }
        other => panic!("expected a config error, got {:?}", other.map(|r| r.css_content)),
    }
}

#[tokio::test]
async fn test_absolute_pattern_rejected_when_relative() {
    let (temp_dir, config) = project();
    fs::write(
        &config,
        r#"{"content": {"relative": true, "files": ["/etc/*.conf"]}}"#,
    )
    .unwrap();

    let result = build(build_args(&config, temp_dir.path().join("output.css"))).await;
    assert!(matches!(result, Err(GeneratorError::ConfigError { .. })));
}

#[tokio::test]
async fn test_path_traversal_in_output() {
    let (_temp_dir, config) = project();

    let args = build_args(&config, PathBuf::from("../../../etc/evil.css"));
    let result = build(args).await;

    assert!(matches!(result, Err(GeneratorError::SecurityError(_))));
}

#[tokio::test]
async fn test_read_timeout_allows_fast_reads() {
    let (temp_dir, config) = project();
    fs::write(temp_dir.path().join("app.jsx"), r#"<div className="flex" />"#).unwrap();

    let mut args = build_args(&config, temp_dir.path().join("output.css"));
    args.read_timeout_ms = Some(5_000);
    let result = build(args).await.unwrap();

    assert_eq!(result.total_files_processed, 1);
    assert!(result.css_content.contains(".flex {"));
}
