//! Layered configuration loading

use crate::integration::test_utils::with_isolated_env;
use casegen::config::{CasegenConfig, ConfigLoader};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_no_files_yield_defaults() {
    let test_dir = TempDir::new().unwrap();
    with_isolated_env(&test_dir, || {
        let workspace = test_dir.path().join("ws");
        std::fs::create_dir_all(&workspace).unwrap();
        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config, CasegenConfig::default());
    });
}

#[test]
fn test_layers_apply_in_order() {
    let test_dir = TempDir::new().unwrap();
    with_isolated_env(&test_dir, || {
        write(
            &test_dir.path().join("xdg").join("casegen").join("config.toml"),
            r#"
[model]
host = "http://gpu-box:11434"
name = "global"
timeout_secs = 120

[generation]
max_retries = 3
"#,
        );
        let workspace = test_dir.path().join("ws");
        write(
            &workspace.join("config").join("config.toml"),
            "[model]\nname = \"workspace\"\n\n[generation]\nconcurrency = 2\n",
        );
        write(
            &workspace.join("config").join("development.toml"),
            "[generation]\nconcurrency = 3\n",
        );
        std::env::set_var("CASEGEN__MODEL__NAME", "from-env");

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.model.host, "http://gpu-box:11434");
        assert_eq!(config.model.name, "from-env");
        assert_eq!(config.model.timeout(), Duration::from_secs(120));
        assert_eq!(config.generation.concurrency, 3);
        assert_eq!(config.generation.max_retries, 3);
    });
}

#[test]
fn test_legacy_variables_win_and_are_cleaned() {
    let test_dir = TempDir::new().unwrap();
    with_isolated_env(&test_dir, || {
        let workspace = test_dir.path().join("ws");
        write(
            &workspace.join("config").join("config.toml"),
            "[model]\nhost = \"http://10.1.1.1:11434\"\nname = \"workspace\"\n",
        );
        std::env::set_var("OLLAMA_HOST", "\"http://localhost:11500\"");
        std::env::set_var("MODEL_NAME", "llama3");

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.model.host, "http://127.0.0.1:11500");
        assert_eq!(config.model.name, "llama3");
    });
}

#[test]
fn test_invalid_values_are_reported_by_validate() {
    let test_dir = TempDir::new().unwrap();
    with_isolated_env(&test_dir, || {
        let file = test_dir.path().join("bad.toml");
        write(
            &file,
            "[model]\nname = \"\"\ntimeout_secs = 0\n\n[generation]\nconcurrency = 0\n",
        );
        let config = ConfigLoader::load_from_file(&file).unwrap();
        let errors = config.validate().unwrap_err();
        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(rendered.iter().any(|e| e.contains("Model name cannot be empty")));
        assert!(rendered.iter().any(|e| e.contains("Concurrency")));
    });
}

#[test]
fn test_malformed_toml_is_an_error() {
    let test_dir = TempDir::new().unwrap();
    with_isolated_env(&test_dir, || {
        let file = test_dir.path().join("broken.toml");
        write(&file, "[model\nname = ");
        assert!(ConfigLoader::load_from_file(&file).is_err());
    });
}
