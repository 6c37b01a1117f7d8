use super::data::{Config, DEFAULT_BASE_URL, DEFAULT_MODEL};
use super::io::ConfigError;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.resolve_model(None), DEFAULT_MODEL);
    assert_eq!(config.resolve_base_url(None), DEFAULT_BASE_URL);
}

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
model = "gemini-2.5-pro"
base_url = "http://localhost:8080/v1beta/"
syntax_theme = "Solarized (dark)"
camera_command = ["imagesnap", "-"]
dictation_command = ["whisper-listen", "--once"]
"#,
    )
    .expect("write config");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(config.model.as_deref(), Some("gemini-2.5-pro"));
    assert_eq!(config.syntax_theme.as_deref(), Some("Solarized (dark)"));
    assert_eq!(config.camera_command, vec!["imagesnap", "-"]);
    assert_eq!(config.dictation_command, vec!["whisper-listen", "--once"]);
    assert_eq!(config.resolve_base_url(None), "http://localhost:8080/v1beta");
}

#[test]
fn overrides_take_precedence() {
    let config = Config {
        model: Some("from-file".to_string()),
        base_url: Some("http://file".to_string()),
        ..Default::default()
    };
    assert_eq!(config.resolve_model(Some("from-cli")), "from-cli");
    assert_eq!(config.resolve_model(None), "from-file");
    assert_eq!(config.resolve_base_url(Some("http://env")), "http://env");
    assert_eq!(config.resolve_base_url(Some("  ")), "http://file");
}

#[test]
fn test_parse_error_names_the_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "model = [").expect("write config");

    let err = Config::load_from_path(&config_path).expect_err("parse should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}
