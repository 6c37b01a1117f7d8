use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Model used for new chats (e.g., "gemini-2.5-pro")
    pub model: Option<String>,
    /// API root, without the `/models/...` suffix
    pub base_url: Option<String>,
    /// UI theme name ("dark" or "light")
    pub theme: Option<String>,
    /// Syntect theme for code cards; picked from the terminal background
    /// when unset
    pub syntax_theme: Option<String>,
    /// Program and arguments that write one still image to stdout
    #[serde(default)]
    pub camera_command: Vec<String>,
    /// Program and arguments that print recognized speech to stdout
    #[serde(default)]
    pub dictation_command: Vec<String>,
}

impl Config {
    /// The model to use, preferring an explicit override.
    pub fn resolve_model(&self, cli_model: Option<&str>) -> String {
        cli_model
            .or(self.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    /// The API root to use, preferring the environment over the file.
    pub fn resolve_base_url(&self, env_base_url: Option<&str>) -> String {
        env_base_url
            .filter(|url| !url.trim().is_empty())
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
