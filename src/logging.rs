//! Diagnostic logging to a file. The terminal belongs to the TUI, so nothing
//! is ever written to stdout or stderr from here.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "cardchat.log";

pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "cardchat=debug"
    } else {
        "cardchat=warn"
    }
}

/// Install the global subscriber writing to `<log_dir>/cardchat.log`.
/// `RUST_LOG` overrides the default filter. Returns the log file path.
pub fn init(log_dir: &Path, debug: bool) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let path = log_dir.join(LOG_FILE_NAME);
    let log_file = log_file_opts.open(&path)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .with_filter(env_filter);

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_default_level() {
        assert_eq!(default_filter(false), "cardchat=warn");
        assert_eq!(default_filter(true), "cardchat=debug");
    }

    #[test]
    fn init_creates_the_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("logs");
        let path = init(&nested, false).expect("init");
        assert_eq!(path, nested.join(LOG_FILE_NAME));
        assert!(path.exists());
    }
}
