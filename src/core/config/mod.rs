pub mod data;
pub mod io;

#[cfg(test)]
pub mod tests;

pub use data::{path_display, Config, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use io::ConfigError;
