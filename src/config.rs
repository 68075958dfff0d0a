use std::path::PathBuf;

use thiserror::Error;

pub const SHELL_NAME: &str = "psh";
pub const MAX_LINE_LEN: usize = 4096;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Process-wide settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_path: Vec<PathBuf>,
    pub user: String,
    pub home: Option<PathBuf>,
    pub shell_name: &'static str,
    pub max_line_len: usize,
    pub notes_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let search_path = std::env::var_os("PATH")
            .map(|path| split_search_path(&path.to_string_lossy()))
            .unwrap_or_default();
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let notes_dir = std::env::current_dir().map_err(ConfigError::CurrentDir)?;

        return Ok(Self {
            search_path,
            user,
            home,
            shell_name: SHELL_NAME,
            max_line_len: MAX_LINE_LEN,
            notes_dir,
        });
    }

    #[cfg(test)]
    pub fn with_search_path(mut self, search_path: Vec<PathBuf>) -> Self {
        self.search_path = search_path;
        return self;
    }
}

pub fn split_search_path(path: &str) -> Vec<PathBuf> {
    return path
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .collect();
}
