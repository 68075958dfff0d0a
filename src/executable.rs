use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::redirection::RedirectError;

#[derive(Error, Debug)]
pub enum ExecutableError {
    #[error("{0}: command not found")]
    CommandNotFound(String),

    #[error(transparent)]
    Redirect(#[from] RedirectError),

    #[error("{name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

pub trait ExecutablePathFinder {
    fn find_executable_path(&self, search_path: &[PathBuf], name: &str) -> Option<PathBuf> {
        if name.contains('/') {
            let path = PathBuf::from(name);
            return is_executable(&path).then_some(path);
        }

        for dir in search_path {
            let full_path = dir.join(name);
            if is_executable(&full_path) {
                debug!("{} resolved to {}", name, full_path.display());
                return Some(full_path);
            }
        }

        debug!("{} not found in {} directories", name, search_path.len());
        return None;
    }
}

fn is_executable(path: &Path) -> bool {
    return path
        .metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0);
}

pub struct PathFinder {}

impl ExecutablePathFinder for PathFinder {}

impl PathFinder {
    pub fn new() -> Self {
        return Self {};
    }
}
