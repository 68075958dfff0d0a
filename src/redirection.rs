use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Redirect {
    #[default]
    None,
    FromFile(PathBuf),
    ToFileTruncate(PathBuf),
    ToFileAppend(PathBuf),
}

#[derive(Error, Debug)]
#[error("{}: {}", .path.display(), .source)]
pub struct RedirectError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl Redirect {
    /// Opens the target for reading, truncating or appending.
    pub fn open(&self) -> Result<Option<File>, RedirectError> {
        let (path, opened) = match self {
            Redirect::None => return Ok(None),
            Redirect::FromFile(path) => (path, File::open(path)),
            Redirect::ToFileTruncate(path) => (path, File::create(path)),
            Redirect::ToFileAppend(path) => (
                path,
                OpenOptions::new().append(true).create(true).open(path),
            ),
        };

        return opened.map(Some).map_err(|source| RedirectError {
            path: path.clone(),
            source,
        });
    }
}
