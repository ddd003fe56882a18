use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create `dir` when missing and check that files can be created in it.
pub fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StateDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    Ok(())
}

/// Writes whole files under one directory; readers see either the old or the
/// new content, never a mix.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_state_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// `Ok(None)` when the file has never been written.
    pub fn read(&self, filename: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.dir.join(filename)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
