use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ingest_logging::ingest_info;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn prepare_dir(dir: &Path) -> Result<(), ExportError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ExportError::OutputDir(format!(
            "{} is not a directory",
            dir.display()
        ))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir)
            .map_err(|err| ExportError::OutputDir(format!("{}: {err}", dir.display()))),
        Err(err) => Err(ExportError::OutputDir(format!("{}: {err}", dir.display()))),
    }
}

/// Replaces files whole, so a reader never sees a half-written snapshot.
pub struct ExportWriter {
    dir: PathBuf,
}

impl ExportWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writer for an explicit target path, splitting it into directory and file name.
    pub fn for_target(target: &Path) -> (Self, String) {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ingest_core::EXPORT_FILENAME.to_string());
        (Self::new(dir), filename)
    }

    pub fn write(&self, filename: &str, snapshot: &str) -> Result<PathBuf, ExportError> {
        prepare_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(snapshot.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| ExportError::Io(e.error))?;

        ingest_info!("wrote {} bytes to {:?}", snapshot.len(), target);
        Ok(target)
    }
}
