use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const EXTRACTED_TEXT_FILE_NAME: &str = "extracted-text.txt";
const DOWNLOADS_SUBDIR: &str = "Downloads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("file name is empty")]
    MissingFileName,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Saves recognized text as a named file.
pub trait TextExporter {
    fn export(&self, file_name: &str, text: &str) -> StorageResult<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct DownloadsExporter {
    dir: PathBuf,
}

impl DownloadsExporter {
    pub const fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// `configured`, else `$XDG_DOWNLOAD_DIR`, else `$HOME/Downloads`.
    pub fn with_default_dir(configured: Option<&Path>) -> StorageResult<Self> {
        if let Some(dir) = configured {
            return Ok(Self::with_dir(dir.to_path_buf()));
        }
        if let Some(dir) = std::env::var_os("XDG_DOWNLOAD_DIR").filter(|dir| !dir.is_empty()) {
            return Ok(Self::with_dir(PathBuf::from(dir)));
        }
        let home = std::env::var_os("HOME").ok_or(StorageError::MissingHomeDirectory)?;
        Ok(Self::with_dir(PathBuf::from(home).join(DOWNLOADS_SUBDIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_path(&self, file_name: &str) -> StorageResult<PathBuf> {
        if file_name.trim().is_empty() {
            return Err(StorageError::MissingFileName);
        }
        Ok(self.dir.join(file_name))
    }
}

impl TextExporter for DownloadsExporter {
    fn export(&self, file_name: &str, text: &str) -> StorageResult<PathBuf> {
        let target = self.target_path(file_name)?;
        write_overwrite(&target, text.as_bytes())?;
        tracing::info!(path = %target.display(), bytes = text.len(), "saved text file");
        Ok(target)
    }
}

fn write_overwrite(destination: &Path, contents: &[u8]) -> StorageResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::remove_file(destination) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(StorageError::Io(err)),
    }
    fs::write(destination, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_path_joins_file_name() {
        let exporter = DownloadsExporter::with_dir(PathBuf::from("/home/test/Downloads"));
        assert_eq!(
            exporter.target_path(EXTRACTED_TEXT_FILE_NAME).unwrap(),
            PathBuf::from("/home/test/Downloads/extracted-text.txt")
        );
        assert!(matches!(
            exporter.target_path("  "),
            Err(StorageError::MissingFileName)
        ));
    }

    #[test]
    fn configured_dir_wins() {
        let exporter = DownloadsExporter::with_default_dir(Some(Path::new("/srv/out"))).unwrap();
        assert_eq!(exporter.dir(), Path::new("/srv/out"));
    }

    #[test]
    fn export_overwrites_existing_file() {
        let dir = std::env::temp_dir().join("snaptext-export-test");
        let exporter = DownloadsExporter::with_dir(dir.clone());

        let first = exporter.export(EXTRACTED_TEXT_FILE_NAME, "first").unwrap();
        let second = exporter.export(EXTRACTED_TEXT_FILE_NAME, "second").unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "second");
        let _ = std::fs::remove_dir_all(dir);
    }
}
