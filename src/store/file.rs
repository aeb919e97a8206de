use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
use crate::models::StoreDocument;

/// The on-disk store document. The store is its only writer.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents, or `None` if the file does not exist.
    pub fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the full document.
    ///
    /// The document goes to a sibling temp file first and is renamed over the
    /// target, so readers never observe a partially written file.
    pub fn write(&self, document: &StoreDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp = self.sibling("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Copy an unreadable document aside before it is replaced.
    pub fn back_up_corrupt(&self) -> Result<PathBuf> {
        let backup = self.sibling(&format!("corrupt-{}", Utc::now().format("%Y%m%dT%H%M%SZ")));
        fs::copy(&self.path, &backup)?;
        Ok(backup)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
