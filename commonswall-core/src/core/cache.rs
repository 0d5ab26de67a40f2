use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::database::PageId;
use crate::services::Transport;

/// Flat directory of downloaded images named `<page id><extension>`.
pub struct ImageCache {
    dir: PathBuf,
}

impl ImageCache {
    pub fn new(dir: &Path) -> Self {
        ImageCache {
            dir: dir.to_path_buf(),
        }
    }

    /// Scan the directory for a file whose stem is the page id.
    pub fn exists(&self, id: PageId) -> Result<Option<PathBuf>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let wanted = id.to_string();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(wanted.as_str()) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    pub fn fetch<T: Transport>(&self, id: PageId, url: &str, transport: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}{}", id, url_extension(url)));
        info!("Downloading {} to {}.", url, path.display());
        transport.download(url, &path)?;
        Ok(path)
    }

    /// Delete the cached file for `id`. Returns the removed path, if any.
    pub fn remove(&self, id: PageId) -> Result<Option<PathBuf>> {
        match self.exists(id)? {
            Some(path) => {
                info!("Removing image: {}.", path.display());
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }
}

/// Extension of the last URL path segment, including the dot, or "".
fn url_extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    Path::new(segment)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
