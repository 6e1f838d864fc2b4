//! On-disk copies of each project's cluster listing, kept for debugging.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub struct ListingCache {
    dir: PathBuf,
}

impl ListingCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.cache/pier`, or the platform equivalent.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
            .unwrap_or_else(|| PathBuf::from("/"))
            .join("pier")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, project_id: &str) -> PathBuf {
        self.dir.join(format!("{project_id}.json"))
    }

    /// Overwrite the cached listing for a project.
    pub fn store(&self, project_id: &str, listing: &serde_json::Value) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Creating cache directory {}", self.dir.display()))?;

        let path = self.path_for(project_id);
        let data = serde_json::to_vec(listing).context("Serializing cluster listing")?;
        let mut file = open_for_overwrite(&path)
            .with_context(|| format!("Opening cache file {}", path.display()))?;
        file.write_all(&data)
            .with_context(|| format!("Writing cache file {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(unix)]
fn open_for_overwrite(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_overwrite(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
