use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Raw bulletin pages on disk, one `{md5(url)}.html` file per URL. URLs known
/// to have no page get an empty `{md5(url)}.missing` marker instead.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub pages: usize,
    pub absent: usize,
    pub bytes: u64,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.html", cache_key(url)))
    }

    pub fn absent_path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.missing", cache_key(url)))
    }

    pub fn is_known_absent(&self, url: &str) -> bool {
        self.absent_path_for(url).exists()
    }

    pub fn read(&self, url: &str) -> Result<Option<String>> {
        let path = self.path_for(url);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read cached page {}", path.display()))?;
        Ok(Some(content))
    }

    pub fn write(&self, url: &str, body: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;

        let path = self.path_for(url);
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write cached page {}", path.display()))?;
        Ok(path)
    }

    pub fn mark_absent(&self, url: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;

        let path = self.absent_path_for(url);
        std::fs::write(&path, "")
            .with_context(|| format!("failed to write absent marker {}", path.display()))?;
        Ok(path)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        if !self.dir.exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(&self.dir).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.path().extension().and_then(|s| s.to_str()) {
                Some("html") => {
                    stats.pages += 1;
                    stats.bytes += entry.metadata()?.len();
                }
                Some("missing") => stats.absent += 1,
                _ => {}
            }
        }

        Ok(stats)
    }
}

pub fn cache_key(url: &str) -> String {
    hex::encode(Md5::digest(url.as_bytes()))
}
