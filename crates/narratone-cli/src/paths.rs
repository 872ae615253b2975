//! Resolution of the cache root and its tier directories.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use narratone_cache::AudioCache;

/// The two cache tiers plus the effects scratch directory, rooted at one
/// location.
pub struct CacheLayout {
    pub root: PathBuf,
    pub synthesis: AudioCache,
    pub processed: AudioCache,
    pub fx_work: PathBuf,
}

impl CacheLayout {
    pub fn resolve(cache_dir: Option<PathBuf>) -> Result<Self> {
        let root = match cache_dir {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .context("no cache directory available on this platform")?
                .join("narratone"),
        };
        Ok(Self::at(&root))
    }

    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            synthesis: AudioCache::new(root.join("synthesis")),
            processed: AudioCache::new(root.join("processed")),
            fx_work: root.join("fx-work"),
        }
    }

    /// Tier name + cache, for commands that walk both tiers.
    pub fn tiers(&self) -> [(&'static str, &AudioCache); 2] {
        [
            ("synthesis", &self.synthesis),
            ("processed", &self.processed),
        ]
    }
}

pub fn print_paths(layout: &CacheLayout) {
    println!("Cache root:      {}", layout.root.display());
    println!("Synthesis tier:  {}", layout.synthesis.dir().display());
    println!("Processed tier:  {}", layout.processed.dir().display());
    println!("Effects scratch: {}", layout.fx_work.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::resolve(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(layout.root, dir.path());
        assert!(layout.synthesis.dir().ends_with("synthesis"));
        assert!(layout.processed.dir().ends_with("processed"));
    }
}
