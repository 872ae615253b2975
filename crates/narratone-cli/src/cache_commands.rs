//! Handlers for `narratone cache ...`.

use anyhow::{bail, Result};
use chrono::Utc;
use narratone_cache::CacheKey;

use crate::paths::CacheLayout;

pub async fn list(layout: &CacheLayout) -> Result<()> {
    for (tier, cache) in layout.tiers() {
        let entries = cache.list().await?;
        println!("{tier} ({} entries)", entries.len());
        for entry in entries {
            let voice = entry
                .meta
                .voice
                .map_or_else(|| "-".to_string(), |v| v.voice_id);
            println!(
                "  {}  {:>10}  {}  {}",
                entry.key,
                format_size(entry.size_bytes),
                entry.meta.created_at.format("%Y-%m-%d %H:%M"),
                voice
            );
        }
    }
    Ok(())
}

pub async fn path(layout: &CacheLayout, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    for (_, cache) in layout.tiers() {
        if let Some(path) = cache.path(&key).await {
            println!("{}", path.display());
            return Ok(());
        }
    }
    bail!("no cache entry for key {key}");
}

pub async fn delete(layout: &CacheLayout, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    let mut deleted = false;
    for (tier, cache) in layout.tiers() {
        if cache.has(&key).await {
            cache.delete(&key).await?;
            println!("Deleted {key} from {tier} cache");
            deleted = true;
        }
    }
    if !deleted {
        bail!("no cache entry for key {key}");
    }
    Ok(())
}

pub async fn clear(layout: &CacheLayout) -> Result<()> {
    for (tier, cache) in layout.tiers() {
        let count = cache.list().await?.len();
        cache.clear().await?;
        println!("Cleared {count} entries from the {tier} cache");
    }
    Ok(())
}

pub async fn sweep(layout: &CacheLayout) -> Result<()> {
    let now = Utc::now();
    for (tier, cache) in layout.tiers() {
        let evicted = cache.sweep_expired(now).await?;
        println!("Swept {evicted} expired entries from the {tier} cache");
    }
    Ok(())
}

fn parse_key(token: &str) -> Result<CacheKey> {
    match CacheKey::parse(token) {
        Some(key) => Ok(key),
        None => bail!("'{token}' is not a cache key (expected 32 hex characters)"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn bad_key_is_rejected() {
        assert!(parse_key("not-a-key").is_err());
        assert!(parse_key(&"a".repeat(32)).is_ok());
    }
}
