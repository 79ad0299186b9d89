use crate::error::PipelineResult;
use log::{info, warn};
use md5::{Digest, Md5};
use std::fs;
use std::path::{Path, PathBuf};

/// Cached assets below this edge length are treated as invalid and
/// regenerated.
pub const MIN_ASSET_EDGE: u32 = 100;

/// Canonical per-bullet-point path: `point_{index:02}.jpg`.
pub fn canonical_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("point_{index:02}.jpg"))
}

/// First 10 hex characters of the MD5 digest of `text`; the filename
/// fallback when no stable index exists.
pub fn content_key(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..10].to_string()
}

pub fn hashed_path(dir: &Path, text: &str) -> PathBuf {
    dir.join(format!("{}.jpg", content_key(text)))
}

/// Cache-hit policy: the file exists, decodes, and is at least
/// `MIN_ASSET_EDGE` on both axes. Anything else forces regeneration.
pub fn cached_asset_usable(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match image::open(path) {
        Ok(img) => {
            let (w, h) = (img.width(), img.height());
            if w < MIN_ASSET_EDGE || h < MIN_ASSET_EDGE {
                warn!(
                    "cached image {} is too small ({}x{}), regenerating",
                    path.display(),
                    w,
                    h
                );
                false
            } else {
                true
            }
        }
        Err(err) => {
            warn!("cached image {} unreadable: {}", path.display(), err);
            false
        }
    }
}

/// Migrates an artifact left under the previous naming scheme
/// (`generated_slide_{index}.jpg`) to the canonical name. The stale file is
/// copied first and removed only after the copy exists; running this again
/// is a no-op.
pub fn reconcile_canonical(dir: &Path, index: u32) -> PipelineResult<Option<PathBuf>> {
    let legacy = dir.join(format!("generated_slide_{index}.jpg"));
    if !legacy.exists() {
        return Ok(None);
    }
    let canonical = canonical_path(dir, index);
    if !canonical.exists() {
        fs::copy(&legacy, &canonical)?;
        info!(
            "migrated {} to canonical {}",
            legacy.display(),
            canonical.display()
        );
    }
    if canonical.exists() {
        fs::remove_file(&legacy)?;
    }
    Ok(Some(canonical))
}
