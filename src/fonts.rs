use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use anyhow::Result;
use fontdue::{Font, FontSettings};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct LoadedFont {
    pub font: Font,
    pub path: PathBuf,
}

/// Resolves the display font once per process from an ordered preference
/// chain. Unloadable entries are skipped, never fatal; when the whole chain
/// fails, a system font directory scan is the last candidate.
pub struct FontManager {
    resolved: Option<LoadedFont>,
}

impl FontManager {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            resolved: resolve_chain(&config.preferred_fonts),
        })
    }

    pub fn font(&self) -> Option<&LoadedFont> {
        self.resolved.as_ref()
    }

    #[cfg(test)]
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        Self {
            resolved: resolve_chain(paths),
        }
    }
}

fn resolve_chain(preferred: &[PathBuf]) -> Option<LoadedFont> {
    for path in preferred {
        if !path.exists() {
            continue;
        }
        match load_font(path) {
            Ok(font) => {
                info!("loaded font {}", path.display());
                return Some(font);
            }
            Err(err) => warn!("skipping font {}: {}", path.display(), err),
        }
    }
    if let Some(path) = discover_system_font() {
        match load_font(&path) {
            Ok(font) => {
                info!("using system font {}", path.display());
                return Some(font);
            }
            Err(err) => warn!("system font {} unusable: {}", path.display(), err),
        }
    }
    warn!("no usable font found; text layers will be skipped");
    None
}

fn load_font(path: &Path) -> PipelineResult<LoadedFont> {
    let data = fs::read(path)?;
    let font = Font::from_bytes(data, FontSettings::default())
        .map_err(PipelineError::font_load)?;
    Ok(LoadedFont {
        font,
        path: path.to_path_buf(),
    })
}

/// First `.ttf`/`.otf` found under the conventional font roots, searched in
/// order, two directory levels deep.
pub fn discover_system_font() -> Option<PathBuf> {
    let mut roots = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        roots.insert(2, PathBuf::from(home).join(".local/share/fonts"));
    }
    roots.iter().find_map(|root| find_font_file(root, 3))
}

fn find_font_file(dir: &Path, depth: u8) -> Option<PathBuf> {
    if depth == 0 || !dir.is_dir() {
        return None;
    }
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for path in &entries {
        if path.is_file() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            if matches!(ext.as_deref(), Some("ttf") | Some("otf")) {
                return Some(path.clone());
            }
        }
    }
    for path in &entries {
        if path.is_dir() {
            if let Some(found) = find_font_file(path, depth - 1) {
                return Some(found);
            }
        }
    }
    None
}
