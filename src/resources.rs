use crate::error::{PipelineError, PipelineResult};
use image::{ImageFormat, RgbaImage};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const FRAME_FILE: &str = "frame.png";
pub const SMART_FRAME_FILE: &str = "smart_frame.png";
pub const LOGO_FILE: &str = "persistent_logo.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Frame,
    Logo,
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Logo => "logo",
        }
    }
}

/// Persistence seam for the two overlay resources. One slot per kind,
/// last-write-wins. Absence is a `None`, never an error.
pub trait ResourceStore {
    fn load(&self, kind: ResourceKind) -> PipelineResult<Option<RgbaImage>>;
    fn save(&self, kind: ResourceKind, image: &RgbaImage) -> PipelineResult<()>;
}

/// File-backed store rooted at the cache directory. Frame loads prefer
/// `smart_frame.png` over `frame.png` when both exist. Saves go through a
/// temp file and rename so a reader never observes a torn PNG.
pub struct FileResourceStore {
    root: PathBuf,
}

impl FileResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn frame_path(&self) -> PathBuf {
        self.root.join(FRAME_FILE)
    }

    pub fn smart_frame_path(&self) -> PathBuf {
        self.root.join(SMART_FRAME_FILE)
    }

    pub fn logo_path(&self) -> PathBuf {
        self.root.join(LOGO_FILE)
    }

    fn save_path(&self, kind: ResourceKind) -> PathBuf {
        match kind {
            ResourceKind::Frame => self.frame_path(),
            ResourceKind::Logo => self.logo_path(),
        }
    }

    fn load_candidates(&self, kind: ResourceKind) -> Vec<PathBuf> {
        match kind {
            ResourceKind::Frame => vec![self.smart_frame_path(), self.frame_path()],
            ResourceKind::Logo => vec![self.logo_path()],
        }
    }
}

impl ResourceStore for FileResourceStore {
    fn load(&self, kind: ResourceKind) -> PipelineResult<Option<RgbaImage>> {
        for path in self.load_candidates(kind) {
            if !path.exists() {
                continue;
            }
            match image::open(&path) {
                Ok(img) => {
                    info!("loaded persistent {} from {}", kind.label(), path.display());
                    return Ok(Some(img.to_rgba8()));
                }
                Err(err) => {
                    warn!(
                        "persistent {} at {} unreadable: {}",
                        kind.label(),
                        path.display(),
                        err
                    );
                }
            }
        }
        Ok(None)
    }

    fn save(&self, kind: ResourceKind, image: &RgbaImage) -> PipelineResult<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.save_path(kind);
        let tmp = path.with_extension("png.tmp");
        image
            .save_with_format(&tmp, ImageFormat::Png)
            .map_err(|err| {
                PipelineError::io(format!("writing {} to {}: {}", kind.label(), tmp.display(), err))
            })?;
        fs::rename(&tmp, &path)?;
        info!("saved persistent {} at {}", kind.label(), path.display());
        Ok(())
    }
}

/// Filesystem-free store for tests.
#[cfg(test)]
pub struct MemoryResourceStore {
    frame: std::cell::RefCell<Option<RgbaImage>>,
    logo: std::cell::RefCell<Option<RgbaImage>>,
}

#[cfg(test)]
impl MemoryResourceStore {
    pub fn empty() -> Self {
        Self {
            frame: std::cell::RefCell::new(None),
            logo: std::cell::RefCell::new(None),
        }
    }

    pub fn with_frame(frame: RgbaImage) -> Self {
        let store = Self::empty();
        *store.frame.borrow_mut() = Some(frame);
        store
    }

    pub fn with_logo(logo: RgbaImage) -> Self {
        let store = Self::empty();
        *store.logo.borrow_mut() = Some(logo);
        store
    }
}

#[cfg(test)]
impl ResourceStore for MemoryResourceStore {
    fn load(&self, kind: ResourceKind) -> PipelineResult<Option<RgbaImage>> {
        let slot = match kind {
            ResourceKind::Frame => &self.frame,
            ResourceKind::Logo => &self.logo,
        };
        Ok(slot.borrow().clone())
    }

    fn save(&self, kind: ResourceKind, image: &RgbaImage) -> PipelineResult<()> {
        let slot = match kind {
            ResourceKind::Frame => &self.frame,
            ResourceKind::Logo => &self.logo,
        };
        *slot.borrow_mut() = Some(image.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn scratch_store(name: &str) -> FileResourceStore {
        let root = std::env::temp_dir().join(format!("postframe_resources_{name}"));
        let _ = fs::remove_dir_all(&root);
        FileResourceStore::new(root)
    }

    fn sample_logo() -> RgbaImage {
        RgbaImage::from_pixel(40, 20, Rgba([10, 200, 30, 128]))
    }

    #[test]
    fn load_absent_is_none_not_error() {
        let store = scratch_store("absent");
        assert!(store.load(ResourceKind::Frame).unwrap().is_none());
        assert!(store.load(ResourceKind::Logo).unwrap().is_none());
    }

    #[test]
    fn logo_round_trip_preserves_pixels() {
        let store = scratch_store("roundtrip");
        let logo = sample_logo();
        store.save(ResourceKind::Logo, &logo).unwrap();
        let loaded = store.load(ResourceKind::Logo).unwrap().expect("saved logo");
        assert_eq!(loaded.dimensions(), logo.dimensions());
        assert_eq!(loaded.as_raw(), logo.as_raw());
    }

    #[test]
    fn smart_frame_is_preferred_over_plain_frame() {
        let store = scratch_store("smart");
        let plain = RgbaImage::from_pixel(8, 8, Rgba([1, 1, 1, 255]));
        store.save(ResourceKind::Frame, &plain).unwrap();
        let smart = RgbaImage::from_pixel(8, 8, Rgba([2, 2, 2, 255]));
        smart.save(store.smart_frame_path()).unwrap();

        let loaded = store.load(ResourceKind::Frame).unwrap().unwrap();
        assert_eq!(loaded.get_pixel(0, 0).0, [2, 2, 2, 255]);
    }

    #[test]
    fn save_overwrites_previous_slot() {
        let store = scratch_store("overwrite");
        store.save(ResourceKind::Frame, &sample_logo()).unwrap();
        let second = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        store.save(ResourceKind::Frame, &second).unwrap();
        let loaded = store.load(ResourceKind::Frame).unwrap().unwrap();
        assert_eq!(loaded.dimensions(), (4, 4));
    }
}
