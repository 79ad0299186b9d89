use crate::cache;
use crate::compose::save_jpeg;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::fallback;
use crate::fonts::FontManager;
use crate::synth::ImageSynthesizer;
use image::DynamicImage;
use image::imageops::FilterType;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Instagram,
    Facebook,
    LinkedIn,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::Facebook,
        Platform::LinkedIn,
        Platform::Twitter,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
        }
    }
}

/// Produces the base image for one article point. Generation is best-effort
/// with a guaranteed result: cache hit, fresh synthesis, or the placeholder,
/// in that order.
pub struct Generator<'a> {
    pub config: &'a PipelineConfig,
    pub fonts: &'a FontManager,
    pub synth: &'a dyn ImageSynthesizer,
}

impl Generator<'_> {
    /// Returns a path to a usable JPEG for `text`. Never fails: any error on
    /// the synthesis path degrades to the placeholder at the same location.
    pub fn generate_for_text(&self, text: &str, index: Option<u32>, force: bool) -> PathBuf {
        let img_dir = self.config.img_dir();
        if let Err(err) = fs::create_dir_all(&img_dir) {
            warn!("cannot create {}: {}", img_dir.display(), err);
        }
        if let Some(i) = index {
            if let Err(err) = cache::reconcile_canonical(&img_dir, i) {
                warn!("legacy migration failed for index {i}: {err}");
            }
        }

        let path = match index {
            Some(i) => cache::canonical_path(&img_dir, i),
            None => cache::hashed_path(&img_dir, text),
        };
        if !force && cache::cached_asset_usable(&path) {
            info!("cache hit for {}", path.display());
            return path;
        }

        match self.try_generate(text, &path) {
            Ok(()) => path,
            Err(err) => {
                warn!("generation failed ({err}), using placeholder");
                fallback::make_fallback(self.config, self.fonts, text, &img_dir, Some(&path))
            }
        }
    }

    fn try_generate(&self, text: &str, path: &Path) -> PipelineResult<()> {
        let prompt = format!("Professional editorial photograph illustrating: {text}");
        let bytes = self.synth.synthesize(&prompt)?;
        let decoded = image::load_from_memory(&bytes).map_err(|err| {
            PipelineError::invalid_upstream(format!("undecodable image payload: {err}"))
        })?;
        let fitted = aspect_fill(&decoded, self.config.canvas_width, self.config.canvas_height)
            .to_rgb8();
        save_jpeg(&fitted, path, self.config.jpeg_quality)?;
        if !cache::cached_asset_usable(path) {
            // One retry; a second bad write goes to the placeholder path.
            warn!("written asset failed validation, rewriting {}", path.display());
            save_jpeg(&fitted, path, self.config.jpeg_quality)?;
            if !cache::cached_asset_usable(path) {
                return Err(PipelineError::io(format!(
                    "written asset failed validation: {}",
                    path.display()
                )));
            }
        }
        info!("generated {}", path.display());
        Ok(())
    }

    /// Copies a finished composite into per-platform export names under the
    /// social posts directory.
    pub fn export_social_posts(&self, source: &Path) -> PipelineResult<Vec<PathBuf>> {
        if !source.exists() {
            return Err(PipelineError::not_found(format!(
                "composite not found: {}",
                source.display()
            )));
        }
        let dir = self.config.social_dir();
        fs::create_dir_all(&dir)?;
        let mut exported = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            let target = dir.join(format!("{}_post_image.jpg", platform.slug()));
            fs::copy(source, &target)?;
            exported.push(target);
        }
        info!("exported {} social post images", exported.len());
        Ok(exported)
    }
}

/// Scales the image so it covers the whole target, then center-crops the
/// overflow. Aspect ratio is preserved; no letterboxing.
pub(crate) fn aspect_fill(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (iw, ih) = (img.width().max(1), img.height().max(1));
    let scale = (width as f32 / iw as f32).max(height as f32 / ih as f32);
    let sw = ((iw as f32 * scale).round() as u32).max(width);
    let sh = ((ih as f32 * scale).round() as u32).max(height);
    let scaled = img.resize_exact(sw, sh, FilterType::Lanczos3);
    let x = (sw - width) / 2;
    let y = (sh - height) / 2;
    scaled.crop_imm(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::discover_system_font;
    use crate::synth::{FailingSynthesizer, MalformedSynthesizer, PlaceholderSynthesizer};
    use image::{Rgb, RgbImage};

    fn scratch_config(name: &str) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.cache_dir = std::env::temp_dir().join(format!("postframe_generate_{name}"));
        let _ = fs::remove_dir_all(&config.cache_dir);
        config
    }

    fn test_manager() -> FontManager {
        match discover_system_font() {
            Some(path) => FontManager::from_paths(&[path]),
            None => FontManager::from_paths(&[]),
        }
    }

    #[test]
    fn synthesized_image_lands_at_canonical_path() {
        let config = scratch_config("ok");
        let fonts = test_manager();
        let synth = PlaceholderSynthesizer::new(800, 600);
        let generator = Generator {
            config: &config,
            fonts: &fonts,
            synth: &synth,
        };
        let path = generator.generate_for_text("harbor at dawn", Some(3), false);
        assert_eq!(path, config.img_dir().join("point_03.jpg"));
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (1920, 1080));
    }

    #[test]
    fn failing_backend_still_yields_a_file() {
        let config = scratch_config("failing");
        let fonts = test_manager();
        let generator = Generator {
            config: &config,
            fonts: &fonts,
            synth: &FailingSynthesizer,
        };
        let path = generator.generate_for_text("resilient point", Some(1), false);
        assert!(path.exists());
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (1920, 1080));
    }

    #[test]
    fn undecodable_payload_degrades_to_placeholder() {
        let config = scratch_config("malformed");
        let fonts = test_manager();
        let generator = Generator {
            config: &config,
            fonts: &fonts,
            synth: &MalformedSynthesizer,
        };
        let path = generator.generate_for_text("garbled payload point", None, false);
        assert!(path.exists());
        assert_eq!(
            path,
            cache::hashed_path(&config.img_dir(), "garbled payload point")
        );
    }

    #[test]
    fn cache_hit_skips_regeneration_unless_forced() {
        let config = scratch_config("cachehit");
        let fonts = test_manager();
        fs::create_dir_all(config.img_dir()).unwrap();
        let cached = cache::canonical_path(&config.img_dir(), 2);
        RgbImage::from_pixel(300, 300, Rgb([11, 22, 33]))
            .save(&cached)
            .unwrap();

        let generator = Generator {
            config: &config,
            fonts: &fonts,
            synth: &FailingSynthesizer,
        };
        // Hit: the failing backend is never consulted.
        let path = generator.generate_for_text("cached point", Some(2), false);
        assert_eq!(path, cached);
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 300);

        // Forced: backend fails, placeholder replaces the cached file.
        let path = generator.generate_for_text("cached point", Some(2), true);
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 1920);
    }

    #[test]
    fn legacy_artifact_is_migrated_before_the_cache_check() {
        let config = scratch_config("legacy");
        let fonts = test_manager();
        fs::create_dir_all(config.img_dir()).unwrap();
        let legacy = config.img_dir().join("generated_slide_6.jpg");
        RgbImage::from_pixel(400, 400, Rgb([5, 5, 5]))
            .save(&legacy)
            .unwrap();

        let generator = Generator {
            config: &config,
            fonts: &fonts,
            synth: &FailingSynthesizer,
        };
        let path = generator.generate_for_text("migrated point", Some(6), false);
        assert_eq!(path, cache::canonical_path(&config.img_dir(), 6));
        assert!(!legacy.exists());
        // Migrated file is a valid cache entry, so the backend never ran.
        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 400);
    }

    #[test]
    fn aspect_fill_covers_and_center_crops() {
        let tall = DynamicImage::ImageRgb8(RgbImage::from_pixel(500, 1000, Rgb([1, 2, 3])));
        let out = aspect_fill(&tall, 1920, 1080);
        assert_eq!((out.width(), out.height()), (1920, 1080));

        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(4000, 1000, Rgb([1, 2, 3])));
        let out = aspect_fill(&wide, 1920, 1080);
        assert_eq!((out.width(), out.height()), (1920, 1080));
    }

    #[test]
    fn social_export_uses_platform_slugs() {
        let config = scratch_config("social");
        let fonts = test_manager();
        let synth = PlaceholderSynthesizer::new(64, 64);
        let generator = Generator {
            config: &config,
            fonts: &fonts,
            synth: &synth,
        };
        fs::create_dir_all(&config.cache_dir).unwrap();
        let source = config.cache_dir.join("final.jpg");
        RgbImage::from_pixel(120, 120, Rgb([9, 9, 9]))
            .save(&source)
            .unwrap();

        let exported = generator.export_social_posts(&source).unwrap();
        assert_eq!(exported.len(), 4);
        for (platform, path) in Platform::ALL.iter().zip(&exported) {
            assert!(path.ends_with(format!("{}_post_image.jpg", platform.slug())));
            assert!(path.exists());
        }
    }
}
