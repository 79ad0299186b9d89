use crate::cache;
use crate::compose::{draw_text_block, save_jpeg};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::fonts::FontManager;
use crate::layout::{self, FitParams};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use log::{error, warn};
use std::path::{Path, PathBuf};

/// Produces a usable placeholder JPEG no matter what: a solid-color canvas
/// with the point text centered on it, and a plain black frame if even that
/// rendering fails. The returned path always names a file that exists unless
/// the filesystem itself refuses writes.
pub fn make_fallback(
    config: &PipelineConfig,
    fonts: &FontManager,
    text: &str,
    output_dir: &Path,
    explicit: Option<&Path>,
) -> PathBuf {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cache::hashed_path(output_dir, text));

    if let Err(err) = render_placeholder(config, fonts, text, &path) {
        warn!(
            "placeholder rendering failed ({}), writing plain frame",
            err
        );
        let black = RgbImage::from_pixel(
            config.canvas_width,
            config.canvas_height,
            Rgb([0, 0, 0]),
        );
        if let Err(err) = save_jpeg(&black, &path, config.jpeg_quality) {
            error!("emergency frame write failed for {}: {}", path.display(), err);
        }
    }
    path
}

fn render_placeholder(
    config: &PipelineConfig,
    fonts: &FontManager,
    text: &str,
    path: &Path,
) -> PipelineResult<()> {
    let (w, h) = (config.canvas_width, config.canvas_height);
    let mut canvas = RgbaImage::from_pixel(
        w,
        h,
        Rgba(config.fallback_background.to_rgba(255)),
    );

    if let Some(loaded) = fonts.font() {
        let max_width = (w - 2 * config.band.side_margin) as f32;
        // Fixed size: the placeholder never runs the shrink ladder.
        let params = FitParams {
            initial_size: config.fallback_font_size,
            min_size: config.fallback_font_size,
            step: config.ladder.step,
            line_spacing: config.ladder.line_spacing,
        };
        let fit = layout::fit_text(&loaded.font, text, max_width, f32::MAX, &params);
        draw_text_block(
            &mut canvas,
            &loaded.font,
            &fit,
            0.0,
            h as f32,
            config.ladder.line_spacing,
            config.text_color,
        );
    } else {
        warn!("no font available, placeholder will be text-free");
    }

    let flattened = image::DynamicImage::ImageRgba8(canvas).to_rgb8();
    save_jpeg(&flattened, path, config.jpeg_quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::discover_system_font;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("postframe_fallback_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_manager() -> FontManager {
        match discover_system_font() {
            Some(path) => FontManager::from_paths(&[path]),
            None => FontManager::from_paths(&[]),
        }
    }

    #[test]
    fn always_produces_a_canvas_sized_file() {
        let dir = scratch_dir("always");
        let config = PipelineConfig::default();
        let fonts = test_manager();
        let path = make_fallback(&config, &fonts, "a point worth remembering", &dir, None);
        assert!(path.exists());
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (1920, 1080));
    }

    #[test]
    fn explicit_path_is_honored() {
        let dir = scratch_dir("explicit");
        let target = dir.join("point_07.jpg");
        let config = PipelineConfig::default();
        let fonts = test_manager();
        let path = make_fallback(&config, &fonts, "some text", &dir, Some(&target));
        assert_eq!(path, target);
        assert!(target.exists());
    }

    #[test]
    fn default_name_derives_from_text_digest() {
        let dir = scratch_dir("digest");
        let config = PipelineConfig::default();
        let fonts = test_manager();
        let path = make_fallback(&config, &fonts, "digest named point", &dir, None);
        assert_eq!(path, cache::hashed_path(&dir, "digest named point"));
        assert!(path.exists());
    }
}
