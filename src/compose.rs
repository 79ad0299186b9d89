use crate::color::RgbColor;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::fonts::FontManager;
use crate::layout::{self, FitParams, TextFit};
use crate::report::{CompositeResult, FrameDetail};
use crate::resources::{ResourceKind, ResourceStore};
use fontdue::Font;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{RgbImage, Rgba, RgbaImage};
use log::{info, warn};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Everything a compositing step needs: geometry and palette from the
/// config, the resolved font, and the persistence seam for overlays.
pub struct ComposeContext<'a> {
    pub config: &'a PipelineConfig,
    pub fonts: &'a FontManager,
    pub store: &'a dyn ResourceStore,
}

/// Default caption when a frame is stamped without caller-supplied text.
pub const DEFAULT_CAPTION: &str = "Key takeaway from this article";

/// Stamps the persistent frame over `base_path` and renders the caption into
/// the frame's lower text band. Writes a JPEG to `output` (or in place) and
/// reports the outcome; errors never propagate past this boundary.
pub fn apply_frame_and_text(
    ctx: &ComposeContext,
    base_path: &Path,
    text: Option<&str>,
    frame: Option<&RgbaImage>,
    output: Option<&Path>,
) -> CompositeResult {
    match try_frame_and_text(ctx, base_path, text, frame, output) {
        Ok((path, detail)) => {
            CompositeResult::success("frame applied", path).with_frame(detail)
        }
        Err(err) => {
            warn!("frame step failed for {}: {}", base_path.display(), err);
            CompositeResult::failure_with_context("frame step", &err)
        }
    }
}

fn try_frame_and_text(
    ctx: &ComposeContext,
    base_path: &Path,
    text: Option<&str>,
    frame: Option<&RgbaImage>,
    output: Option<&Path>,
) -> PipelineResult<(PathBuf, FrameDetail)> {
    if !base_path.exists() {
        return Err(PipelineError::not_found(format!(
            "base image not found: {}",
            base_path.display()
        )));
    }
    let cfg = ctx.config;
    let (w, h) = (cfg.canvas_width, cfg.canvas_height);

    let base = image::open(base_path)?;
    let mut canvas = if (base.width(), base.height()) == (w, h) {
        base.to_rgba8()
    } else {
        base.resize_exact(w, h, FilterType::Lanczos3).to_rgba8()
    };

    let frame_layer = match frame {
        Some(img) => img.clone(),
        None => ctx
            .store
            .load(ResourceKind::Frame)?
            .ok_or_else(|| {
                PipelineError::not_found("no frame provided and no persistent frame found")
            })?,
    };
    let frame_layer = if frame_layer.dimensions() == (w, h) {
        frame_layer
    } else {
        imageops::resize(&frame_layer, w, h, FilterType::Lanczos3)
    };
    imageops::overlay(&mut canvas, &frame_layer, 0, 0);

    let caption = text.unwrap_or(DEFAULT_CAPTION);
    let detail = match ctx.fonts.font() {
        Some(loaded) => {
            let band = &cfg.band;
            let band_height = h as f32 * band.fraction;
            let area_top = h as f32 - band_height + band.top_inset as f32;
            let area_height = band_height - band.bottom_trim as f32;
            let available = area_height - band.usable_pad as f32;
            let max_width = (w - 2 * band.side_margin) as f32;

            let params = FitParams {
                initial_size: cfg.ladder.initial_size,
                min_size: cfg.ladder.min_size,
                step: cfg.ladder.step,
                line_spacing: cfg.ladder.line_spacing,
            };
            let fit = layout::fit_text(&loaded.font, caption, max_width, available, &params);

            let mut text_layer = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]));
            draw_text_block(
                &mut text_layer,
                &loaded.font,
                &fit,
                area_top,
                available,
                cfg.ladder.line_spacing,
                cfg.text_color,
            );
            imageops::overlay(&mut canvas, &text_layer, 0, 0);

            FrameDetail {
                text_lines: fit.lines.len(),
                font_size: fit.font_size,
                text_content: caption.to_string(),
            }
        }
        None => {
            warn!("no font available, writing frame without caption");
            FrameDetail {
                text_lines: 0,
                font_size: 0.0,
                text_content: String::new(),
            }
        }
    };

    let out = output.unwrap_or(base_path).to_path_buf();
    let flattened = image::DynamicImage::ImageRgba8(canvas).to_rgb8();
    save_jpeg(&flattened, &out, cfg.jpeg_quality)?;
    info!("composited frame onto {}", out.display());
    Ok((out, detail))
}

/// Draws a fitted text block, each line horizontally centered, the block
/// vertically centered inside `[area_top, area_top + available_height]`.
pub(crate) fn draw_text_block(
    layer: &mut RgbaImage,
    font: &Font,
    fit: &TextFit,
    area_top: f32,
    available_height: f32,
    spacing: f32,
    color: RgbColor,
) {
    let (w, _) = layer.dimensions();
    let mut y = area_top + ((available_height - fit.total_height) / 2.0).max(0.0);
    for line in &fit.lines {
        let line_width = layout::text_width(font, fit.font_size, line);
        let x = ((w as f32 - line_width) / 2.0).max(0.0);
        let baseline = y + fit.extents.ascent;
        draw_line(layer, font, fit.font_size, line, x, baseline, color);
        y += fit.extents.height + spacing;
    }
}

fn draw_line(
    layer: &mut RgbaImage,
    font: &Font,
    size: f32,
    text: &str,
    start_x: f32,
    baseline: f32,
    color: RgbColor,
) {
    let (w, h) = layer.dimensions();
    let mut pen_x = start_x;
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, size);
        let glyph_left = pen_x + metrics.xmin as f32;
        let glyph_top = baseline - (metrics.ymin + metrics.height as i32) as f32;
        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let coverage = bitmap[row * metrics.width + col];
                if coverage == 0 {
                    continue;
                }
                let px = glyph_left + col as f32;
                let py = glyph_top + row as f32;
                if px < 0.0 || py < 0.0 || px >= w as f32 || py >= h as f32 {
                    continue;
                }
                let (px, py) = (px as u32, py as u32);
                let existing = layer.get_pixel(px, py).0[3];
                layer.put_pixel(
                    px,
                    py,
                    Rgba([color.r, color.g, color.b, coverage.max(existing)]),
                );
            }
        }
        pen_x += metrics.advance_width;
    }
}

/// Writes `img` as a JPEG at the configured quality, creating parent
/// directories as needed.
pub(crate) fn save_jpeg(img: &RgbImage, path: &Path, quality: u8) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path).map_err(|err| {
        PipelineError::io(format!("creating {}: {}", path.display(), err))
    })?;
    let writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(writer, quality);
    encoder.encode_image(img)?;
    Ok(())
}
