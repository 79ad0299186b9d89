use crate::compose::{self, ComposeContext};
use crate::error::{PipelineError, PipelineResult};
use crate::report::{CompositeResult, LogoDetail};
use crate::resources::{ResourceKind, ResourceStore};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Anchor for the logo on the canvas. Offsets apply to the anchored edges;
/// top anchors pin the logo 30px from the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
    CenterCustom,
}

impl LogoPosition {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top_left" => Self::TopLeft,
            "top_right" => Self::TopRight,
            "bottom_left" => Self::BottomLeft,
            "bottom_right" => Self::BottomRight,
            "center" => Self::Center,
            "center_custom" => Self::CenterCustom,
            other => {
                warn!("unknown logo position {other:?}, using top_right");
                Self::TopRight
            }
        }
    }
}

const TOP_PIN: i64 = 30;
/// Horizontal bias of the custom center anchor, tuned against the 1920-wide
/// canvas.
const CENTER_BIAS: i64 = 760;

pub fn compute_logo_position(
    canvas: (u32, u32),
    logo: (u32, u32),
    position: LogoPosition,
    offset: (u32, u32),
) -> (i64, i64) {
    let (cw, ch) = (canvas.0 as i64, canvas.1 as i64);
    let (lw, lh) = (logo.0 as i64, logo.1 as i64);
    let (ox, oy) = (offset.0 as i64, offset.1 as i64);
    match position {
        LogoPosition::TopLeft => (ox, TOP_PIN),
        LogoPosition::TopRight => (cw - lw - ox, TOP_PIN),
        LogoPosition::BottomLeft => (ox, ch - lh - oy),
        LogoPosition::BottomRight => (cw - lw - ox, ch - lh - oy),
        LogoPosition::Center => ((cw - lw) / 2, (ch - lh) / 2),
        LogoPosition::CenterCustom => ((cw - lw + CENTER_BIAS) / 2, TOP_PIN),
    }
}

/// Stamps the persistent logo onto `base_path`. Size and anchor default to
/// the configured values when not overridden per call. Writes a JPEG to
/// `output` (or in place); errors surface in the result.
pub fn add_logo(
    ctx: &ComposeContext,
    base_path: &Path,
    logo: Option<&RgbaImage>,
    size: Option<(u32, u32)>,
    position: Option<LogoPosition>,
    output: Option<&Path>,
) -> CompositeResult {
    match try_add_logo(ctx, base_path, logo, size, position, output) {
        Ok((path, detail)) => CompositeResult::success("logo applied", path).with_logo(detail),
        Err(err) => {
            warn!("logo step failed for {}: {}", base_path.display(), err);
            CompositeResult::failure_with_context("logo step", &err)
        }
    }
}

fn try_add_logo(
    ctx: &ComposeContext,
    base_path: &Path,
    logo: Option<&RgbaImage>,
    size: Option<(u32, u32)>,
    position: Option<LogoPosition>,
    output: Option<&Path>,
) -> PipelineResult<(PathBuf, LogoDetail)> {
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

    let raw_logo = match logo {
        Some(img) => img.clone(),
        None => ctx
            .store
            .load(ResourceKind::Logo)?
            .ok_or_else(|| {
                PipelineError::not_found("no logo provided and no persistent logo found")
            })?,
    };
    let size = size.unwrap_or((cfg.logo_width, cfg.logo_height));
    let scaled = if raw_logo.dimensions() == size {
        raw_logo
    } else {
        imageops::resize(&raw_logo, size.0, size.1, FilterType::Lanczos3)
    };

    let position = position.unwrap_or_else(|| LogoPosition::parse(&cfg.logo_position));
    let (x, y) = compute_logo_position(
        (w, h),
        size,
        position,
        (cfg.logo_offset_x, cfg.logo_offset_y),
    );

    let mut logo_layer = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]));
    imageops::overlay(&mut logo_layer, &scaled, x, y);
    imageops::overlay(&mut canvas, &logo_layer, 0, 0);

    let out = output.unwrap_or(base_path).to_path_buf();
    let flattened = image::DynamicImage::ImageRgba8(canvas).to_rgb8();
    compose::save_jpeg(&flattened, &out, cfg.jpeg_quality)?;
    info!("placed logo at ({x}, {y}) on {}", out.display());
    Ok((
        out,
        LogoDetail {
            position: (x, y),
            size,
        },
    ))
}

/// Full branding pass: frame with caption first, then the logo stamped onto
/// the frame step's output. Aborts after the frame step if it fails; the
/// final result carries both detail payloads.
pub fn apply_logo_and_frame(
    ctx: &ComposeContext,
    base_path: &Path,
    text: Option<&str>,
    frame: Option<&RgbaImage>,
    logo: Option<&RgbaImage>,
    output: Option<&Path>,
) -> CompositeResult {
    let framed = compose::apply_frame_and_text(ctx, base_path, text, frame, output);
    if !framed.is_success() {
        return framed;
    }
    let Some(framed_path) = framed.output_path.clone() else {
        return framed;
    };
    let branded = add_logo(ctx, &framed_path, logo, None, None, Some(&framed_path));
    if !branded.is_success() {
        return branded;
    }
    let mut merged = CompositeResult::success("frame and logo applied", framed_path);
    merged.frame = framed.frame;
    merged.logo = branded.logo;
    merged
}
