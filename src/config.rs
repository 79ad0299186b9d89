use crate::color::RgbColor;
use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Flat `key = value` config file. Lines starting with `#` and inline `#`
/// comments are ignored; whitespace around keys and values is collapsed.
#[derive(Debug, Clone)]
pub struct RawConfig {
    source: PathBuf,
    data: BTreeMap<String, String>,
}

impl RawConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut data = BTreeMap::new();
        for raw_line in content.lines() {
            if let Some((k, v)) = parse_line(raw_line) {
                data.insert(k, v);
            }
        }
        Ok(Self {
            source: path.to_path_buf(),
            data,
        })
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|s| s.as_str())
    }

    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        match self.value(key) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<T>()
                .map_err(|err| anyhow!("{}: parse {} -> {}", self.source.display(), key, err)),
            _ => Ok(default),
        }
    }
}

fn parse_line(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let without_comment = trimmed.split('#').next().unwrap_or("").trim();
    if without_comment.is_empty() {
        return None;
    }
    let mut parts = without_comment.splitn(2, '=');
    let key = parts.next()?.trim().to_string();
    let value = parts.next().map(|v| v.trim().to_string())?;
    if key.is_empty() { None } else { Some((key, value)) }
}

fn parse_token_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split('|')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_color(value: Option<&str>, default: RgbColor) -> Result<RgbColor> {
    match value {
        Some(v) if !v.is_empty() => RgbColor::parse(v),
        _ => Ok(default),
    }
}

/// Geometry of the frame's text band, expressed against the canvas height.
#[derive(Debug, Clone)]
pub struct TextBand {
    /// Fraction of image height covered by the band at the bottom.
    pub fraction: f32,
    /// Inset from the band's top edge to the text area.
    pub top_inset: u32,
    /// Trim subtracted from the band height to form the text area.
    pub bottom_trim: u32,
    /// Further padding subtracted from the text area for the usable height.
    pub usable_pad: u32,
    /// Left/right margin in pixels.
    pub side_margin: u32,
}

#[derive(Debug, Clone)]
pub struct FontLadder {
    pub initial_size: f32,
    pub min_size: f32,
    pub step: f32,
    pub line_spacing: f32,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_dir: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub jpeg_quality: u8,
    pub preferred_fonts: Vec<PathBuf>,
    pub text_color: RgbColor,
    pub fallback_background: RgbColor,
    pub fallback_font_size: f32,
    pub band: TextBand,
    pub ladder: FontLadder,
    pub logo_width: u32,
    pub logo_height: u32,
    pub logo_position: String,
    pub logo_offset_x: u32,
    pub logo_offset_y: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            canvas_width: 1920,
            canvas_height: 1080,
            jpeg_quality: 95,
            preferred_fonts: vec![
                PathBuf::from("fonts/Poppins-Bold.ttf"),
                PathBuf::from("fonts/Montserrat-Bold.ttf"),
                PathBuf::from("fonts/Leelawadee Bold.ttf"),
            ],
            text_color: RgbColor::new(255, 255, 255),
            fallback_background: RgbColor::new(50, 50, 50),
            fallback_font_size: 40.0,
            band: TextBand {
                fraction: 0.32,
                top_inset: 60,
                bottom_trim: 80,
                usable_pad: 60,
                side_margin: 60,
            },
            ladder: FontLadder {
                initial_size: 45.0,
                min_size: 25.0,
                step: 5.0,
                line_spacing: 15.0,
            },
            logo_width: 150,
            logo_height: 70,
            logo_position: "top_right".to_string(),
            logo_offset_x: 30,
            logo_offset_y: 30,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = RawConfig::load(path)?;
        let base = Self::default();

        let fonts = parse_token_list(raw.value("fonts"));
        let preferred_fonts = if fonts.is_empty() {
            base.preferred_fonts
        } else {
            fonts.into_iter().map(PathBuf::from).collect()
        };

        Ok(Self {
            cache_dir: raw
                .value("cache_dir")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(base.cache_dir),
            canvas_width: raw.parse_or("canvas_width", base.canvas_width)?,
            canvas_height: raw.parse_or("canvas_height", base.canvas_height)?,
            jpeg_quality: raw.parse_or("jpeg_quality", base.jpeg_quality)?,
            preferred_fonts,
            text_color: parse_color(raw.value("text_color"), base.text_color)?,
            fallback_background: parse_color(
                raw.value("fallback_background"),
                base.fallback_background,
            )?,
            fallback_font_size: raw.parse_or("fallback_font_size", base.fallback_font_size)?,
            band: TextBand {
                fraction: raw.parse_or("band_fraction", base.band.fraction)?,
                top_inset: raw.parse_or("band_top_inset", base.band.top_inset)?,
                bottom_trim: raw.parse_or("band_bottom_trim", base.band.bottom_trim)?,
                usable_pad: raw.parse_or("band_usable_pad", base.band.usable_pad)?,
                side_margin: raw.parse_or("side_margin", base.band.side_margin)?,
            },
            ladder: FontLadder {
                initial_size: raw.parse_or("initial_font_size", base.ladder.initial_size)?,
                min_size: raw.parse_or("min_font_size", base.ladder.min_size)?,
                step: raw.parse_or("font_step", base.ladder.step)?,
                line_spacing: raw.parse_or("line_spacing", base.ladder.line_spacing)?,
            },
            logo_width: raw.parse_or("logo_width", base.logo_width)?,
            logo_height: raw.parse_or("logo_height", base.logo_height)?,
            logo_position: raw
                .value("logo_position")
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .unwrap_or(base.logo_position),
            logo_offset_x: raw.parse_or("logo_offset_x", base.logo_offset_x)?,
            logo_offset_y: raw.parse_or("logo_offset_y", base.logo_offset_y)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(anyhow!("canvas_width/height must be > 0"));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow!("jpeg_quality must be in 1..=100"));
        }
        if self.ladder.min_size <= 0.0 || self.ladder.initial_size < self.ladder.min_size {
            return Err(anyhow!("font size ladder must satisfy 0 < min <= initial"));
        }
        if self.ladder.step <= 0.0 {
            return Err(anyhow!("font_step must be > 0"));
        }
        if self.band.fraction <= 0.0 || self.band.fraction >= 1.0 {
            return Err(anyhow!("band_fraction must be in (0, 1)"));
        }
        if self.band.side_margin * 2 >= self.canvas_width {
            return Err(anyhow!(
                "side margins ({}) exceed canvas width ({})",
                self.band.side_margin * 2,
                self.canvas_width
            ));
        }
        if self.logo_width == 0 || self.logo_height == 0 {
            return Err(anyhow!("logo dimensions must be > 0"));
        }
        Ok(())
    }

    pub fn img_dir(&self) -> PathBuf {
        self.cache_dir.join("img")
    }

    pub fn social_dir(&self) -> PathBuf {
        self.cache_dir.join("social_posts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().expect("default config must validate");
        assert_eq!(cfg.canvas_width, 1920);
        assert_eq!(cfg.canvas_height, 1080);
        assert_eq!(cfg.jpeg_quality, 95);
        assert_eq!((cfg.logo_width, cfg.logo_height), (150, 70));
    }

    #[test]
    fn file_values_override_defaults() {
        let path = std::env::temp_dir().join("postframe_config_override.cfg");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# pipeline overrides").unwrap();
        writeln!(file, "canvas_width = 1280  # inline comment").unwrap();
        writeln!(file, "text_color = 255,200,0").unwrap();
        writeln!(file, "fonts = a.ttf | b.ttf").unwrap();
        drop(file);

        let cfg = PipelineConfig::load(&path).unwrap();
        assert_eq!(cfg.canvas_width, 1280);
        assert_eq!(cfg.canvas_height, 1080);
        assert_eq!(cfg.text_color, RgbColor::new(255, 200, 0));
        assert_eq!(
            cfg.preferred_fonts,
            vec![PathBuf::from("a.ttf"), PathBuf::from("b.ttf")]
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn validate_rejects_bad_ladder() {
        let mut cfg = PipelineConfig::default();
        cfg.ladder.step = 0.0;
        assert!(cfg.validate().is_err());
        cfg.ladder.step = 5.0;
        cfg.ladder.initial_size = 10.0;
        assert!(cfg.validate().is_err());
    }
}
