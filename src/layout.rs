use fontdue::Font;
use log::warn;

/// Reference glyph string used to derive a line height from the font's own
/// bounding-box metrics: a tall cap plus a descender.
const REFERENCE_GLYPHS: &str = "Mg";

/// Vertical extents of one rendered line at a given pixel size.
#[derive(Debug, Clone, Copy)]
pub struct LineExtents {
    /// Distance from the top of the line box to its bottom.
    pub height: f32,
    /// Distance from the top of the line box down to the baseline.
    pub ascent: f32,
}

#[derive(Debug, Clone)]
pub struct TextFit {
    pub lines: Vec<String>,
    pub font_size: f32,
    pub extents: LineExtents,
    pub total_height: f32,
    /// False when even the minimum size overflows the target region.
    pub fits: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct FitParams {
    pub initial_size: f32,
    pub min_size: f32,
    pub step: f32,
    pub line_spacing: f32,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            initial_size: 45.0,
            min_size: 25.0,
            step: 5.0,
            line_spacing: 15.0,
        }
    }
}

/// Rendered pixel width of `text`: the sum of glyph advances.
pub fn text_width(font: &Font, size: f32, text: &str) -> f32 {
    text.chars()
        .map(|ch| font.metrics(ch, size).advance_width)
        .sum()
}

pub fn line_extents(font: &Font, size: f32) -> LineExtents {
    let mut top = i32::MIN;
    let mut bottom = i32::MAX;
    for ch in REFERENCE_GLYPHS.chars() {
        let m = font.metrics(ch, size);
        top = top.max(m.ymin + m.height as i32);
        bottom = bottom.min(m.ymin);
    }
    if top <= bottom {
        // Degenerate font; fall back to the nominal size as the line height.
        return LineExtents {
            height: size,
            ascent: size,
        };
    }
    LineExtents {
        height: (top - bottom) as f32,
        ascent: top as f32,
    }
}

/// Greedy word wrap bounded by pixel width. A single word wider than
/// `max_width` is placed alone on its own line, never split mid-word.
pub fn wrap_lines(font: &Font, size: f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(font, size, &candidate) <= max_width {
            current = candidate;
        } else if current.is_empty() {
            lines.push(word.to_string());
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Adaptive font-size search: from `initial_size` down to `min_size` in
/// `step` decrements, the first size whose wrapped block fits `max_height`
/// wins. When none fits, the minimum size is accepted with whatever overflow
/// results; this degrades, it never fails.
pub fn fit_text(
    font: &Font,
    text: &str,
    max_width: f32,
    max_height: f32,
    params: &FitParams,
) -> TextFit {
    let mut size = params.initial_size;
    while size >= params.min_size {
        let candidate = measure(font, text, max_width, size, params.line_spacing);
        if candidate.total_height <= max_height {
            return candidate;
        }
        size -= params.step;
    }
    warn!(
        "text does not fit at minimum font size {}px, accepting overflow",
        params.min_size
    );
    let mut fallback = measure(font, text, max_width, params.min_size, params.line_spacing);
    fallback.fits = false;
    fallback
}

fn measure(font: &Font, text: &str, max_width: f32, size: f32, spacing: f32) -> TextFit {
    let lines = wrap_lines(font, size, text, max_width);
    let extents = line_extents(font, size);
    let n = lines.len() as f32;
    let total_height = n * extents.height + (n - 1.0).max(0.0) * spacing;
    TextFit {
        lines,
        font_size: size,
        extents,
        total_height,
        fits: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::discover_system_font;
    use fontdue::FontSettings;

    fn test_font() -> Option<Font> {
        let path = discover_system_font()?;
        let data = std::fs::read(path).ok()?;
        Font::from_bytes(data, FontSettings::default()).ok()
    }

    #[test]
    fn wrap_never_splits_words() {
        let Some(font) = test_font() else { return };
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let words: Vec<&str> = text.split_whitespace().collect();
        let lines = wrap_lines(&font, 30.0, text, 200.0);
        assert!(!lines.is_empty());
        // Every line is a consecutive run of input words.
        let rejoined: Vec<&str> = lines
            .iter()
            .flat_map(|l| l.split(' '))
            .collect();
        assert_eq!(rejoined, words);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let Some(font) = test_font() else { return };
        let text = "a pneumonoultramicroscopicsilicovolcanoconiosis b";
        let lines = wrap_lines(&font, 40.0, text, 120.0);
        assert!(
            lines
                .iter()
                .any(|l| l == "pneumonoultramicroscopicsilicovolcanoconiosis"),
            "overflowing word must appear alone, got {lines:?}"
        );
    }

    #[test]
    fn wrapped_lines_respect_width_except_forced_overflow() {
        let Some(font) = test_font() else { return };
        let max_width = 260.0;
        let lines = wrap_lines(&font, 28.0, "several reasonably short words in a row here", max_width);
        for line in &lines {
            if line.contains(' ') {
                assert!(text_width(&font, 28.0, line) <= max_width);
            }
        }
    }

    #[test]
    fn first_fitting_size_wins() {
        let Some(font) = test_font() else { return };
        let params = FitParams::default();
        let fit = fit_text(&font, "short", 2000.0, 2000.0, &params);
        assert_eq!(fit.font_size, params.initial_size);
        assert!(fit.fits);
        assert_eq!(fit.lines.len(), 1);
    }

    #[test]
    fn shrinks_then_accepts_min_size_overflow() {
        let Some(font) = test_font() else { return };
        let params = FitParams::default();
        let text = "a long bullet point that keeps going with many words so that the \
                    wrapped block grows well past any small vertical region we give it";
        let fit = fit_text(&font, text, 500.0, 10.0, &params);
        assert_eq!(fit.font_size, params.min_size);
        assert!(!fit.fits);
        assert!(fit.lines.len() >= 1);
    }

    #[test]
    fn block_height_formula_matches_extents() {
        let Some(font) = test_font() else { return };
        let params = FitParams::default();
        let fit = fit_text(&font, "two line wrap target text", 160.0, 5000.0, &params);
        let n = fit.lines.len() as f32;
        let expected = n * fit.extents.height + (n - 1.0) * params.line_spacing;
        assert!((fit.total_height - expected).abs() < f32::EPSILON * 100.0);
    }
}
