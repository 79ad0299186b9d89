use crate::error::{PipelineError, PipelineResult};
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use log::info;
use md5::{Digest, Md5};
use std::io::Cursor;

/// Source of raw generated imagery for an article point. Implementations
/// return encoded image bytes; decoding and canvas fitting happen in the
/// generation pipeline.
pub trait ImageSynthesizer {
    fn synthesize(&self, prompt: &str) -> PipelineResult<Vec<u8>>;
}

/// Deterministic stand-in synthesizer: a two-tone diagonal gradient whose
/// palette is derived from the prompt digest, with a light grain pass so the
/// output does not look like a flat fill. The same prompt always yields the
/// same bytes.
pub struct PlaceholderSynthesizer {
    width: u32,
    height: u32,
}

impl PlaceholderSynthesizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ImageSynthesizer for PlaceholderSynthesizer {
    fn synthesize(&self, prompt: &str) -> PipelineResult<Vec<u8>> {
        let mut hasher = Md5::new();
        hasher.update(prompt.as_bytes());
        let digest = hasher.finalize();

        let a = [digest[0], digest[1], digest[2]];
        let b = [digest[3], digest[4], digest[5]];
        let (w, h) = (self.width.max(1), self.height.max(1));
        let span = (w + h - 2).max(1) as f32;

        let mut img: RgbaImage = ImageBuffer::from_fn(w, h, |x, y| {
            let t = (x + y) as f32 / span;
            let mut px = [0u8; 4];
            for c in 0..3 {
                px[c] = (a[c] as f32 + (b[c] as f32 - a[c] as f32) * t) as u8;
            }
            px[3] = 255;
            Rgba(px)
        });
        add_grain(&mut img, 0.04);

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| PipelineError::io(format!("encoding placeholder image: {err}")))?;
        info!("synthesized placeholder image for prompt ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

fn add_grain(img: &mut RgbaImage, magnitude: f32) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            let noise = pseudo_noise(x, y) as f32 / 255.0;
            let delta = (noise - 0.5) * magnitude * 255.0;
            let mut p = img.get_pixel(x, y).0;
            for c in 0..3 {
                p[c] = (p[c] as f32 + delta).clamp(0.0, 255.0) as u8;
            }
            img.put_pixel(x, y, Rgba(p));
        }
    }
}

fn pseudo_noise(x: u32, y: u32) -> u8 {
    // Repeatable hash noise, no extra dependency needed.
    let mut v = x.wrapping_mul(73856093) ^ y.wrapping_mul(19349663);
    v ^= v >> 13;
    v = v.wrapping_mul(0x85ebca6b);
    ((v >> 8) & 0xFF) as u8
}

#[cfg(test)]
pub struct FailingSynthesizer;

#[cfg(test)]
impl ImageSynthesizer for FailingSynthesizer {
    fn synthesize(&self, _prompt: &str) -> PipelineResult<Vec<u8>> {
        Err(PipelineError::invalid_upstream(
            "synthesis backend unavailable",
        ))
    }
}

/// Returns bytes that are not a decodable image.
#[cfg(test)]
pub struct MalformedSynthesizer;

#[cfg(test)]
impl ImageSynthesizer for MalformedSynthesizer {
    fn synthesize(&self, _prompt: &str) -> PipelineResult<Vec<u8>> {
        Ok(b"not an image at all".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_prompt_yields_identical_bytes() {
        let synth = PlaceholderSynthesizer::new(64, 48);
        let a = synth.synthesize("sunrise over the harbor").unwrap();
        let b = synth.synthesize("sunrise over the harbor").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_prompts_diverge() {
        let synth = PlaceholderSynthesizer::new(64, 48);
        let a = synth.synthesize("first headline").unwrap();
        let b = synth.synthesize("second headline").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn output_decodes_at_requested_size() {
        let synth = PlaceholderSynthesizer::new(120, 90);
        let bytes = synth.synthesize("any prompt").unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (120, 90));
    }
}
