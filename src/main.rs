mod args;
mod cache;
mod color;
mod compose;
mod config;
mod error;
mod fallback;
mod fonts;
mod generate;
mod layout;
mod overlay;
mod report;
mod resources;
mod synth;

use anyhow::{Context, Result, bail};
use args::{Cli, Command};
use clap::Parser;
use compose::ComposeContext;
use config::PipelineConfig;
use fonts::FontManager;
use generate::Generator;
use image::RgbaImage;
use report::CompositeResult;
use resources::{FileResourceStore, ResourceKind, ResourceStore};
use std::path::{Path, PathBuf};
use synth::PlaceholderSynthesizer;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;

    let fonts = FontManager::new(&config)?;
    let store = FileResourceStore::new(&config.cache_dir);
    let ctx = ComposeContext {
        config: &config,
        fonts: &fonts,
        store: &store,
    };
    let synth = PlaceholderSynthesizer::new(config.canvas_width, config.canvas_height);
    let generator = Generator {
        config: &config,
        fonts: &fonts,
        synth: &synth,
    };

    match &cli.command {
        Command::Generate { text, index, force } => {
            let path = generator.generate_for_text(text, *index, *force);
            println!("Base image ready at {}", path.display());
        }
        Command::Frame {
            image,
            text,
            frame,
            output,
        } => {
            let frame = frame.as_deref().map(load_rgba).transpose()?;
            let result = compose::apply_frame_and_text(
                &ctx,
                image,
                text.as_deref(),
                frame.as_ref(),
                output.as_deref(),
            );
            finish(&result, cli.debug_report.as_deref())?;
        }
        Command::Logo {
            image,
            logo,
            logo_size,
            logo_position,
            output,
        } => {
            let logo = logo.as_deref().map(load_rgba).transpose()?;
            let size = logo_size.as_deref().map(parse_size).transpose()?;
            let position = logo_position
                .as_deref()
                .map(overlay::LogoPosition::parse);
            let result = overlay::add_logo(
                &ctx,
                image,
                logo.as_ref(),
                size,
                position,
                output.as_deref(),
            );
            finish(&result, cli.debug_report.as_deref())?;
        }
        Command::Compose {
            image,
            text,
            frame,
            logo,
            output,
        } => {
            let frame = frame.as_deref().map(load_rgba).transpose()?;
            let logo = logo.as_deref().map(load_rgba).transpose()?;
            let result = overlay::apply_logo_and_frame(
                &ctx,
                image,
                text.as_deref(),
                frame.as_ref(),
                logo.as_ref(),
                output.as_deref(),
            );
            finish(&result, cli.debug_report.as_deref())?;
        }
        Command::SetFrame { image } => {
            let frame = load_rgba(image)?;
            store.save(ResourceKind::Frame, &frame)?;
            println!("Persistent frame updated from {}", image.display());
        }
        Command::SetLogo { image } => {
            let logo = load_rgba(image)?;
            store.save(ResourceKind::Logo, &logo)?;
            println!("Persistent logo updated from {}", image.display());
        }
        Command::Fallback { text, output } => {
            let dir = config.img_dir();
            let path = fallback::make_fallback(&config, &fonts, text, &dir, output.as_deref());
            println!("Placeholder written to {}", path.display());
        }
        Command::Posts { text, index, force } => {
            let base = generator.generate_for_text(text, *index, *force);
            let branded: PathBuf = base.with_file_name(format!(
                "branded_{}",
                base.file_name().and_then(|n| n.to_str()).unwrap_or("post.jpg")
            ));
            let result = overlay::apply_logo_and_frame(
                &ctx,
                &base,
                Some(text),
                None,
                None,
                Some(&branded),
            );
            finish(&result, cli.debug_report.as_deref())?;
            let exported = generator.export_social_posts(&branded)?;
            for path in exported {
                println!("Exported {}", path.display());
            }
        }
    }

    Ok(())
}

fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let (w, h) = raw
        .split_once('x')
        .with_context(|| format!("size '{raw}' must be WIDTHxHEIGHT"))?;
    Ok((
        w.trim().parse().with_context(|| format!("bad width in '{raw}'"))?,
        h.trim().parse().with_context(|| format!("bad height in '{raw}'"))?,
    ))
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).with_context(|| format!("open overlay image {}", path.display()))?;
    Ok(img.to_rgba8())
}

fn finish(result: &CompositeResult, debug_report: Option<&Path>) -> Result<()> {
    if let Some(path) = debug_report {
        if let Err(err) = result.write_debug_json(path) {
            eprintln!("Failed to write debug report ({}): {}", path.display(), err);
        } else {
            println!("Debug report written to {}", path.display());
        }
    }
    if !result.is_success() {
        bail!("{}", result.message);
    }
    if let Some(path) = &result.output_path {
        println!("{} -> {}", result.message, path.display());
    }
    Ok(())
}
