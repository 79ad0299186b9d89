use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author = "postframe project", version)]
#[command(about = "Compose branded social post images from article points")]
pub struct Cli {
    /// Pipeline configuration file (key = value)
    #[arg(long = "config", value_name = "CFG_PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Export the structured result of the operation as JSON for debugging
    #[arg(long = "debug-report", value_name = "JSON_PATH", global = true)]
    pub debug_report: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate (or reuse from cache) the base image for an article point
    Generate {
        /// Article point text
        text: String,

        /// Stable point index; names the output point_NN.jpg
        #[arg(short = 'i', long = "index", value_name = "NUM")]
        index: Option<u32>,

        /// Regenerate even when a usable cached image exists
        #[arg(long = "force")]
        force: bool,
    },

    /// Stamp the frame and caption text onto an image
    Frame {
        /// Base image to composite onto
        image: PathBuf,

        /// Caption rendered into the frame's text band
        #[arg(short = 't', long = "text", value_name = "TEXT")]
        text: Option<String>,

        /// Frame image override (defaults to the persistent frame)
        #[arg(long = "frame", value_name = "PNG_PATH")]
        frame: Option<PathBuf>,

        /// Output path (defaults to overwriting the input)
        #[arg(short = 'o', long = "output", value_name = "JPG_PATH")]
        output: Option<PathBuf>,
    },

    /// Stamp the logo onto an image
    Logo {
        /// Base image to composite onto
        image: PathBuf,

        /// Logo image override (defaults to the persistent logo)
        #[arg(long = "logo", value_name = "PNG_PATH")]
        logo: Option<PathBuf>,

        /// Logo size override, WIDTHxHEIGHT (default 150x70)
        #[arg(long = "logo-size", value_name = "WxH")]
        logo_size: Option<String>,

        /// Anchor tag: top_right, top_left, bottom_right, bottom_left, center
        #[arg(long = "logo-position", value_name = "TAG")]
        logo_position: Option<String>,

        /// Output path (defaults to overwriting the input)
        #[arg(short = 'o', long = "output", value_name = "JPG_PATH")]
        output: Option<PathBuf>,
    },

    /// Full branding pass: frame with caption, then logo
    Compose {
        /// Base image to composite onto
        image: PathBuf,

        /// Caption rendered into the frame's text band
        #[arg(short = 't', long = "text", value_name = "TEXT")]
        text: Option<String>,

        /// Frame image override (defaults to the persistent frame)
        #[arg(long = "frame", value_name = "PNG_PATH")]
        frame: Option<PathBuf>,

        /// Logo image override (defaults to the persistent logo)
        #[arg(long = "logo", value_name = "PNG_PATH")]
        logo: Option<PathBuf>,

        /// Output path (defaults to overwriting the input)
        #[arg(short = 'o', long = "output", value_name = "JPG_PATH")]
        output: Option<PathBuf>,
    },

    /// Store an image as the persistent frame
    SetFrame {
        /// Frame image (RGBA PNG recommended)
        image: PathBuf,
    },

    /// Store an image as the persistent logo
    SetLogo {
        /// Logo image (RGBA PNG recommended)
        image: PathBuf,
    },

    /// Render the text-on-solid-color placeholder directly
    Fallback {
        /// Article point text
        text: String,

        /// Output path (defaults to a digest-named file in the cache)
        #[arg(short = 'o', long = "output", value_name = "JPG_PATH")]
        output: Option<PathBuf>,
    },

    /// Generate, brand, and export per-platform social post images
    Posts {
        /// Article point text
        text: String,

        /// Stable point index; names the base image point_NN.jpg
        #[arg(short = 'i', long = "index", value_name = "NUM")]
        index: Option<u32>,

        /// Regenerate even when a usable cached image exists
        #[arg(long = "force")]
        force: bool,
    },
}
