use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

/// Inntinnsic - image safety checker
#[derive(Parser)]
#[command(name = "inntinnsic")]
#[command(version)]
#[command(about = "Finds images on disk and flags them with an ONNX body-part detector", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find images and analyze them with the detector
    Scan(ScanArgs),

    /// Only list the images a scan would analyze
    Find(FindArgs),

    /// Print well-known folders that usually contain images
    Locations,
}

#[derive(Args, Clone)]
pub struct RootArgs {
    /// Files or folders to scan
    pub paths: Vec<PathBuf>,

    /// Also scan the common user folders (Downloads, Pictures, ...)
    #[arg(long)]
    pub common: bool,

    /// Scan every drive (the filesystem root on Unix)
    #[arg(long)]
    pub drives: bool,

    /// Descend into system and tool directories (node_modules, Program Files, ...)
    #[arg(long)]
    pub include_system: bool,

    /// Include hidden files
    #[arg(long)]
    pub include_hidden: bool,

    /// JSON settings file; command-line flags override its values
    #[arg(short, long, env = "INNTINNSIC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub roots: RootArgs,

    /// Path to the detector ONNX model
    #[arg(short, long, env = "INNTINNSIC_MODEL")]
    pub model: Option<PathBuf>,

    /// Detection threshold between 0.0 and 1.0
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Also flag covered body parts
    #[arg(long)]
    pub strict: bool,

    /// Write a text report of flagged images
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write every result as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Args)]
pub struct FindArgs {
    #[command(flatten)]
    pub roots: RootArgs,
}

pub fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-")
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {elapsed_precise} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
