mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, FindArgs, RootArgs, ScanArgs};
use inntinnsic::commands::scan::{self, ScanRequest};
use inntinnsic::config::{self, ScanConfig};
use inntinnsic::services::report;
use inntinnsic::services::scanner::drives;
use inntinnsic::{init_logging, CancelToken, ScanEvent, ScanProgress};
use log::{warn, LevelFilter};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    init_logging(level);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Scan(args) => run_scan(args).await,
        Commands::Find(args) => run_find(args).await,
        Commands::Locations => {
            println!("Drives:");
            for drive in drives::list_drives()? {
                println!("  {}", drive.display());
            }
            for (group, paths) in config::common_locations() {
                println!("{}:", group);
                for path in paths {
                    println!("  {}", path.display());
                }
            }
            Ok(())
        }
    }
}

fn load_config(roots: &RootArgs) -> Result<ScanConfig> {
    let mut config = match &roots.config {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if roots.include_hidden {
        config.skip_hidden = false;
    }
    Ok(config)
}

fn collect_roots(roots: &RootArgs) -> Result<Vec<PathBuf>> {
    let mut paths = roots.paths.clone();
    if roots.common {
        paths.extend(config::common_locations().into_values().flatten());
    }
    if roots.drives {
        paths.extend(drives::list_drives().context("failed to list drives")?);
    }
    if paths.is_empty() {
        bail!("no paths to scan; pass folders, --common or --drives");
    }
    Ok(paths)
}

/// Trip the token on Ctrl-C so an interrupted scan still returns its partial results.
/// A second Ctrl-C exits immediately.
fn cancel_on_ctrl_c(cancel: &CancelToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if handle_interrupts(tokio::signal::ctrl_c, &cancel).await {
            eprintln!("Interrupted again; exiting");
            std::process::exit(130);
        }
    });
}

/// Cancels on the first interrupt. Returns true once a second one arrives.
async fn handle_interrupts<F, Fut>(mut next_interrupt: F, cancel: &CancelToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("Interrupted; finishing the current file (press Ctrl-C again to quit)");
    cancel.cancel();
    next_interrupt().await.is_ok()
}

fn forward_events(
    pb: indicatif::ProgressBar,
    mut rx: mpsc::UnboundedReceiver<ScanEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Found { .. } | ScanEvent::Scanning { .. } => {
                    pb.set_message(event.to_string())
                }
                _ => pb.println(format!("warning: {}", event)),
            }
        }
    })
}

async fn run_find(args: FindArgs) -> Result<()> {
    let config = load_config(&args.roots)?;
    let roots = collect_roots(&args.roots)?;
    let cancel = CancelToken::new();
    cancel_on_ctrl_c(&cancel);

    let pb = cli::create_spinner("Scanning for images...");
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let events = forward_events(pb.clone(), event_rx);

    let images = scan::find_images_async(
        roots,
        args.roots.include_system,
        config,
        event_tx,
        cancel,
    )
    .await?;
    events.await?;
    pb.finish_and_clear();

    for image in &images {
        println!("{}", image.display());
    }
    eprintln!("{} images found", images.len());
    Ok(())
}

async fn run_scan(args: ScanArgs) -> Result<()> {
    let mut config = load_config(&args.roots)?;
    if let Some(model) = args.model {
        config.model_path = Some(model);
    }
    if let Some(threshold) = args.threshold {
        config.detection_threshold = threshold;
    }
    if args.strict {
        config.flagged_categories = ScanConfig::strict_categories();
    }
    config.validate()?;
    let roots = collect_roots(&args.roots)?;

    let model = scan::load_model(&config).await?;

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(&cancel);

    let pb = cli::create_spinner("Scanning for images...");
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ScanProgress>();
    let events = forward_events(pb.clone(), event_rx);
    let progress = {
        let pb = pb.clone();
        tokio::spawn(async move {
            let mut styled = false;
            while let Some(step) = progress_rx.recv().await {
                if !styled {
                    pb.set_style(cli::bar_style());
                    pb.set_length(step.total_files as u64);
                    styled = true;
                }
                pb.set_position(step.current_index as u64);
                pb.set_message(format!("Flagged: {}", step.flagged_count));
            }
        })
    };

    let request = ScanRequest {
        roots,
        include_system_dirs: args.roots.include_system,
        config: config.clone(),
    };
    let outcome = scan::run_scan(request, model, event_tx, progress_tx, cancel).await?;
    events.await?;
    progress.await?;
    pb.finish_and_clear();

    for result in outcome.results.iter().filter(|r| r.is_flagged) {
        println!("FLAGGED {}", result.file_path.display());
    }

    let summary = &outcome.summary;
    if outcome.cancelled {
        println!("Scan stopped by user");
    }
    println!(
        "Scanned {} of {} images: {} flagged, {} clean, {} errors",
        summary.total_scanned, outcome.images_found, summary.flagged, summary.clean, summary.errors
    );
    for (category, count) in &summary.categories {
        println!("  {:<28} {}", category, count);
    }

    if let Some(path) = args.report {
        report::write_text_report(
            &path,
            &outcome.results,
            &config.flagged_categories,
            config.detection_threshold,
        )
        .with_context(|| format!("failed to write report {}", path.display()))?;
    }
    if let Some(path) = args.json {
        report::write_json_report(&path, &outcome.results)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn interrupts(script: Vec<io::Result<()>>) -> impl FnMut() -> std::future::Ready<io::Result<()>> {
        let mut script = script.into_iter();
        move || std::future::ready(script.next().unwrap_or_else(|| Err(io::ErrorKind::Other.into())))
    }

    #[tokio::test]
    async fn second_interrupt_requests_exit() {
        let cancel = CancelToken::new();
        assert!(handle_interrupts(interrupts(vec![Ok(()), Ok(())]), &cancel).await);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn single_interrupt_only_cancels() {
        let cancel = CancelToken::new();
        let failed = Err(io::Error::new(io::ErrorKind::Other, "listener closed"));
        assert!(!handle_interrupts(interrupts(vec![Ok(()), failed]), &cancel).await);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn no_listener_leaves_scan_running() {
        let cancel = CancelToken::new();
        assert!(!handle_interrupts(interrupts(Vec::new()), &cancel).await);
        assert!(!cancel.is_cancelled());
    }
}
