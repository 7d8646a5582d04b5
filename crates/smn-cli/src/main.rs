//! ShareMeNot CLI
//!
//! Validate tracker catalogs, check which tracker a URL resolves to and
//! replay recorded browser events through the engine.

mod catalog;
mod replay;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use replay::ReplayOptions;

#[derive(Parser)]
#[command(name = "smn-cli")]
#[command(about = "ShareMeNot tracker catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a tracker catalog
    Validate {
        /// Catalog file (Trackers.json)
        #[arg(short, long)]
        catalog: PathBuf,
    },

    /// Print the tracker each URL resolves to
    Resolve {
        /// Catalog file (Trackers.json)
        #[arg(short, long)]
        catalog: PathBuf,

        /// URLs to resolve
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Replay a JSON-lines event trace and print each response
    Replay {
        /// Catalog file (Trackers.json)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Preferences file; defaults block everything and replace buttons
        #[arg(short, long)]
        prefs: Option<PathBuf>,

        /// Trace file, one JSON event per line
        #[arg(short, long)]
        trace: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { catalog } => cmd_validate(&catalog),
        Commands::Resolve { catalog, urls } => cmd_resolve(&catalog, &urls),
        Commands::Replay {
            catalog,
            prefs,
            trace,
        } => replay::run_replay(ReplayOptions {
            catalog,
            preferences: prefs,
            trace,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_validate(path: &Path) -> Result<(), String> {
    let (registry, index) = catalog::load_catalog(path)?;

    println!("Catalog '{}' is valid", path.display());
    println!("  Trackers:    {}", registry.len());
    println!("  Patterns:    {}", index.len());
    println!();

    for tracker in registry.trackers() {
        println!(
            "  {:<14} {:<22} {} patterns, {} selectors, button type {}",
            tracker.name,
            tracker.domain,
            tracker.match_patterns.len(),
            tracker.button_selectors.len(),
            tracker.replacement_button.action.kind(),
        );
    }

    Ok(())
}

fn cmd_resolve(path: &Path, urls: &[String]) -> Result<(), String> {
    let (_, index) = catalog::load_catalog(path)?;

    for url in urls {
        match index.resolve(url) {
            Some(tracker) => println!("{}\t{}", tracker.name, url),
            None => println!("-\t{}", url),
        }
    }

    Ok(())
}
