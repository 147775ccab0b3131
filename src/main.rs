//! taxview - Terminal Taxonomic Assignment Explorer
//!
//! A terminal explorer for taxonomic assignment results.
//!
//! ## Usage
//!
//! ```bash
//! taxview <data_dir>                       # explore the first dataset
//! taxview <data_dir> --dataset run2        # pick a dataset
//! taxview <data_dir> --list                # list datasets
//! taxview <data_dir> --export-saved -c g_len,c_name
//! ```
//!
//! Every subdirectory of `<data_dir>` is a dataset.
//!
//! ## Navigation
//!
//! - `j/k`: Move down/up, `Tab`: next pane
//! - `Enter`: click, `a/r/n`: selection mode
//! - `:q`: Quit
//! - `?`: Help

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use taxview::controller::run_app;
use taxview::formats::discover_datasets;
use taxview::glossary::Glossary;
use taxview::logging::{self, LogSink};
use taxview::model::EVALUE_SLIDER_MAX;
use taxview::palette::Rgb;
use taxview::reconcile::EventKind;
use taxview::session::{Session, SessionConfig};

/// Glossary used when `--glossary` is not given and the file exists.
const DEFAULT_GLOSSARY: &str = "static/glossary.json";

/// Runs CLI mode: reload the saved selection of a dataset and export it.
fn run_export_saved(data_dir: &Path, dataset: Option<&str>, config: SessionConfig, columns: &[String]) -> Result<()> {
    let mut session = Session::open(data_dir, dataset, config)?;
    session.dispatch(EventKind::ReloadSession);
    if session.selection().is_empty() {
        anyhow::bail!(
            "No saved selection in {}",
            session.dataset_paths().save_file().display()
        );
    }

    let csv = session.export_selection_csv(columns)?;
    eprintln!("Wrote {} genes to {}", session.selection().len(), csv.display());

    match session.export_selected_proteins() {
        Ok(fasta) => eprintln!("Wrote selected proteins to {}", fasta.display()),
        Err(e) => eprintln!("Skipped protein export: {}", e),
    }
    Ok(())
}

/// Prints the datasets found in `data_dir`.
fn run_list(data_dir: &Path) -> Result<()> {
    let datasets = discover_datasets(data_dir)
        .with_context(|| format!("Cannot list datasets in {}", data_dir.display()))?;
    for (i, dataset) in datasets.iter().enumerate() {
        let status = if dataset.gene_table().is_file() { "" } else { " (no gene table)" };
        println!("{:>3}  {}{}", i + 1, dataset.name(), status);
    }
    Ok(())
}

fn load_glossary(path: Option<&Path>) -> Result<Glossary> {
    match path {
        Some(path) => Glossary::from_file(path)
            .with_context(|| format!("Cannot load glossary {}", path.display())),
        None if Path::new(DEFAULT_GLOSSARY).is_file() => match Glossary::from_file(DEFAULT_GLOSSARY) {
            Ok(glossary) => Ok(glossary),
            Err(e) => {
                log::warn!("Ignoring {}: {}", DEFAULT_GLOSSARY, e);
                Ok(Glossary::default())
            }
        },
        None => Ok(Glossary::default()),
    }
}

/// taxview - explore, filter and select genes of taxonomic assignment runs
///
/// Without --list or --export-saved, opens the interactive explorer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory whose subdirectories are datasets
    data_dir: PathBuf,

    /// Dataset to open first (directory name)
    #[arg(short = 'd', long = "dataset")]
    dataset: Option<String>,

    /// JSON glossary of column names (default: static/glossary.json if present)
    #[arg(short = 'g', long = "glossary")]
    glossary: Option<PathBuf>,

    /// Colour of the first taxon label, as #RRGGBB
    #[arg(long = "color-root")]
    color_root: Option<Rgb>,

    /// Initial e-value slider: genes need e-value < e^-SLIDER
    #[arg(short = 'e', long = "evalue", default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=EVALUE_SLIDER_MAX as i64))]
    evalue: u32,

    /// Show only the first hit per taxon in the hits table
    #[arg(long = "first-hit-only")]
    first_hit_only: bool,

    /// List the datasets and exit
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Reload the saved selection, write selection.csv and selected_proteins.fasta, and exit
    #[arg(long = "export-saved")]
    export_saved: bool,

    /// Columns of selection.csv (g_name is always included)
    #[arg(short = 'c', long = "columns", value_delimiter = ',')]
    columns: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list {
        return run_list(&args.data_dir);
    }

    let cli_mode = args.export_saved;
    let log_file = logging::init(
        args.verbose,
        if cli_mode { LogSink::Stderr } else { LogSink::TempFile },
    )?;

    let config = SessionConfig {
        glossary: load_glossary(args.glossary.as_deref())?,
        colour_root: args.color_root,
        evalue_slider: args.evalue,
        first_hit_only: args.first_hit_only,
    };

    if cli_mode {
        return run_export_saved(&args.data_dir, args.dataset.as_deref(), config, &args.columns);
    }

    let session = Session::open(&args.data_dir, args.dataset.as_deref(), config)?;
    let result = run_app(session);
    if let Some(path) = log_file {
        eprintln!("Log written to {}", path.display());
    }
    result
}
