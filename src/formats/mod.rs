//! Dataset file formats.
//!
//! A dataset is a directory produced by the taxonomic assignment pipeline:
//!
//! ```text
//! <dataset>/taxonomic_assignment/gene_table_taxon_assignment.csv   (required)
//! <dataset>/taxonomic_hits.txt                                     (optional)
//! <dataset>/proteins.faa                                           (optional)
//! <dataset>/gene_info/summary.txt                                  (optional)
//! <dataset>/savefile.txt                                           (written by us)
//! ```
//!
//! Only the gene table is required; everything else degrades to a
//! placeholder when missing.

pub mod fasta;
pub mod gene_table;
pub mod hits;
pub mod savefile;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Gene feature table, relative to the dataset directory.
pub const GENE_TABLE_FILE: &str = "taxonomic_assignment/gene_table_taxon_assignment.csv";
/// Diamond hits table.
pub const TAXONOMIC_HITS_FILE: &str = "taxonomic_hits.txt";
/// Protein sequences.
pub const PROTEINS_FILE: &str = "proteins.faa";
/// Free text summary of the pipeline run.
pub const SUMMARY_FILE: &str = "gene_info/summary.txt";
/// Persisted selection tokens.
pub const SAVE_FILE: &str = "savefile.txt";
/// CSV export of the selection.
pub const SELECTION_EXPORT_FILE: &str = "selection.csv";
/// FASTA export of the selected proteins.
pub const PROTEIN_EXPORT_FILE: &str = "selected_proteins.fasta";

/// Errors that make a dataset unusable.
#[derive(Error, Debug)]
pub enum DatasetLoadError {
    #[error("Gene table not found: {}", .0.display())]
    MissingGeneTable(PathBuf),

    #[error("Failed to read gene table: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid gene table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Gene table lacks required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Invalid number '{value}' in column '{column}' at line {line}")]
    InvalidNumber {
        column: String,
        value: String,
        line: u64,
    },

    #[error("Duplicate gene name '{0}'")]
    DuplicateGene(String),

    #[error("Duplicate fasta header '{0}'")]
    DuplicateFastaHeader(String),
}

/// Resolved file locations of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub root: PathBuf,
}

impl DatasetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn gene_table(&self) -> PathBuf {
        self.root.join(GENE_TABLE_FILE)
    }

    pub fn taxonomic_hits(&self) -> PathBuf {
        self.root.join(TAXONOMIC_HITS_FILE)
    }

    pub fn proteins(&self) -> PathBuf {
        self.root.join(PROTEINS_FILE)
    }

    pub fn summary(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn save_file(&self) -> PathBuf {
        self.root.join(SAVE_FILE)
    }

    pub fn selection_export(&self) -> PathBuf {
        self.root.join(SELECTION_EXPORT_FILE)
    }

    pub fn protein_export(&self) -> PathBuf {
        self.root.join(PROTEIN_EXPORT_FILE)
    }

    /// Directory name shown to the user.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }
}

/// Lists every subdirectory of `data_root` as a dataset, sorted by name.
pub fn discover_datasets<P: AsRef<Path>>(data_root: P) -> io::Result<Vec<DatasetPaths>> {
    let mut datasets = Vec::new();
    for entry in fs::read_dir(data_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            datasets.push(DatasetPaths::new(entry.path()));
        }
    }
    datasets.sort_by(|a, b| a.root.cmp(&b.root));
    Ok(datasets)
}

/// Reads the optional run summary, falling back to a placeholder.
pub fn read_summary(paths: &DatasetPaths) -> String {
    match fs::read_to_string(paths.summary()) {
        Ok(summary) => summary,
        Err(e) => {
            log::warn!("No summary for {}: {}", paths.name(), e);
            "File summary.txt not found".to_string()
        }
    }
}
