//! Data model for the taxonomic assignment explorer.
//!
//! This module contains the plain data structures shared by every layer:
//! - Gene records and taxonomic hits of one dataset
//! - Column descriptors with their parsed replicate suffix
//! - The selection mode and the active e-value/contig filter

use std::collections::BTreeSet;
use std::fmt;

/// Reserved `plot_label` for genes without a taxon assignment.
///
/// Never part of the legend and never counted as "visible".
pub const UNASSIGNED: &str = "Unassigned";

/// Largest value of the e-value exponent slider.
pub const EVALUE_SLIDER_MAX: u32 = 300;

/// One row of the gene feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    /// Unique gene identifier (`g_name`)
    pub gene_name: String,
    /// Contig the gene lies on (`c_name`)
    pub contig_name: String,
    /// Protein identifier joining proteins.faa and the hits table
    pub fasta_header: String,
    /// First three PCA dimensions (`Dim.1`..`Dim.3`)
    pub dims: [Option<f64>; 3],
    /// Name of the best hit, if any
    pub best_hit: Option<String>,
    /// E-value of the best hit (smaller is more significant)
    pub best_hit_evalue: Option<f64>,
    /// Taxon assigned upstream
    pub taxon_assignment: String,
    /// Taxon category used for colouring and the legend
    pub plot_label: String,
    /// Raw cell values, aligned with the store's column list
    pub values: Vec<String>,
}

impl GeneRecord {
    /// Creates a record with only its identifying fields set.
    pub fn new(
        gene_name: impl Into<String>,
        contig_name: impl Into<String>,
        plot_label: impl Into<String>,
    ) -> Self {
        let gene_name = gene_name.into();
        Self {
            fasta_header: gene_name.clone(),
            gene_name,
            contig_name: contig_name.into(),
            dims: [None; 3],
            best_hit: None,
            best_hit_evalue: None,
            taxon_assignment: String::new(),
            plot_label: plot_label.into(),
            values: Vec::new(),
        }
    }

    /// Sets the best hit e-value.
    pub fn with_evalue(mut self, evalue: Option<f64>) -> Self {
        self.best_hit_evalue = evalue;
        self
    }

    /// Sets the protein identifier.
    pub fn with_fasta_header(mut self, fasta_header: impl Into<String>) -> Self {
        self.fasta_header = fasta_header.into();
        self
    }

    /// Sets the best hit name.
    pub fn with_best_hit(mut self, best_hit: impl Into<String>) -> Self {
        self.best_hit = Some(best_hit.into());
        self
    }

    /// Returns true if the gene carries the reserved "Unassigned" label.
    pub fn is_unassigned(&self) -> bool {
        self.plot_label == UNASSIGNED
    }
}

/// One row of the diamond hits table (`taxonomic_hits.txt`).
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomicHit {
    /// Query id, joins to `GeneRecord::fasta_header`
    pub query_id: String,
    /// Subject (database sequence) id
    pub subject_id: String,
    pub percent_identity: f64,
    pub length: u32,
    pub mismatches: u32,
    pub gap_opens: u32,
    pub query_start: u32,
    pub query_end: u32,
    pub subject_start: u32,
    pub subject_end: u32,
    pub evalue: f64,
    pub bit_score: f64,
    /// Semicolon separated taxon ids (optional 13th column)
    pub taxon_ids: String,
    /// Semicolon separated taxon names (optional 14th column)
    pub hit_taxon_name: String,
}

/// A hit prepared for display: first taxon only, e-value as text.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRow {
    pub subject_id: String,
    pub taxon_name: String,
    pub taxon_id: String,
    pub percent_identity: f64,
    pub length: u32,
    /// E-value with three significant digits
    pub evalue: String,
    pub bit_score: f64,
}

/// Metric family and replicate index parsed from a column name.
///
/// Coverage columns come in families such as `g_cov_0`, `g_cov_1`, one per
/// input sample; the trailing digits are split off once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricName {
    pub family: String,
    pub replicate: Option<u32>,
}

impl MetricName {
    /// Splits a trailing run of ASCII digits from `column`.
    pub fn parse(column: &str) -> Self {
        let family = column.trim_end_matches(|c: char| c.is_ascii_digit());
        let replicate = column[family.len()..].parse().ok();
        // Purely numeric names have no family to attach a replicate to
        if family.is_empty() {
            return Self {
                family: column.to_string(),
                replicate: None,
            };
        }
        Self {
            family: family.to_string(),
            replicate,
        }
    }
}

/// A selectable variable of the feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name as it appears in the CSV header
    pub name: String,
    pub metric: MetricName,
    /// Human readable label from the glossary, replicate appended
    pub label: Option<String>,
    /// Longer glossary description
    pub details: Option<String>,
}

impl ColumnDescriptor {
    /// Returns the label to show for this column.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// How a targeted gene is applied to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    Add,
    Remove,
    #[default]
    Neutral,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Add => write!(f, "ADD"),
            SelectionMode::Remove => write!(f, "REMOVE"),
            SelectionMode::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// The numeric and contig filter applied before plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveFilter {
    /// Keep rows with `best_hit_evalue < evalue_threshold`
    pub evalue_threshold: f64,
    /// `None` keeps every contig, an empty set keeps none
    pub contig_allowlist: Option<BTreeSet<String>>,
}

impl ActiveFilter {
    /// Builds a filter from the exponent slider: `threshold = e^-slider`.
    pub fn from_slider(slider: u32) -> Self {
        Self {
            evalue_threshold: evalue_threshold(slider),
            contig_allowlist: None,
        }
    }

    /// Returns true if `contig` passes the allow-list.
    pub fn allows_contig(&self, contig: &str) -> bool {
        self.contig_allowlist
            .as_ref()
            .map_or(true, |allowed| allowed.contains(contig))
    }
}

impl Default for ActiveFilter {
    fn default() -> Self {
        Self::from_slider(0)
    }
}

/// Converts a slider position into an e-value threshold.
pub fn evalue_threshold(slider: u32) -> f64 {
    (-(slider as f64)).exp()
}
