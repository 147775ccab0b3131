//! Gene feature table parser.
//!
//! The table is a comma separated file with a header row. Only a handful of
//! columns are interpreted; every cell is kept as raw text so the table can
//! be shown and exported with all of its columns.
//!
//! ```text
//! g_name,c_name,Dim.1,Dim.2,Dim.3,fasta_header,best_hit,bh_evalue,taxon_assignment,plot_label,g_cov_0
//! g1,contig_1,0.1,-0.3,1.2,prot_1,Homo sapiens,1e-30,Homo sapiens,Mammalia,12.5
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::ReaderBuilder;

use super::DatasetLoadError;
use crate::model::GeneRecord;

pub const GENE_NAME_COL: &str = "g_name";
pub const CONTIG_NAME_COL: &str = "c_name";
pub const FASTA_HEADER_COL: &str = "fasta_header";
/// Former name of `fasta_header`, still found in older datasets.
pub const LEGACY_FASTA_HEADER_COL: &str = "protID";
pub const BEST_HIT_COL: &str = "best_hit";
pub const BEST_HIT_EVALUE_COL: &str = "bh_evalue";
pub const TAXON_ASSIGNMENT_COL: &str = "taxon_assignment";
pub const PLOT_LABEL_COL: &str = "plot_label";
pub const DIM_COLS: [&str; 3] = ["Dim.1", "Dim.2", "Dim.3"];

/// A parsed gene table: header plus records in file order.
#[derive(Debug, Clone)]
pub struct GeneTable {
    pub columns: Vec<String>,
    pub records: Vec<GeneRecord>,
}

/// Column positions of the interpreted fields.
struct Layout {
    gene_name: usize,
    contig_name: usize,
    fasta_header: usize,
    plot_label: usize,
    best_hit: Option<usize>,
    best_hit_evalue: Option<usize>,
    taxon_assignment: Option<usize>,
    dims: [Option<usize>; 3],
}

impl Layout {
    fn from_header(columns: &[String]) -> Result<Self, DatasetLoadError> {
        let find = |name: &str| columns.iter().position(|c| c == name);
        let require =
            |name: &'static str| find(name).ok_or(DatasetLoadError::MissingColumn(name));

        let fasta_header = find(FASTA_HEADER_COL)
            .or_else(|| find(LEGACY_FASTA_HEADER_COL))
            .ok_or(DatasetLoadError::MissingColumn(FASTA_HEADER_COL))?;

        Ok(Self {
            gene_name: require(GENE_NAME_COL)?,
            contig_name: require(CONTIG_NAME_COL)?,
            fasta_header,
            plot_label: require(PLOT_LABEL_COL)?,
            best_hit: find(BEST_HIT_COL),
            best_hit_evalue: find(BEST_HIT_EVALUE_COL),
            taxon_assignment: find(TAXON_ASSIGNMENT_COL),
            dims: DIM_COLS.map(|name| find(name)),
        })
    }
}

/// Parses the gene table at `path`.
pub fn parse_gene_table_file<P: AsRef<Path>>(path: P) -> Result<GeneTable, DatasetLoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DatasetLoadError::MissingGeneTable(path.to_path_buf()),
        _ => DatasetLoadError::IoError(e),
    })?;
    parse_gene_table(file)
}

/// Parses a gene table from any reader.
pub fn parse_gene_table<R: Read>(reader: R) -> Result<GeneTable, DatasetLoadError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let layout = Layout::from_header(&columns)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let line = row.position().map_or(0, |p| p.line());
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();
        let number = |idx: Option<usize>| match idx {
            Some(idx) => parse_optional_number(cell(idx)).ok_or_else(|| {
                DatasetLoadError::InvalidNumber {
                    column: columns[idx].clone(),
                    value: cell(idx).to_string(),
                    line,
                }
            }),
            None => Ok(None),
        };

        let best_hit = layout
            .best_hit
            .map(cell)
            .filter(|hit| !is_missing(hit))
            .map(str::to_string);

        records.push(GeneRecord {
            gene_name: cell(layout.gene_name).to_string(),
            contig_name: cell(layout.contig_name).to_string(),
            fasta_header: cell(layout.fasta_header).to_string(),
            dims: [
                number(layout.dims[0])?,
                number(layout.dims[1])?,
                number(layout.dims[2])?,
            ],
            best_hit,
            best_hit_evalue: number(layout.best_hit_evalue)?,
            taxon_assignment: layout.taxon_assignment.map(cell).unwrap_or("").to_string(),
            plot_label: cell(layout.plot_label).to_string(),
            values: row.iter().map(|v| v.trim().to_string()).collect(),
        });
    }

    Ok(GeneTable { columns, records })
}

/// Parses a gene table held in memory.
pub fn parse_gene_table_str(content: &str) -> Result<GeneTable, DatasetLoadError> {
    parse_gene_table(content.as_bytes())
}

/// Missing-value markers written by the upstream pipeline.
fn is_missing(value: &str) -> bool {
    matches!(value, "" | "NA" | "nan" | "NaN" | "None")
}

/// Parses a numeric cell.
///
/// Returns `Some(None)` for a missing value and `None` if the cell is not a number.
fn parse_optional_number(value: &str) -> Option<Option<f64>> {
    if is_missing(value) {
        return Some(None);
    }
    value.parse::<f64>().ok().map(|v| if v.is_nan() { None } else { Some(v) })
}
