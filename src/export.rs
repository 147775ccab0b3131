//! Exports of the current selection.
//!
//! - `selection.csv`: selected rows restricted to the requested columns
//!   (`g_name` is always included), columns in table order.
//! - `selected_proteins.fasta`: the selected proteins copied from `proteins.faa`.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::formats::fasta::{write_selected_proteins, FastaError};
use crate::formats::gene_table::GENE_NAME_COL;
use crate::model::GeneRecord;
use crate::selection::SelectionSet;
use crate::store::RecordStore;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to export proteins: {0}")]
    Fasta(#[from] FastaError),

    #[error("Protein file not found: {}", .0.display())]
    MissingProteins(PathBuf),
}

/// Column names to export, in table order.
///
/// Unknown requested names are ignored and `g_name` is always kept.
pub fn export_columns<S: AsRef<str>>(store: &RecordStore, requested: &[S]) -> Vec<String> {
    store
        .selectable_variables()
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| *name == GENE_NAME_COL || requested.iter().any(|r| r.as_ref() == *name))
        .map(str::to_string)
        .collect()
}

/// Writes `records` as CSV with the given columns. Returns the number of rows.
pub fn write_selection_csv<W: Write>(
    writer: W,
    store: &RecordStore,
    records: &[&GeneRecord],
    columns: &[String],
) -> Result<usize, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(columns)?;
    for record in records {
        csv_writer.write_record(
            columns
                .iter()
                .map(|column| store.value_of(record, column).unwrap_or("")),
        )?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}

/// Writes the selected rows of `store` to `output`.
///
/// Returns the absolute path of the written file.
pub fn export_selection_csv<S: AsRef<str>>(
    store: &RecordStore,
    selection: &SelectionSet,
    requested: &[S],
    output: &Path,
) -> Result<PathBuf, ExportError> {
    let columns = export_columns(store, requested);
    let records = selection.selected_rows(store.all_records());
    let rows = write_selection_csv(File::create(output)?, store, &records, &columns)?;
    log::info!(
        "Exported {} genes with {} columns to {}",
        rows,
        columns.len(),
        output.display()
    );
    Ok(output.canonicalize().unwrap_or_else(|_| output.to_path_buf()))
}

/// Copies the proteins of the selected genes from `proteins` to `output`.
pub fn export_selected_proteins(
    store: &RecordStore,
    selection: &SelectionSet,
    proteins: &Path,
    output: &Path,
) -> Result<PathBuf, ExportError> {
    if !proteins.is_file() {
        return Err(ExportError::MissingProteins(proteins.to_path_buf()));
    }
    let headers = selection
        .selected_rows(store.all_records())
        .into_iter()
        .map(|record| record.fasta_header.as_str());
    Ok(write_selected_proteins(proteins, headers, output)?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::formats::gene_table::parse_gene_table_str;
    use crate::glossary::Glossary;

    const TABLE: &str = "\
g_name,c_name,fasta_header,bh_evalue,plot_label,g_cov_0,g_len
g1,contig_1,prot_1,1e-30,Mammalia,12.5,300
g2,contig_1,prot_2,0.01,Bacteria,3,150
g3,contig_2,prot_3,,Unassigned,7,90
";

    fn store() -> RecordStore {
        RecordStore::from_table(parse_gene_table_str(TABLE).unwrap(), &Glossary::default()).unwrap()
    }

    #[test]
    fn test_export_columns_in_table_order() {
        let store = store();
        let columns = export_columns(&store, &["g_len", "c_name", "unknown"]);
        assert_eq!(columns, vec!["g_name", "c_name", "g_len"]);

        let none: [&str; 0] = [];
        assert_eq!(export_columns(&store, &none), vec!["g_name"]);
    }

    #[test]
    fn test_write_selection_csv() {
        let store = store();
        let mut selection = SelectionSet::new();
        selection.bulk_add(["g3", "g1"]);
        let records = selection.selected_rows(store.all_records());
        let columns = export_columns(&store, &["g_cov_0"]);

        let mut out = Vec::new();
        let rows = write_selection_csv(&mut out, &store, &records, &columns).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "g_name,g_cov_0\ng1,12.5\ng3,7\n");
    }

    #[test]
    fn test_export_selection_csv_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("selection.csv");
        let store = store();
        let mut selection = SelectionSet::new();
        selection.select("g2");

        let written = export_selection_csv(&store, &selection, &["plot_label"], &output).unwrap();
        assert!(written.is_absolute());
        assert_eq!(fs::read_to_string(&output).unwrap(), "g_name,plot_label\ng2,Bacteria\n");
    }

    #[test]
    fn test_export_proteins() {
        let dir = tempdir().unwrap();
        let proteins = dir.path().join("proteins.faa");
        fs::write(&proteins, ">gene-prot_1\nMKVL\n>prot_2\nMSTN\n>prot_3\nMA\n").unwrap();
        let output = dir.path().join("selected_proteins.fasta");

        let store = store();
        let mut selection = SelectionSet::new();
        selection.bulk_add(["g1", "g3", "stale"]);

        export_selected_proteins(&store, &selection, &proteins, &output).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), ">gene-prot_1\nMKVL\n>prot_3\nMA\n");
    }

    #[test]
    fn test_export_proteins_without_fasta() {
        let dir = tempdir().unwrap();
        let result = export_selected_proteins(
            &store(),
            &SelectionSet::new(),
            &dir.path().join("proteins.faa"),
            &dir.path().join("out.fasta"),
        );
        assert!(matches!(result, Err(ExportError::MissingProteins(_))));
    }
}
