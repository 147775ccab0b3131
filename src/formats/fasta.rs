//! Protein FASTA reader and writer.
//!
//! `proteins.faa` holds the predicted proteins of the dataset. Records are
//! looked up by their identifier (header up to the first space); the
//! annotation pipeline may prefix identifiers with `gene-`.
//!
//! ```text
//! >gene-prot_1 hypothetical protein
//! MKVLAAGIVGLLLA...
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Prefix the annotation pipeline adds to protein identifiers.
pub const GENE_PREFIX: &str = "gene-";

/// Line width of written sequences.
const LINE_WIDTH: usize = 60;

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// One protein of the FASTA file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinRecord {
    /// Identifier (header up to the first whitespace, without '>')
    pub id: String,
    /// Rest of the header line
    pub description: String,
    pub sequence: String,
}

/// Proteins in file order with an id lookup.
#[derive(Debug, Default, Clone)]
pub struct ProteinIndex {
    records: Vec<ProteinRecord>,
    by_id: HashMap<String, usize>,
}

impl ProteinIndex {
    fn new(records: Vec<ProteinRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            by_id.entry(record.id.clone()).or_insert(idx);
        }
        Self { records, by_id }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finds the protein for a fasta header, with or without the `gene-` prefix.
    pub fn get(&self, fasta_header: &str) -> Option<&ProteinRecord> {
        self.by_id
            .get(fasta_header)
            .or_else(|| self.by_id.get(&format!("{GENE_PREFIX}{fasta_header}")))
            .map(|&idx| &self.records[idx])
    }

    /// Records matching any of `fasta_headers`, in file order.
    pub fn select<'a, I>(&self, fasta_headers: I) -> Vec<&ProteinRecord>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut indices: Vec<usize> = fasta_headers
            .into_iter()
            .filter_map(|id| self.get(id).and_then(|r| self.by_id.get(&r.id).copied()))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|idx| &self.records[idx]).collect()
    }
}

/// Parses a FASTA file into a `ProteinIndex`.
///
/// # Examples
///
/// ```no_run
/// use taxview::formats::fasta::parse_fasta_file;
///
/// let proteins = parse_fasta_file("data/run1/proteins.faa").unwrap();
/// println!("Loaded {} proteins", proteins.len());
/// ```
pub fn parse_fasta_file<P: AsRef<Path>>(path: P) -> FastaResult<ProteinIndex> {
    let file = File::open(path)?;
    parse_fasta(BufReader::new(file))
}

/// Parses FASTA content from a reader.
///
/// Handles both single-line and multi-line sequences. An empty input gives
/// an empty index.
pub fn parse_fasta<R: BufRead>(reader: R) -> FastaResult<ProteinIndex> {
    let mut records = Vec::new();
    let mut current: Option<(String, String)> = None;
    let mut current_seq = String::new();
    let mut line_number = 0;

    for line_result in reader.lines() {
        line_number += 1;
        let line = line_result?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if let Some((id, description)) = current.take() {
                records.push(ProteinRecord {
                    id,
                    description,
                    sequence: std::mem::take(&mut current_seq),
                });
            }

            let (id, description) = match header.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, rest.trim()),
                None => (header, ""),
            };
            if id.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence identifier at line {}",
                    line_number
                )));
            }
            current = Some((id.to_string(), description.to_string()));
        } else {
            if current.is_none() {
                return Err(FastaError::SequenceWithoutHeader(line_number));
            }
            current_seq.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if let Some((id, description)) = current {
        records.push(ProteinRecord {
            id,
            description,
            sequence: current_seq,
        });
    }

    Ok(ProteinIndex::new(records))
}

/// Parses FASTA content from a string.
pub fn parse_fasta_str(content: &str) -> FastaResult<ProteinIndex> {
    parse_fasta(content.as_bytes())
}

/// Writes records as FASTA, wrapping sequences at 60 columns.
pub fn write_fasta<W: Write>(writer: &mut W, records: &[&ProteinRecord]) -> std::io::Result<()> {
    for record in records {
        if record.description.is_empty() {
            writeln!(writer, ">{}", record.id)?;
        } else {
            writeln!(writer, ">{} {}", record.id, record.description)?;
        }
        let bytes = record.sequence.as_bytes();
        for chunk in bytes.chunks(LINE_WIDTH) {
            writer.write_all(chunk)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Copies the proteins of `fasta_headers` from `proteins` into `output`.
///
/// Returns the absolute path of the written file.
pub fn write_selected_proteins<'a, I>(
    proteins: &Path,
    fasta_headers: I,
    output: &Path,
) -> FastaResult<PathBuf>
where
    I: IntoIterator<Item = &'a str>,
{
    let index = parse_fasta_file(proteins)?;
    let selected = index.select(fasta_headers);

    let mut writer = BufWriter::new(File::create(output)?);
    write_fasta(&mut writer, &selected)?;
    writer.flush()?;

    log::info!("Wrote {} proteins to {}", selected.len(), output.display());
    Ok(output.canonicalize().unwrap_or_else(|_| output.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTEINS: &str = "\
>gene-prot_1 hypothetical protein
MKVL
AAGI
>prot_2
MSTN
>gene-prot_3 kinase
MA
";

    #[test]
    fn test_parse_multiline() {
        let index = parse_fasta_str(PROTEINS).unwrap();
        assert_eq!(index.len(), 3);
        let first = index.get("prot_1").unwrap();
        assert_eq!(first.id, "gene-prot_1");
        assert_eq!(first.description, "hypothetical protein");
        assert_eq!(first.sequence, "MKVLAAGI");
    }

    #[test]
    fn test_lookup_with_and_without_prefix() {
        let index = parse_fasta_str(PROTEINS).unwrap();
        assert_eq!(index.get("prot_2").unwrap().sequence, "MSTN");
        assert_eq!(index.get("gene-prot_3").unwrap().sequence, "MA");
        assert!(index.get("prot_9").is_none());
    }

    #[test]
    fn test_select_keeps_file_order() {
        let index = parse_fasta_str(PROTEINS).unwrap();
        let selected = index.select(["prot_3", "prot_1", "prot_3", "missing"]);
        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["gene-prot_1", "gene-prot_3"]);
    }

    #[test]
    fn test_sequence_without_header() {
        let result = parse_fasta_str("MKV\n>p1\nMA\n");
        assert!(matches!(result, Err(FastaError::SequenceWithoutHeader(1))));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_fasta_str("").unwrap().is_empty());
    }

    #[test]
    fn test_write_selected_proteins() {
        let dir = tempfile::tempdir().unwrap();
        let proteins = dir.path().join("proteins.faa");
        let output = dir.path().join("selected_proteins.fasta");
        std::fs::write(&proteins, PROTEINS).unwrap();

        write_selected_proteins(&proteins, ["prot_2"], &output).unwrap();
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, ">prot_2\nMSTN\n");
    }
}
