//! Diamond hits table parser.
//!
//! `taxonomic_hits.txt` is the tab separated output of the diamond aligner
//! with no header and 12 to 14 columns:
//!
//! ```text
//! qseqid sseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore [staxids [sscinames]]
//! ```
//!
//! The taxon columns may hold several `;` separated entries.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use thiserror::Error;

use crate::model::{HitRow, TaxonomicHit};

/// Column names following the diamond documentation.
pub const HIT_COLUMNS: [&str; 14] = [
    "qseqid", "sseqid", "pident", "length", "mismatch", "gapopen", "qstart", "qend", "sstart",
    "send", "evalue", "bitscore", "staxids", "sscinames",
];

/// Minimum number of columns per row (the standard diamond format 6).
const MIN_COLUMNS: usize = 12;

/// Errors that can occur while reading the hits table.
#[derive(Error, Debug)]
pub enum HitsError {
    #[error("Failed to open hits table: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid hits table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Expected at least {MIN_COLUMNS} columns at line {line}, found {found}")]
    TooFewColumns { line: u64, found: usize },

    #[error("Invalid value in column '{column}' at line {line}")]
    InvalidValue { column: &'static str, line: u64 },
}

/// Hits grouped by query id, each group in file order.
#[derive(Debug, Default, Clone)]
pub struct HitIndex {
    by_query: HashMap<String, Vec<TaxonomicHit>>,
    total: usize,
}

impl HitIndex {
    /// Total number of hits in the table.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// All hits for `query_id`.
    pub fn hits(&self, query_id: &str) -> &[TaxonomicHit] {
        self.by_query.get(query_id).map_or(&[], Vec::as_slice)
    }

    /// Hits for `query_id` prepared for display.
    ///
    /// Only the first entry of the taxon lists is kept. With `first_hit_only`
    /// a row is dropped when its taxon name or taxon id was already shown.
    pub fn rows_for(&self, query_id: &str, first_hit_only: bool) -> Vec<HitRow> {
        let mut seen_names = HashSet::new();
        let mut seen_ids = HashSet::new();
        let mut rows = Vec::new();

        for hit in self.hits(query_id) {
            let taxon_name = first_entry(&hit.hit_taxon_name);
            let taxon_id = first_entry(&hit.taxon_ids);

            if first_hit_only && (seen_names.contains(taxon_name) || seen_ids.contains(taxon_id)) {
                continue;
            }
            seen_names.insert(taxon_name);
            seen_ids.insert(taxon_id);

            rows.push(HitRow {
                subject_id: hit.subject_id.clone(),
                taxon_name: taxon_name.to_string(),
                taxon_id: taxon_id.to_string(),
                percent_identity: hit.percent_identity,
                length: hit.length,
                evalue: format_significant(hit.evalue, 3),
                bit_score: hit.bit_score,
            });
        }
        rows
    }
}

/// Parses the hits table at `path`.
pub fn parse_hits_file<P: AsRef<Path>>(path: P) -> Result<HitIndex, HitsError> {
    let file = File::open(path)?;
    parse_hits(file)
}

/// Parses a hits table from any reader.
///
/// Non UTF-8 bytes in taxon names are replaced rather than rejected.
pub fn parse_hits<R: Read>(reader: R) -> Result<HitIndex, HitsError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut index = HitIndex::default();
    let mut row = ByteRecord::new();
    while rdr.read_byte_record(&mut row)? {
        let line = row.position().map_or(0, |p| p.line());
        // Blank lines come through as a single empty field
        if row.len() == 1 && row[0].is_empty() {
            continue;
        }
        if row.len() < MIN_COLUMNS {
            return Err(HitsError::TooFewColumns {
                line,
                found: row.len(),
            });
        }

        let hit = parse_hit(&row, line)?;
        index.by_query.entry(hit.query_id.clone()).or_default().push(hit);
        index.total += 1;
    }
    Ok(index)
}

/// Parses a hits table held in memory.
pub fn parse_hits_str(content: &str) -> Result<HitIndex, HitsError> {
    parse_hits(content.as_bytes())
}

fn parse_hit(row: &ByteRecord, line: u64) -> Result<TaxonomicHit, HitsError> {
    let text = |idx: usize| {
        row.get(idx)
            .map(|b| String::from_utf8_lossy(b).trim().to_string())
            .unwrap_or_default()
    };
    let number = |idx: usize| {
        text(idx).parse::<f64>().map_err(|_| HitsError::InvalidValue {
            column: HIT_COLUMNS[idx],
            line,
        })
    };
    let count = |idx: usize| {
        text(idx).parse::<u32>().map_err(|_| HitsError::InvalidValue {
            column: HIT_COLUMNS[idx],
            line,
        })
    };

    Ok(TaxonomicHit {
        query_id: text(0),
        subject_id: text(1),
        percent_identity: number(2)?,
        length: count(3)?,
        mismatches: count(4)?,
        gap_opens: count(5)?,
        query_start: count(6)?,
        query_end: count(7)?,
        subject_start: count(8)?,
        subject_end: count(9)?,
        evalue: number(10)?,
        bit_score: number(11)?,
        taxon_ids: text(12),
        hit_taxon_name: text(13),
    })
}

fn first_entry(list: &str) -> &str {
    list.split(';').next().unwrap_or("").trim()
}

/// Formats `value` with `digits` significant digits, like printf's `%g`.
///
/// Scientific notation is used for exponents below -4 or at least `digits`;
/// trailing zeros are removed.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let digits = digits.max(1);

    // Round first so the exponent reflects the rounded mantissa (9.999 -> 1.00e1)
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

/// Formats `value` with the fewest digits that read back as the same float.
///
/// Uses the exponent form below `1e-4` and from `1e16` on, like `%g`.
pub fn format_shortest(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let sci = format!("{:e}", value);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let exponent = exponent.parse::<i32>().unwrap_or(0);
    if exponent < -4 || exponent >= 16 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        value.to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HITS: &str = "\
prot_1\tsp|P1\t98.5\t120\t2\t0\t1\t120\t1\t120\t1.234e-50\t250.1\t9606;9598\tHomo sapiens;Pan troglodytes
prot_1\tsp|P2\t90.0\t118\t10\t1\t1\t118\t3\t121\t2e-40\t200\t9606\tHomo sapiens
prot_1\tsp|P3\t80.0\t110\t20\t2\t5\t115\t1\t110\t0.000123\t150\t10090\tMus musculus
prot_2\tsp|P4\t70.0\t100\t30\t3\t1\t100\t1\t100\t0.5\t90\t562\tEscherichia coli
";

    #[test]
    fn test_parse_hits() {
        let index = parse_hits_str(HITS).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.hits("prot_1").len(), 3);
        assert_eq!(index.hits("prot_2")[0].subject_id, "sp|P4");
        assert!(index.hits("prot_9").is_empty());
    }

    #[test]
    fn test_rows_keep_first_taxon() {
        let index = parse_hits_str(HITS).unwrap();
        let rows = index.rows_for("prot_1", false);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].taxon_name, "Homo sapiens");
        assert_eq!(rows[0].taxon_id, "9606");
        assert_eq!(rows[0].evalue, "1.23e-50");
        assert_eq!(rows[2].evalue, "0.000123");
    }

    #[test]
    fn test_rows_first_hit_only() {
        let index = parse_hits_str(HITS).unwrap();
        let rows = index.rows_for("prot_1", true);
        let names: Vec<&str> = rows.iter().map(|r| r.taxon_name.as_str()).collect();
        assert_eq!(names, vec!["Homo sapiens", "Mus musculus"]);
    }

    #[test]
    fn test_twelve_column_rows() {
        let content = "q1\ts1\t99\t10\t0\t0\t1\t10\t1\t10\t1e-5\t30\n";
        let index = parse_hits_str(content).unwrap();
        let rows = index.rows_for("q1", true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].taxon_name, "");
        assert_eq!(rows[0].evalue, "1e-05");
    }

    #[test]
    fn test_too_few_columns() {
        let result = parse_hits_str("q1\ts1\t99\n");
        assert!(matches!(result, Err(HitsError::TooFewColumns { found: 3, .. })));
    }

    #[test]
    fn test_invalid_value() {
        let content = "q1\ts1\tabc\t10\t0\t0\t1\t10\t1\t10\t1e-5\t30\n";
        let result = parse_hits_str(content);
        assert!(matches!(result, Err(HitsError::InvalidValue { column: "pident", .. })));
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(1.234e-50, 3), "1.23e-50");
        assert_eq!(format_significant(0.000123, 3), "0.000123");
        assert_eq!(format_significant(0.5, 3), "0.5");
        assert_eq!(format_significant(100.0, 3), "100");
        assert_eq!(format_significant(1234.0, 3), "1.23e+03");
    }

    #[test]
    fn test_format_shortest() {
        assert_eq!(format_shortest(1.2345678e-30), "1.2345678e-30");
        assert_eq!(format_shortest(1e-30), "1e-30");
        assert_eq!(format_shortest(1e-5), "1e-05");
        assert_eq!(format_shortest(0.01), "0.01");
        assert_eq!(format_shortest(0.0), "0");
        assert_eq!(format_shortest(2.5e20), "2.5e+20");
        assert_eq!(format_significant(0.0, 3), "0");
        assert_eq!(format_significant(9.999, 3), "10");
    }
}
