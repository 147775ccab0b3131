//! Immutable records of one dataset.
//!
//! The store owns the gene table and, when available, the diamond hits of a
//! dataset. It is built once per dataset switch and only read afterwards.

use std::collections::{HashMap, HashSet};

use crate::formats::gene_table::{parse_gene_table_file, GeneTable};
use crate::formats::hits::{parse_hits_file, HitIndex};
use crate::formats::{DatasetLoadError, DatasetPaths};
use crate::glossary::Glossary;
use crate::model::{ColumnDescriptor, GeneRecord, HitRow};

#[derive(Debug, Clone)]
pub struct RecordStore {
    columns: Vec<ColumnDescriptor>,
    records: Vec<GeneRecord>,
    by_gene: HashMap<String, usize>,
    hits: Option<HitIndex>,
}

impl RecordStore {
    /// Loads the dataset at `paths`.
    ///
    /// A missing or malformed gene table is fatal. A missing or malformed hits
    /// table only disables the hits lookup.
    pub fn load(paths: &DatasetPaths, glossary: &Glossary) -> Result<Self, DatasetLoadError> {
        let table = parse_gene_table_file(paths.gene_table())?;
        let store = Self::from_table(table, glossary)?;

        let hits_path = paths.taxonomic_hits();
        let store = match parse_hits_file(&hits_path) {
            Ok(hits) => {
                log::info!("Loaded {} taxonomic hits from {}", hits.len(), hits_path.display());
                store.with_hits(hits)
            }
            Err(e) => {
                log::warn!("Taxonomic hits unavailable for {}: {}", paths.name(), e);
                store
            }
        };

        log::info!(
            "Loaded dataset {} with {} genes on {} contigs",
            paths.name(),
            store.len(),
            store.contigs().len()
        );
        Ok(store)
    }

    /// Builds a store from an already parsed table, checking key uniqueness.
    pub fn from_table(table: GeneTable, glossary: &Glossary) -> Result<Self, DatasetLoadError> {
        let mut by_gene = HashMap::with_capacity(table.records.len());
        let mut headers = HashSet::with_capacity(table.records.len());

        for (idx, record) in table.records.iter().enumerate() {
            if by_gene.insert(record.gene_name.clone(), idx).is_some() {
                return Err(DatasetLoadError::DuplicateGene(record.gene_name.clone()));
            }
            if !headers.insert(record.fasta_header.as_str()) {
                return Err(DatasetLoadError::DuplicateFastaHeader(record.fasta_header.clone()));
            }
        }

        Ok(Self {
            columns: table.columns.iter().map(|c| glossary.describe(c)).collect(),
            records: table.records,
            by_gene,
            hits: None,
        })
    }

    /// Attaches a hits table.
    pub fn with_hits(mut self, hits: HitIndex) -> Self {
        self.hits = Some(hits);
        self
    }

    /// All records in file order.
    pub fn all_records(&self) -> &[GeneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup_by_gene_name(&self, gene_name: &str) -> Option<&GeneRecord> {
        self.by_gene.get(gene_name).map(|&idx| &self.records[idx])
    }

    pub fn lookup_fasta_header(&self, gene_name: &str) -> Option<&str> {
        self.lookup_by_gene_name(gene_name)
            .map(|record| record.fasta_header.as_str())
    }

    pub fn hits_available(&self) -> bool {
        self.hits.is_some()
    }

    /// Hits for a protein, or `None` when the dataset has no usable hits table.
    pub fn taxonomic_hits_for(&self, fasta_header: &str, first_hit_only: bool) -> Option<Vec<HitRow>> {
        self.hits
            .as_ref()
            .map(|hits| hits.rows_for(fasta_header, first_hit_only))
    }

    /// Every column of the gene table, with glossary labels.
    pub fn selectable_variables(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Raw cell of `record` in `column`.
    pub fn value_of<'a>(&self, record: &'a GeneRecord, column: &str) -> Option<&'a str> {
        self.column_index(column)
            .and_then(|idx| record.values.get(idx))
            .map(String::as_str)
    }

    /// Distinct contig names in file order.
    pub fn contigs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.contig_name.as_str())
            .filter(|contig| seen.insert(*contig))
            .collect()
    }

    /// Descriptors of the requested columns, in request order.
    ///
    /// A metric family such as `g_cov_` stands for all of its replicate
    /// columns. Unknown names are skipped, repeated ones kept once.
    pub fn describe_columns<S: AsRef<str>>(&self, requested: &[S]) -> Vec<&ColumnDescriptor> {
        let mut described: Vec<&ColumnDescriptor> = Vec::new();
        for name in requested {
            let name = name.as_ref();
            let matching = self
                .columns
                .iter()
                .filter(|c| c.name == name || (c.metric.replicate.is_some() && c.metric.family == name));
            for column in matching {
                if !described.iter().any(|d| d.name == column.name) {
                    described.push(column);
                }
            }
        }
        described
    }
}
