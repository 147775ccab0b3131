//! The set of selected genes.
//!
//! Members are gene names. Names left over from another dataset are harmless:
//! they simply never match a record.

use std::collections::BTreeSet;

use crate::model::GeneRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    genes: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a gene. Selecting twice is a no-op.
    pub fn select(&mut self, gene_name: &str) {
        if !self.genes.contains(gene_name) {
            self.genes.insert(gene_name.to_string());
        }
    }

    /// Removes a gene. Unselecting an absent gene is a no-op.
    pub fn unselect(&mut self, gene_name: &str) {
        self.genes.remove(gene_name);
    }

    pub fn reset(&mut self) {
        self.genes.clear();
    }

    pub fn bulk_add<I, S>(&mut self, gene_names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for gene_name in gene_names {
            self.select(gene_name.as_ref());
        }
    }

    pub fn contains(&self, gene_name: &str) -> bool {
        self.genes.contains(gene_name)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Selected gene names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.genes.iter().map(String::as_str)
    }

    /// Selected gene names as owned tokens, for persistence.
    pub fn to_tokens(&self) -> Vec<String> {
        self.genes.iter().cloned().collect()
    }

    /// Records that are selected, in the order of `records`.
    pub fn selected_rows<'a, I>(&self, records: I) -> Vec<&'a GeneRecord>
    where
        I: IntoIterator<Item = &'a GeneRecord>,
    {
        if self.genes.is_empty() {
            return Vec::new();
        }
        records
            .into_iter()
            .filter(|record| self.contains(&record.gene_name))
            .collect()
    }

    /// Records that are not selected, in the order of `records`.
    pub fn unselected_rows<'a, I>(&self, records: I) -> Vec<&'a GeneRecord>
    where
        I: IntoIterator<Item = &'a GeneRecord>,
    {
        records
            .into_iter()
            .filter(|record| !self.contains(&record.gene_name))
            .collect()
    }

    /// Pairs every record with its current membership.
    pub fn annotate<'a, I>(&self, records: I) -> Vec<(&'a GeneRecord, bool)>
    where
        I: IntoIterator<Item = &'a GeneRecord>,
    {
        records
            .into_iter()
            .map(|record| (record, self.contains(&record.gene_name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<GeneRecord> {
        vec![
            GeneRecord::new("g1", "c1", "A"),
            GeneRecord::new("g2", "c1", "A"),
            GeneRecord::new("g3", "c2", "B"),
        ]
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut selection = SelectionSet::new();
        selection.select("g1");
        selection.select("g1");
        assert_eq!(selection.len(), 1);
        assert!(selection.contains("g1"));
    }

    #[test]
    fn test_unselect_restores_previous_state() {
        let mut selection = SelectionSet::new();
        selection.select("g2");
        let before = selection.clone();

        selection.select("g1");
        selection.unselect("g1");
        assert_eq!(selection, before);

        // Absent gene
        selection.unselect("g9");
        assert_eq!(selection, before);
    }

    #[test]
    fn test_reset_empties_rows() {
        let records = records();
        let mut selection = SelectionSet::new();
        selection.bulk_add(["g1", "g3"]);
        selection.reset();
        assert!(selection.selected_rows(&records).is_empty());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_bulk_add_order_independent() {
        let mut ab = SelectionSet::new();
        ab.bulk_add(["a", "b"]);
        let mut ba = SelectionSet::new();
        ba.bulk_add(["b", "a", "b"]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_rows_preserve_record_order() {
        let records = records();
        let mut selection = SelectionSet::new();
        selection.bulk_add(["g3", "g1", "stale_gene"]);

        let selected: Vec<&str> = selection
            .selected_rows(&records)
            .iter()
            .map(|r| r.gene_name.as_str())
            .collect();
        assert_eq!(selected, vec!["g1", "g3"]);

        let unselected: Vec<&str> = selection
            .unselected_rows(&records)
            .iter()
            .map(|r| r.gene_name.as_str())
            .collect();
        assert_eq!(unselected, vec!["g2"]);
    }

    #[test]
    fn test_annotate_reflects_current_membership() {
        let records = records();
        let mut selection = SelectionSet::new();
        selection.select("g2");

        let annotated = selection.annotate(&records);
        assert_eq!(annotated.len(), records.len());
        let flags: Vec<bool> = annotated.iter().map(|(_, selected)| *selected).collect();
        assert_eq!(flags, vec![false, true, false]);

        selection.unselect("g2");
        assert!(selection.annotate(&records).iter().all(|(_, selected)| !selected));
    }

    #[test]
    fn test_tokens_sorted() {
        let mut selection = SelectionSet::new();
        selection.bulk_add(["g2", "g1"]);
        assert_eq!(selection.to_tokens(), vec!["g1", "g2"]);
    }
}
