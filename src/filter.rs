//! Filter pipeline producing the plot data.
//!
//! Applies the e-value threshold and contig allow-list to the store's records,
//! then assigns each remaining row a colour and a display label. The display
//! label `"{plot_label} ({count})"` is derived here and never written back to
//! the record.
//!
//! Rows refer to records by their position in the slice given to [`apply`],
//! so a view can live next to the store it was computed from.

use std::collections::HashMap;

use crate::model::{ActiveFilter, GeneRecord};
use crate::palette::{self, Rgb};

/// One plotted point.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRow {
    /// Position of the record in the filtered slice
    pub index: usize,
    pub colour: Rgb,
    /// Label plus the number of plotted rows sharing it
    pub display_label: String,
}

/// Output of the filter pipeline over one set of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView {
    rows: Vec<PlotRow>,
    /// Distinct labels in first-appearance order, with their colour
    labels: Vec<(String, Rgb)>,
    /// Plotted rows per label
    counts: HashMap<String, usize>,
}

impl FilteredView {
    pub fn rows(&self) -> &[PlotRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&PlotRow> {
        self.rows.get(row)
    }

    /// The plotted records, in table order.
    ///
    /// `records` must be the slice the view was computed from.
    pub fn records<'r>(&'r self, records: &'r [GeneRecord]) -> impl Iterator<Item = &'r GeneRecord> + 'r {
        self.rows.iter().filter_map(move |row| records.get(row.index))
    }

    /// The record plotted at `row`.
    pub fn record<'r>(&self, records: &'r [GeneRecord], row: usize) -> Option<&'r GeneRecord> {
        self.rows.get(row).and_then(|r| records.get(r.index))
    }

    /// Distinct labels with their colour, in first-appearance order.
    pub fn labels(&self) -> &[(String, Rgb)] {
        &self.labels
    }

    pub fn colour_of(&self, label: &str) -> Option<Rgb> {
        self.labels
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, colour)| colour)
    }

    /// Number of plotted rows carrying `label`.
    pub fn count_of(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

/// Runs the pipeline.
///
/// Rows without an e-value or with `best_hit_evalue >= threshold` are dropped,
/// then rows outside the contig allow-list. An empty allow-list yields an
/// empty view.
pub fn apply(records: &[GeneRecord], filter: &ActiveFilter, colour_root: Option<Rgb>) -> FilteredView {
    if filter.contig_allowlist.as_ref().is_some_and(|allowed| allowed.is_empty()) {
        return FilteredView::default();
    }

    let kept: Vec<(usize, &GeneRecord)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.best_hit_evalue.is_some_and(|e| e < filter.evalue_threshold))
        .filter(|(_, r)| filter.allows_contig(&r.contig_name))
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, record) in &kept {
        let count = counts.entry(record.plot_label.as_str()).or_insert(0);
        if *count == 0 {
            order.push(&record.plot_label);
        }
        *count += 1;
    }

    let colours = palette::qualitative(order.len(), colour_root);
    let colour_by_label: HashMap<&str, Rgb> =
        order.iter().copied().zip(colours.iter().copied()).collect();

    let rows = kept
        .iter()
        .map(|&(index, record)| {
            let label = record.plot_label.as_str();
            PlotRow {
                index,
                colour: colour_by_label[label],
                display_label: format!("{} ({})", label, counts[label]),
            }
        })
        .collect();

    FilteredView {
        rows,
        labels: order
            .iter()
            .map(|&label| (label.to_string(), colour_by_label[label]))
            .collect(),
        counts: counts
            .iter()
            .map(|(&label, &count)| (label.to_string(), count))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::UNASSIGNED;

    fn records() -> Vec<GeneRecord> {
        vec![
            GeneRecord::new("g1", "c1", "A").with_evalue(Some(0.001)),
            GeneRecord::new("g2", "c1", "B").with_evalue(Some(0.5)),
            GeneRecord::new("g3", "c2", "A").with_evalue(Some(10.0)),
            GeneRecord::new("g4", "c2", UNASSIGNED).with_evalue(None),
            GeneRecord::new("g5", "c2", "A").with_evalue(Some(1e-10)),
        ]
    }

    fn names(view: &FilteredView, records: &[GeneRecord]) -> Vec<String> {
        view.records(records).map(|r| r.gene_name.clone()).collect()
    }

    fn filter(threshold: f64, contigs: Option<&[&str]>) -> ActiveFilter {
        ActiveFilter {
            evalue_threshold: threshold,
            contig_allowlist: contigs.map(|c| c.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>()),
        }
    }

    #[test]
    fn test_evalue_threshold() {
        let records = records();
        let view = apply(&records, &filter(1.0, None), None);
        assert_eq!(names(&view, &records), vec!["g1", "g2", "g5"]);

        let view = apply(&records, &filter(0.3, None), None);
        assert_eq!(names(&view, &records), vec!["g1", "g5"]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let records = vec![GeneRecord::new("g1", "c1", "A").with_evalue(Some(1.0))];
        assert!(apply(&records, &filter(1.0, None), None).is_empty());
    }

    #[test]
    fn test_contig_allowlist() {
        let records = records();
        let view = apply(&records, &filter(1.0, Some(&["c2"])), None);
        assert_eq!(names(&view, &records), vec!["g5"]);
        assert_eq!(view.record(&records, 0).unwrap().gene_name, "g5");
        assert!(view.record(&records, 1).is_none());
    }

    #[test]
    fn test_empty_allowlist_means_no_contigs() {
        let records = records();
        let view = apply(&records, &filter(1.0, Some(&[])), None);
        assert!(view.is_empty());
        assert!(view.labels().is_empty());
    }

    #[test]
    fn test_display_label_counts() {
        let records = records();
        let view = apply(&records, &filter(1.0, None), None);
        let labels: Vec<&str> = view.rows().iter().map(|r| r.display_label.as_str()).collect();
        assert_eq!(labels, vec!["A (2)", "B (1)", "A (2)"]);
        assert_eq!(view.count_of("A"), 2);
        assert_eq!(view.count_of("B"), 1);
        assert_eq!(view.count_of("missing"), 0);
        // The canonical label is untouched
        assert_eq!(view.record(&records, 0).unwrap().plot_label, "A");
    }

    #[test]
    fn test_colours_per_label() {
        let records = records();
        let view = apply(&records, &filter(1.0, None), None);
        assert_eq!(view.rows()[0].colour, view.rows()[2].colour);
        assert_ne!(view.rows()[0].colour, view.rows()[1].colour);
        assert_eq!(view.colour_of("B"), Some(view.rows()[1].colour));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let records = records();
        let f = filter(1.0, None);
        let root = Some(Rgb(0xdc, 0x14, 0x3c));
        assert_eq!(apply(&records, &f, root), apply(&records, &f, root));
    }
}
