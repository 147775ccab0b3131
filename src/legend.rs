//! Visibility of taxon labels in the legend.
//!
//! Legend toggles arrive as positions, so the label order is snapshotted at
//! every rebuild and stays fixed until the next one.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::model::{GeneRecord, UNASSIGNED};

/// Visibility reported for one legend entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendVisibility {
    Visible,
    /// Hidden from the plot but still listed in the legend
    LegendOnly,
}

impl LegendVisibility {
    /// Reads a plot restyle value: `"legendonly"` hides, anything else shows.
    pub fn from_plot_value(value: &str) -> Self {
        if value == "legendonly" {
            LegendVisibility::LegendOnly
        } else {
            LegendVisibility::Visible
        }
    }

    pub fn is_visible(self) -> bool {
        self == LegendVisibility::Visible
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegendVisibilityMap {
    visibility: IndexMap<String, bool>,
    legend_order: Vec<String>,
}

impl LegendVisibilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map with every label of `records` visible.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a GeneRecord>,
    {
        let mut map = Self::new();
        map.rebuild(records);
        map
    }

    /// Resets the map to the distinct labels of `records`, all visible.
    pub fn rebuild<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a GeneRecord>,
    {
        self.visibility.clear();
        for record in records {
            if record.plot_label != UNASSIGNED && !self.visibility.contains_key(&record.plot_label) {
                self.visibility.insert(record.plot_label.clone(), true);
            }
        }
        self.legend_order = self.visibility.keys().cloned().collect();
        log::debug!("Legend rebuilt with {} labels", self.legend_order.len());
    }

    /// Applies a restyle event mapping legend positions to visibilities.
    ///
    /// Positions outside `legend_order` are ignored.
    pub fn apply_toggle_event(&mut self, index_to_visibility: &BTreeMap<usize, LegendVisibility>) {
        for (&index, &visibility) in index_to_visibility {
            match self.legend_order.get(index) {
                Some(label) => {
                    self.visibility.insert(label.clone(), visibility.is_visible());
                }
                None => log::debug!("Ignoring legend toggle for position {}", index),
            }
        }
    }

    /// Label order captured at the last rebuild.
    pub fn legend_order(&self) -> &[String] {
        &self.legend_order
    }

    /// Visibility of `label`; labels unknown to the map count as visible.
    pub fn is_visible(&self, label: &str) -> bool {
        self.visibility.get(label).copied().unwrap_or(true)
    }

    /// Labels with their visibility, in legend order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> {
        self.legend_order
            .iter()
            .map(|label| (label.as_str(), self.is_visible(label)))
    }

    /// Records whose label is assigned and currently visible.
    pub fn visible_records<'a, I>(&self, records: I) -> Vec<&'a GeneRecord>
    where
        I: IntoIterator<Item = &'a GeneRecord>,
    {
        records
            .into_iter()
            .filter(|record| !record.is_unassigned() && self.is_visible(&record.plot_label))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<GeneRecord> {
        vec![
            GeneRecord::new("g1", "c1", "Bacteria"),
            GeneRecord::new("g2", "c1", UNASSIGNED),
            GeneRecord::new("g3", "c2", "Mammalia"),
            GeneRecord::new("g4", "c2", "Bacteria"),
        ]
    }

    fn toggle(index: usize, value: &str) -> BTreeMap<usize, LegendVisibility> {
        BTreeMap::from([(index, LegendVisibility::from_plot_value(value))])
    }

    #[test]
    fn test_rebuild_excludes_unassigned() {
        let map = LegendVisibilityMap::from_records(&records());
        assert_eq!(map.legend_order(), &["Bacteria".to_string(), "Mammalia".to_string()]);
        assert!(map.entries().all(|(_, visible)| visible));
    }

    #[test]
    fn test_visible_records_after_rebuild() {
        let records = records();
        let map = LegendVisibilityMap::from_records(&records);
        let visible: Vec<&str> = map
            .visible_records(&records)
            .iter()
            .map(|r| r.gene_name.as_str())
            .collect();
        assert_eq!(visible, vec!["g1", "g3", "g4"]);
    }

    #[test]
    fn test_toggle_round_trip() {
        let records = records();
        let mut map = LegendVisibilityMap::from_records(&records);
        let original = map.clone();

        map.apply_toggle_event(&toggle(0, "legendonly"));
        assert!(!map.is_visible("Bacteria"));
        let visible: Vec<&str> = map
            .visible_records(&records)
            .iter()
            .map(|r| r.gene_name.as_str())
            .collect();
        assert_eq!(visible, vec!["g3"]);

        map.apply_toggle_event(&toggle(0, "visible"));
        assert_eq!(map, original);
    }

    #[test]
    fn test_out_of_range_toggle_ignored() {
        let mut map = LegendVisibilityMap::from_records(&records());
        let before = map.clone();
        map.apply_toggle_event(&toggle(7, "legendonly"));
        assert_eq!(map, before);
    }

    #[test]
    fn test_unknown_label_is_visible() {
        let map = LegendVisibilityMap::from_records(&records());
        let stale = vec![GeneRecord::new("x1", "c9", "Archaea")];
        assert_eq!(map.visible_records(&stale).len(), 1);
    }

    #[test]
    fn test_rebuild_restores_visibility() {
        let records = records();
        let mut map = LegendVisibilityMap::from_records(&records);
        map.apply_toggle_event(&toggle(1, "legendonly"));
        map.rebuild(&records);
        assert!(map.is_visible("Mammalia"));
    }
}
