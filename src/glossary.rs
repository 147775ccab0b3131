//! Human readable names for table columns.
//!
//! The glossary is a JSON object keyed by metric family (the column name
//! with its replicate digits removed):
//!
//! ```json
//! { "g_cov_": { "short": "Gene coverage", "details": "Mean read depth of the gene" } }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::model::{ColumnDescriptor, MetricName};

/// Errors that can occur while loading a glossary.
#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Failed to read glossary: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid glossary: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlossaryEntry {
    pub short: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Glossary {
    entries: HashMap<String, GlossaryEntry>,
}

impl Glossary {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GlossaryError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn from_json(content: &str) -> Result<Self, GlossaryError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn get(&self, family: &str) -> Option<&GlossaryEntry> {
        self.entries.get(family)
    }

    /// Builds the descriptor of `column`, labelled when the glossary knows its family.
    pub fn describe(&self, column: &str) -> ColumnDescriptor {
        let metric = MetricName::parse(column);
        let entry = self.get(&metric.family);
        let label = entry.map(|e| match metric.replicate {
            Some(replicate) => format!("{} {}", e.short, replicate),
            None => e.short.clone(),
        });
        ColumnDescriptor {
            name: column.to_string(),
            details: entry.map(|e| e.details.clone()),
            label,
            metric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOSSARY: &str = r#"{
        "g_cov_": { "short": "Gene coverage", "details": "Mean read depth of the gene" },
        "bh_evalue": { "short": "Best hit e-value" }
    }"#;

    #[test]
    fn test_describe_replicate_column() {
        let glossary = Glossary::from_json(GLOSSARY).unwrap();
        let descriptor = glossary.describe("g_cov_2");
        assert_eq!(descriptor.label.as_deref(), Some("Gene coverage 2"));
        assert_eq!(descriptor.details.as_deref(), Some("Mean read depth of the gene"));
        assert_eq!(descriptor.metric.replicate, Some(2));
    }

    #[test]
    fn test_describe_plain_and_unknown_columns() {
        let glossary = Glossary::from_json(GLOSSARY).unwrap();
        assert_eq!(glossary.describe("bh_evalue").display_name(), "Best hit e-value");

        let unknown = glossary.describe("c_name");
        assert_eq!(unknown.label, None);
        assert_eq!(unknown.display_name(), "c_name");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(Glossary::from_json("[1, 2]"), Err(GlossaryError::Json(_))));
    }
}
