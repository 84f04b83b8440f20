use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single stratum of the extract: patients with one pathology, in one age
/// bracket, sex and region, for one year.
///
/// Label and region cells may be empty in the source; an empty cell never
/// matches a filter and forms no group in a breakdown over that column.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: i32,
    /// `patho_niv1`
    pub pathology: Option<String>,
    /// `libelle_classe_age`
    pub age_bracket: Option<String>,
    /// `libelle_sexe`
    pub sex: Option<String>,
    /// `region`; 99 is the undetermined/aggregate region.
    pub region: Option<i64>,
    /// `Ntop`
    pub patient_count: Option<f64>,
}

impl Record {
    /// Patient count as summed by the aggregations: missing counts as zero.
    pub fn count(&self) -> f64 {
        self.patient_count.unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// LoadStats – what the loader kept and dropped
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Data rows seen after the header.
    pub rows_read: usize,
    /// Rows that made it into the table.
    pub kept: usize,
    /// Rows skipped because they could not be parsed.
    pub malformed: usize,
    /// Rows dropped by the year filter (including non-numeric years).
    pub out_of_range: usize,
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The loaded, read-only table with pre-computed column indices.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub records: Vec<Record>,
    /// Sorted set of years present.
    pub years: BTreeSet<i32>,
    /// Sorted set of `patho_niv1` labels present.
    pub pathologies: BTreeSet<String>,
    pub stats: LoadStats,
}

impl Table {
    /// Build the indices from the loaded records.
    pub fn from_records(records: Vec<Record>, stats: LoadStats) -> Self {
        let years = records.iter().map(|r| r.year).collect();
        let pathologies = records
            .iter()
            .filter_map(|r| r.pathology.clone())
            .collect();
        Table {
            records,
            years,
            pathologies,
            stats,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Years present, ascending. This is what the year selectors offer.
    pub fn year_list(&self) -> Vec<i32> {
        self.years.iter().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// PathologyGroup – named set of `patho_niv1` labels
// ---------------------------------------------------------------------------

/// A named group of one or more `patho_niv1` values, summed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathologyGroup {
    pub label: String,
    pub pathologies: Vec<String>,
}

impl PathologyGroup {
    pub fn new(label: impl Into<String>, pathologies: Vec<String>) -> Self {
        Self {
            label: label.into(),
            pathologies,
        }
    }

    /// A group made of a single pathology, labelled by that pathology.
    pub fn single(pathology: impl Into<String>) -> Self {
        let pathology = pathology.into();
        Self {
            label: pathology.clone(),
            pathologies: vec![pathology],
        }
    }

    pub fn contains(&self, pathology: &str) -> bool {
        self.pathologies.iter().any(|p| p == pathology)
    }
}
