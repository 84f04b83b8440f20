//! Derived summaries handed to the charts.
//!
//! Every function here is one filter + group-by + sum pass over a borrowed
//! [`Table`]; none of them mutate it and they can be called in any order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::filter::{sum_by, total, RecordFilter};
use super::model::{PathologyGroup, Table};
use crate::error::EmptySeriesError;

/// Age bracket that plain label sorting puts in the wrong place.
pub const FIVE_TO_NINE: &str = "de 5 à 9 ans";

// ---------------------------------------------------------------------------
// Breakdown – ordered (key, sum) pairs
// ---------------------------------------------------------------------------

/// Sums per category in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Breakdown<K> {
    entries: Vec<(K, f64)>,
}

impl<K> Breakdown<K> {
    pub fn entries(&self) -> &[(K, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().fold(0.0, |acc, (_, v)| acc + v)
    }

    /// The largest entry, the first one in display order on ties.
    /// `None` when there is no data.
    pub fn top(&self) -> Option<&(K, f64)> {
        self.entries.iter().fold(None, |best, e| match best {
            Some(b) if b.1 >= e.1 => Some(b),
            _ => Some(e),
        })
    }
}

// ---------------------------------------------------------------------------
// Per-pathology totals and yearly series
// ---------------------------------------------------------------------------

/// Total patients of each group for one year, in the order of `groups`.
/// A group with no rows that year totals 0.
pub fn totals_by_pathology(
    table: &Table,
    year: i32,
    groups: &[PathologyGroup],
) -> Vec<(String, f64)> {
    groups
        .iter()
        .map(|g| {
            let filter = RecordFilter::all().pathology(g).year(year);
            (g.label.clone(), total(table, filter))
        })
        .collect()
}

/// Yearly totals of every group, ascending by year.
///
/// The years are the union of the years any group has rows for, and every
/// point carries a value for every group (0 when the group has no rows that
/// year), so the series can be compared point for point.
pub fn series_by_year(
    table: &Table,
    groups: &[PathologyGroup],
) -> Vec<(i32, BTreeMap<String, f64>)> {
    let per_group: Vec<(&str, BTreeMap<i32, f64>)> = groups
        .iter()
        .map(|g| {
            let sums = sum_by(table, RecordFilter::all().pathology(g), |r| Some(r.year));
            (g.label.as_str(), sums)
        })
        .collect();

    let years: BTreeSet<i32> = per_group
        .iter()
        .flat_map(|(_, sums)| sums.keys().copied())
        .collect();

    years
        .into_iter()
        .map(|year| {
            let point = per_group
                .iter()
                .map(|(label, sums)| (label.to_string(), sums.get(&year).copied().unwrap_or(0.0)))
                .collect();
            (year, point)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Breakdowns for one pathology
// ---------------------------------------------------------------------------

/// Patients per age bracket for one pathology and year, `all_ages` excluded.
///
/// Brackets are sorted by label, then "de 5 à 9 ans" is moved to second
/// place. This is a one-off fix for that single label, which a label sort
/// puts after "de 45 à 49 ans"; no other bracket is reordered.
pub fn by_age_bracket(
    table: &Table,
    pathology: &PathologyGroup,
    year: i32,
    all_ages: &str,
) -> Breakdown<String> {
    let filter = RecordFilter::all().pathology(pathology).year(year);
    let sums = sum_by(table, filter, |r| {
        r.age_bracket
            .as_deref()
            .filter(|a| *a != all_ages)
            .map(str::to_string)
    });

    let mut entries: Vec<(String, f64)> = sums.into_iter().collect();
    if let Some(pos) = entries.iter().position(|(label, _)| label == FIVE_TO_NINE) {
        let five_to_nine = entries.remove(pos);
        let second = entries.len().min(1);
        entries.insert(second, five_to_nine);
    }
    Breakdown { entries }
}

/// Patients per region for one pathology and year, `undetermined` excluded,
/// largest first. Equal sums are ordered by ascending region code.
pub fn by_region(
    table: &Table,
    pathology: &PathologyGroup,
    year: i32,
    undetermined: i64,
) -> Breakdown<i64> {
    let filter = RecordFilter::all().pathology(pathology).year(year);
    let sums = sum_by(table, filter, |r| r.region.filter(|code| *code != undetermined));

    let mut entries: Vec<(i64, f64)> = sums.into_iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    Breakdown { entries }
}

/// Patients per sex for one pathology over all years, `all_sexes` excluded.
pub fn by_sex(table: &Table, pathology: &PathologyGroup, all_sexes: &str) -> BTreeMap<String, f64> {
    sum_by(table, RecordFilter::all().pathology(pathology), |r| {
        r.sex
            .as_deref()
            .filter(|s| *s != all_sexes)
            .map(str::to_string)
    })
}

// ---------------------------------------------------------------------------
// Extreme years
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtremeYears {
    pub min_year: i32,
    pub min_value: f64,
    pub max_year: i32,
    pub max_value: f64,
}

/// Years with the fewest and the most patients for one pathology. The
/// earliest year wins ties.
pub fn extreme_years(
    table: &Table,
    pathology: &PathologyGroup,
) -> Result<ExtremeYears, EmptySeriesError> {
    let per_year = sum_by(table, RecordFilter::all().pathology(pathology), |r| Some(r.year));
    let mut years = per_year.into_iter();

    let (year, value) = years.next().ok_or_else(|| EmptySeriesError {
        pathology: pathology.label.clone(),
    })?;
    let mut extremes = ExtremeYears {
        min_year: year,
        min_value: value,
        max_year: year,
        max_value: value,
    };
    for (year, value) in years {
        if value < extremes.min_value {
            extremes.min_year = year;
            extremes.min_value = value;
        }
        if value > extremes.max_value {
            extremes.max_year = year;
            extremes.max_value = value;
        }
    }
    Ok(extremes)
}
