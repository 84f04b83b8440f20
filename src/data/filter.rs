use std::collections::BTreeMap;

use super::model::{PathologyGroup, Record, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which rows an aggregation looks at
// ---------------------------------------------------------------------------

/// Row predicate shared by every aggregation.
///
/// A row passes when:
/// * no pathology group is set, or its `patho_niv1` is one of the group's
///   labels (a missing label never passes a pathology filter)
/// * no year is set, or its year equals the selected one
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilter<'a> {
    group: Option<&'a PathologyGroup>,
    year: Option<i32>,
}

impl<'a> RecordFilter<'a> {
    /// Every row passes.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pathology(mut self, group: &'a PathologyGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(year) = self.year {
            if record.year != year {
                return false;
            }
        }
        match (self.group, record.pathology.as_deref()) {
            (None, _) => true,
            (Some(group), Some(pathology)) => group.contains(pathology),
            (Some(_), None) => false,
        }
    }
}

/// Rows of `table` passing `filter`, in table order.
pub fn filtered<'a>(
    table: &'a Table,
    filter: RecordFilter<'a>,
) -> impl Iterator<Item = &'a Record> + 'a {
    table.records.iter().filter(move |r| filter.matches(r))
}

/// Sum of `Ntop` over the rows passing `filter`, `+0.0` when none pass.
pub fn total(table: &Table, filter: RecordFilter<'_>) -> f64 {
    // f64's Sum starts from -0.0
    filtered(table, filter).fold(0.0, |acc, r| acc + r.count())
}

/// Sum `Ntop` over the rows passing `filter`, grouped by `key`.
///
/// Rows for which `key` returns `None` form no group: this is how sentinel
/// categories and empty cells are kept out of a breakdown.
pub fn sum_by<K, F>(table: &Table, filter: RecordFilter<'_>, key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&Record) -> Option<K>,
{
    let mut sums = BTreeMap::new();
    for record in filtered(table, filter) {
        if let Some(k) = key(record) {
            *sums.entry(k).or_insert(0.0) += record.count();
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::LoadStats;

    fn record(year: i32, pathology: Option<&str>, region: Option<i64>, count: f64) -> Record {
        Record {
            year,
            pathology: pathology.map(str::to_string),
            age_bracket: None,
            sex: None,
            region,
            patient_count: Some(count),
        }
    }

    fn table() -> Table {
        Table::from_records(
            vec![
                record(2019, Some("A"), Some(11), 1.0),
                record(2019, Some("B"), Some(11), 2.0),
                record(2020, Some("A"), Some(24), 4.0),
                record(2020, None, Some(24), 8.0),
                record(2020, Some("A"), None, 16.0),
            ],
            LoadStats::default(),
        )
    }

    #[test]
    fn empty_filter_passes_everything() {
        let t = table();
        assert_eq!(filtered(&t, RecordFilter::all()).count(), 5);
    }

    #[test]
    fn missing_pathology_never_matches_a_group() {
        let t = table();
        let group = PathologyGroup::single("A");
        let years: Vec<i32> = filtered(&t, RecordFilter::all().pathology(&group))
            .map(|r| r.year)
            .collect();
        assert_eq!(years, vec![2019, 2020, 2020]);
    }

    #[test]
    fn group_with_several_pathologies_matches_each() {
        let t = table();
        let group = PathologyGroup::new("A+B", vec!["A".into(), "B".into()]);
        let filter = RecordFilter::all().pathology(&group).year(2019);
        assert_eq!(filtered(&t, filter).count(), 2);
    }

    #[test]
    fn total_counts_only_matching_rows() {
        let t = table();
        let group = PathologyGroup::single("A");
        assert_eq!(total(&t, RecordFilter::all().pathology(&group)), 21.0);
        assert_eq!(total(&t, RecordFilter::all().pathology(&group).year(2021)), 0.0);
    }

    #[test]
    fn total_of_no_rows_is_positive_zero() {
        let t = table();
        let group = PathologyGroup::single("absent");
        let sum = total(&t, RecordFilter::all().pathology(&group));
        assert_eq!(sum, 0.0);
        assert!(sum.is_sign_positive());
        assert_eq!(format!("{sum:.0}"), "0");
    }

    #[test]
    fn sum_by_skips_rows_without_a_key() {
        let t = table();
        let sums = sum_by(&t, RecordFilter::all().year(2020), |r| r.region);
        assert_eq!(sums.len(), 1);
        assert_eq!(sums[&24], 12.0);
    }
}
