use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::DashboardConfig;
use crate::data::aggregate::{self, Breakdown, ExtremeYears};
use crate::data::model::{LoadStats, Table};

/// Every summary of the dashboard for one year, ready to serialise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub year: i32,
    pub focus_pathology: String,
    pub load: LoadStats,
    pub totals: Vec<(String, f64)>,
    pub series: Vec<(i32, BTreeMap<String, f64>)>,
    pub age_brackets: Breakdown<String>,
    pub top_age_bracket: Option<(String, f64)>,
    pub regions: Breakdown<i64>,
    pub top_region: Option<(i64, f64)>,
    /// `None` when the focus pathology has no rows at all.
    pub extremes: Option<ExtremeYears>,
    pub sexes: BTreeMap<String, f64>,
}

impl Report {
    pub fn build(table: &Table, config: &DashboardConfig, year: i32) -> Self {
        let focus = config.focus();
        let sentinels = &config.sentinels;

        let age_brackets = aggregate::by_age_bracket(table, &focus, year, &sentinels.all_ages);
        let regions =
            aggregate::by_region(table, &focus, year, sentinels.undetermined_region);
        let extremes = match aggregate::extreme_years(table, &focus) {
            Ok(e) => Some(e),
            Err(e) => {
                log::warn!("{e}");
                None
            }
        };

        Report {
            year,
            focus_pathology: focus.label.clone(),
            load: table.stats,
            totals: aggregate::totals_by_pathology(table, year, &config.groups),
            series: aggregate::series_by_year(table, &config.groups),
            top_age_bracket: age_brackets.top().cloned(),
            age_brackets,
            top_region: regions.top().copied(),
            regions,
            extremes,
            sexes: aggregate::by_sex(table, &focus, &sentinels.all_sexes),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CARDIONEUROVASCULAR, PSYCHIATRIC};
    use crate::data::loader::{load_reader, LoadOptions};

    const DATA: &str = "\
annee;patho_niv1;libelle_classe_age;libelle_sexe;region;Ntop
2019;Maladies psychiatriques;de 0 à 4 ans;hommes;11;100
2019;Maladies psychiatriques;de 5 à 9 ans;femmes;24;300
2019;Maladies psychiatriques;tous âges;tous sexes;99;400
2020;Maladies psychiatriques;de 0 à 4 ans;femmes;11;50
2020;Maladies cardioneurovasculaires;de 0 à 4 ans;hommes;11;70
";

    fn table() -> Table {
        load_reader(DATA.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn report_collects_every_summary() {
        let report = Report::build(&table(), &DashboardConfig::default(), 2019);

        assert_eq!(report.focus_pathology, PSYCHIATRIC);
        assert_eq!(report.load.kept, 5);
        assert_eq!(
            report.totals,
            vec![
                (PSYCHIATRIC.to_string(), 800.0),
                (CARDIONEUROVASCULAR.to_string(), 0.0)
            ]
        );
        assert_eq!(report.series.len(), 2);
        assert_eq!(report.age_brackets.len(), 2);
        assert_eq!(report.top_age_bracket, Some(("de 5 à 9 ans".to_string(), 300.0)));
        assert_eq!(report.top_region, Some((24, 300.0)));
        let extremes = report.extremes.unwrap();
        assert_eq!((extremes.min_year, extremes.max_year), (2020, 2019));
        assert_eq!(report.sexes["femmes"], 350.0);
    }

    #[test]
    fn report_for_unknown_focus_has_no_extremes() {
        let config = DashboardConfig {
            focus_pathology: "Cancers".to_string(),
            ..DashboardConfig::default()
        };
        let report = Report::build(&table(), &config, 2019);
        assert!(report.extremes.is_none());
        assert!(report.age_brackets.is_empty());
        assert!(report.top_region.is_none());
        assert!(report.sexes.is_empty());
    }

    #[test]
    fn json_export_has_flat_breakdowns() {
        let report = Report::build(&table(), &DashboardConfig::default(), 2020);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["year"], 2020);
        assert_eq!(value["regions"][0][0], 11);
        assert_eq!(value["top_region"][1], 50.0);
        assert_eq!(value["load"]["kept"], 5);
    }

    #[test]
    fn group_without_rows_exports_positive_zero() {
        // no cardioneurovascular rows in 2019
        let report = Report::build(&table(), &DashboardConfig::default(), 2019);
        assert!(report.totals[1].1.is_sign_positive());
        let json = report.to_json().unwrap();
        assert!(!json.contains("-0.0"));
    }
}
