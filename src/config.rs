use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::LoadOptions;
use crate::data::model::PathologyGroup;

pub const DEFAULT_DATA_PATH: &str = "effectifs.csv";
pub const PSYCHIATRIC: &str = "Maladies psychiatriques";
pub const CARDIONEUROVASCULAR: &str = "Maladies cardioneurovasculaires";

/// Dashboard settings. Every key is optional in the TOML file; missing keys
/// keep the defaults below.
///
/// ```toml
/// data_path = "data/effectifs.csv"
/// year_min = 2016
///
/// [sentinels]
/// undetermined_region = 99
///
/// [[groups]]
/// label = "Psychiatrie"
/// pathologies = ["Maladies psychiatriques"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub delimiter: char,
    pub year_min: i32,
    pub year_max: i32,
    /// Pathology of the age, region, yearly and sex charts.
    pub focus_pathology: String,
    pub sentinels: Sentinels,
    /// Groups compared by the totals and yearly series charts.
    pub groups: Vec<PathologyGroup>,
}

/// Category values standing for "every value" of their column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Sentinels {
    pub all_ages: String,
    pub all_sexes: String,
    pub undetermined_region: i64,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            all_ages: "tous âges".to_string(),
            all_sexes: "tous sexes".to_string(),
            undetermined_region: 99,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            delimiter: ';',
            year_min: 2015,
            year_max: 2022,
            focus_pathology: PSYCHIATRIC.to_string(),
            sentinels: Sentinels::default(),
            groups: vec![
                PathologyGroup::single(PSYCHIATRIC),
                PathologyGroup::single(CARDIONEUROVASCULAR),
            ],
        }
    }
}

impl DashboardConfig {
    /// Read a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("parsing configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be an ASCII character, got {:?}", self.delimiter);
        }
        ensure!(
            self.year_min <= self.year_max,
            "year_min ({}) is after year_max ({})",
            self.year_min,
            self.year_max
        );
        ensure!(!self.groups.is_empty(), "at least one pathology group is required");
        let mut labels = BTreeSet::new();
        for group in &self.groups {
            ensure!(
                !group.pathologies.is_empty(),
                "group '{}' has no pathologies",
                group.label
            );
            ensure!(
                labels.insert(group.label.as_str()),
                "group label '{}' is used twice",
                group.label
            );
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            // validate() guarantees ASCII
            delimiter: self.delimiter as u8,
            years: self.year_min..=self.year_max,
        }
    }

    /// The focus pathology as a single-label group.
    pub fn focus(&self) -> PathologyGroup {
        PathologyGroup::single(self.focus_pathology.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_extract() {
        let config = DashboardConfig::default();
        assert_eq!(config.load_options(), LoadOptions::default());
        assert_eq!(config.focus().pathologies, vec![PSYCHIATRIC.to_string()]);
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.sentinels.undetermined_region, 99);
    }

    #[test]
    fn empty_file_is_the_default() {
        assert_eq!(
            DashboardConfig::from_toml_str("").unwrap(),
            DashboardConfig::default()
        );
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = DashboardConfig::from_toml_str(
            r#"
            year_min = 2016
            data_path = "data/effectifs.csv"

            [sentinels]
            undetermined_region = 0

            [[groups]]
            label = "Psy + cardio"
            pathologies = ["Maladies psychiatriques", "Maladies cardioneurovasculaires"]
            "#,
        )
        .unwrap();
        assert_eq!(config.year_min, 2016);
        assert_eq!(config.year_max, 2022);
        assert_eq!(config.data_path, PathBuf::from("data/effectifs.csv"));
        assert_eq!(config.sentinels.undetermined_region, 0);
        assert_eq!(config.sentinels.all_ages, "tous âges");
        assert_eq!(config.groups.len(), 1);
        assert!(config.groups[0].contains(CARDIONEUROVASCULAR));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(DashboardConfig::from_toml_str("year_min = 2023").is_err());
        assert!(DashboardConfig::from_toml_str("delimiter = \"é\"").is_err());
        assert!(DashboardConfig::from_toml_str("groups = []").is_err());
        assert!(DashboardConfig::from_toml_str("unknown_key = 1").is_err());
    }

    #[test]
    fn duplicate_group_labels_are_rejected() {
        let err = DashboardConfig::from_toml_str(
            r#"
            [[groups]]
            label = "X"
            pathologies = ["Maladies psychiatriques"]

            [[groups]]
            label = "X"
            pathologies = ["Maladies cardioneurovasculaires"]
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("used twice"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DashboardConfig::load(Path::new("/nonexistent/dashboard.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("reading configuration"));
    }
}
