use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use effectifs_dashboard::data::aggregate::{self, Breakdown, ExtremeYears};
use effectifs_dashboard::data::loader::{load_csv, SourceId};
use effectifs_dashboard::data::model::Table;
use effectifs_dashboard::report::Report;
use effectifs_dashboard::{DashboardConfig, EmptySeriesError};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Year selectors
// ---------------------------------------------------------------------------

/// Charts that have their own year selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearChart {
    Totals,
    AgeBrackets,
    Regions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSelection {
    pub totals: i32,
    pub age_brackets: i32,
    pub regions: i32,
}

impl YearSelection {
    fn all(year: i32) -> Self {
        Self {
            totals: year,
            age_brackets: year,
            regions: year,
        }
    }

    pub fn get(&self, chart: YearChart) -> i32 {
        match chart {
            YearChart::Totals => self.totals,
            YearChart::AgeBrackets => self.age_brackets,
            YearChart::Regions => self.regions,
        }
    }
}

// ---------------------------------------------------------------------------
// Cached aggregates
// ---------------------------------------------------------------------------

/// What the charts draw. Rebuilt when a table is loaded; the year-dependent
/// parts are rebuilt when their selector changes.
pub struct Views {
    pub totals: Vec<(String, f64)>,
    pub series: Vec<(i32, BTreeMap<String, f64>)>,
    pub age_brackets: Breakdown<String>,
    pub regions: Breakdown<i64>,
    pub focus_series: Vec<(i32, f64)>,
    pub extremes: Result<ExtremeYears, EmptySeriesError>,
    pub sexes: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded table (None until a file is loaded).
    pub table: Option<Table>,

    /// Identity of the file `table` was read from.
    pub source: Option<SourceId>,

    /// Years offered by the selectors, ascending.
    pub years: Vec<i32>,

    pub selection: YearSelection,

    pub views: Option<Views>,

    /// Colours of the pathology groups.
    pub group_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let group_colors = ColorMap::new(config.groups.iter().map(|g| g.label.as_str()));
        Self {
            config,
            table: None,
            source: None,
            years: Vec::new(),
            selection: YearSelection::all(0),
            views: None,
            group_colors,
            status_message: None,
        }
    }

    /// Load `path` unless it is the file already loaded and it did not change.
    pub fn load_path(&mut self, path: &Path) {
        let source = match SourceId::of(path) {
            Ok(source) => Some(source),
            Err(e) => {
                log::debug!("Cannot identify {}: {e}", path.display());
                None
            }
        };
        if source.is_some() && source == self.source && self.table.is_some() {
            log::info!("{} unchanged, keeping the loaded table", path.display());
            return;
        }

        match load_csv(path, &self.config.load_options()) {
            Ok(table) => {
                self.config.data_path = path.to_path_buf();
                self.set_table(table, source);
            }
            Err(e) => {
                let e = anyhow::Error::new(e);
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded table, reset the selectors and recompute the views.
    pub fn set_table(&mut self, table: Table, source: Option<SourceId>) {
        self.years = table.year_list();
        // Selectors start on the first year offered.
        self.selection = YearSelection::all(self.years.first().copied().unwrap_or(0));
        self.status_message = if table.is_empty() {
            Some("No rows in the selected year range.".to_string())
        } else {
            None
        };
        self.views = Some(compute_views(&table, &self.config, self.selection));
        self.table = Some(table);
        self.source = source;
    }

    /// Change one chart's year and recompute only that chart.
    pub fn select_year(&mut self, chart: YearChart, year: i32) {
        if self.selection.get(chart) == year {
            return;
        }
        let (Some(table), Some(views)) = (&self.table, &mut self.views) else {
            return;
        };
        let config = &self.config;
        let focus = config.focus();
        match chart {
            YearChart::Totals => {
                self.selection.totals = year;
                views.totals = aggregate::totals_by_pathology(table, year, &config.groups);
            }
            YearChart::AgeBrackets => {
                self.selection.age_brackets = year;
                views.age_brackets =
                    aggregate::by_age_bracket(table, &focus, year, &config.sentinels.all_ages);
            }
            YearChart::Regions => {
                self.selection.regions = year;
                views.regions = aggregate::by_region(
                    table,
                    &focus,
                    year,
                    config.sentinels.undetermined_region,
                );
            }
        }
    }

    /// Write the JSON summary for the totals chart's year.
    pub fn export_report(&self, path: &Path) -> Result<()> {
        let table = self.table.as_ref().context("no dataset loaded")?;
        let report = Report::build(table, &self.config, self.selection.totals);
        let json = report.to_json().context("serialising report")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported {} summary to {}", report.year, path.display());
        Ok(())
    }
}

fn compute_views(table: &Table, config: &DashboardConfig, selection: YearSelection) -> Views {
    let focus = config.focus();
    let sentinels = &config.sentinels;
    let focus_series = aggregate::series_by_year(table, std::slice::from_ref(&focus))
        .into_iter()
        .map(|(year, point)| (year, point.get(&focus.label).copied().unwrap_or(0.0)))
        .collect();

    Views {
        totals: aggregate::totals_by_pathology(table, selection.totals, &config.groups),
        series: aggregate::series_by_year(table, &config.groups),
        age_brackets: aggregate::by_age_bracket(
            table,
            &focus,
            selection.age_brackets,
            &sentinels.all_ages,
        ),
        regions: aggregate::by_region(
            table,
            &focus,
            selection.regions,
            sentinels.undetermined_region,
        ),
        focus_series,
        extremes: aggregate::extreme_years(table, &focus),
        sexes: aggregate::by_sex(table, &focus, &sentinels.all_sexes),
    }
}
