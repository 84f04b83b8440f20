use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use eframe::egui::{self, Align2, Color32, RichText, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, Points, Polygon, Text};

use crate::color::ColorMap;
use crate::state::{AppState, YearChart};

const CHART_HEIGHT: f32 = 300.0;
const TEAL: Color32 = Color32::from_rgb(0, 128, 128);
const PURPLE: Color32 = Color32::from_rgb(128, 0, 128);
const NO_DATA: &str = "Aucune donnée disponible pour l'année sélectionnée.";

// ---------------------------------------------------------------------------
// Dashboard (central panel)
// ---------------------------------------------------------------------------

/// Render the six chart sections in the central panel.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if state.views.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a dataset to view the charts  (File → Open…)");
        });
        return;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            totals_section(ui, state);
            ui.separator();
            series_section(ui, state);
            ui.separator();
            age_section(ui, state);
            ui.separator();
            region_section(ui, state);
            ui.separator();
            evolution_section(ui, state);
            ui.separator();
            sex_section(ui, state);
        });
}

// ---------------------------------------------------------------------------
// 1. Totals per pathology group
// ---------------------------------------------------------------------------

fn totals_section(ui: &mut Ui, state: &mut AppState) {
    let year = state.selection.totals;
    if let Some(y) = year_selector(ui, "totals_year", &state.years, year) {
        state.select_year(YearChart::Totals, y);
    }
    let Some(views) = &state.views else { return };
    let year = state.selection.totals;

    ui.heading(format!(
        "Total des personnes prises en charge pour chaque pathologie ({year})"
    ));
    for (label, total) in &views.totals {
        ui.label(format!("Total pour {label} : {}", count(*total)));
    }

    let bars: Vec<Bar> = views
        .totals
        .iter()
        .enumerate()
        .map(|(i, (label, total))| {
            Bar::new(i as f64, *total)
                .name(label)
                .fill(state.group_colors.color_for(label))
                .width(0.6)
        })
        .collect();
    let labels: Vec<String> = views.totals.iter().map(|(l, _)| l.clone()).collect();

    static_plot("totals_plot")
        .x_axis_label("Pathologies")
        .y_axis_label("Personnes prises en charge (en millions)")
        .x_axis_formatter(category_axis(labels))
        .y_axis_formatter(millions_axis)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars)));
}

// ---------------------------------------------------------------------------
// 2. Yearly series per pathology group
// ---------------------------------------------------------------------------

fn series_section(ui: &mut Ui, state: &AppState) {
    let Some(views) = &state.views else { return };
    let (first, last) = year_bounds(&state.years);
    ui.heading(format!("Nombre de prises en charge par année ({first}-{last})"));

    static_plot("series_plot")
        .legend(Legend::default())
        .x_axis_label("Année")
        .y_axis_label("Prises en charge (en millions)")
        .x_axis_formatter(year_axis)
        .y_axis_formatter(millions_axis)
        .show(ui, |plot_ui| {
            for group in &state.config.groups {
                let color = state.group_colors.color_for(&group.label);
                let points: Vec<[f64; 2]> = views
                    .series
                    .iter()
                    .map(|(year, point)| {
                        [*year as f64, point.get(&group.label).copied().unwrap_or(0.0)]
                    })
                    .collect();
                plot_ui.line(
                    Line::new(points.clone())
                        .name(&group.label)
                        .color(color)
                        .width(2.0),
                );
                plot_ui.points(Points::new(points).radius(4.0).color(color));
            }
        });
}

// ---------------------------------------------------------------------------
// 3. Focus pathology by age bracket
// ---------------------------------------------------------------------------

fn age_section(ui: &mut Ui, state: &mut AppState) {
    let year = state.selection.age_brackets;
    if let Some(y) = year_selector(ui, "age_year", &state.years, year) {
        state.select_year(YearChart::AgeBrackets, y);
    }
    let Some(views) = &state.views else { return };
    let year = state.selection.age_brackets;

    ui.heading(format!(
        "{} par groupe d'âge ({year})",
        state.config.focus_pathology
    ));
    match views.age_brackets.top() {
        Some((label, value)) => ui.label(format!(
            "Le groupe d'âge le plus touché est : {label} avec {} cas.",
            count(*value)
        )),
        None => ui.label(NO_DATA),
    };

    let entries = views.age_brackets.entries();
    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, (label, value))| Bar::new(i as f64, *value).name(label).width(0.7))
        .collect();
    let labels: Vec<String> = entries.iter().map(|(l, _)| l.clone()).collect();

    static_plot("age_plot")
        .x_axis_label("Groupe d'âge")
        .y_axis_label("Nombre de cas (en millions)")
        .x_axis_formatter(category_axis(labels))
        .y_axis_formatter(millions_axis)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).color(TEAL)));
}

// ---------------------------------------------------------------------------
// 4. Focus pathology by region
// ---------------------------------------------------------------------------

fn region_section(ui: &mut Ui, state: &mut AppState) {
    let year = state.selection.regions;
    if let Some(y) = year_selector(ui, "region_year", &state.years, year) {
        state.select_year(YearChart::Regions, y);
    }
    let Some(views) = &state.views else { return };
    let year = state.selection.regions;

    ui.heading(format!("{} par région ({year})", state.config.focus_pathology));
    match views.regions.top() {
        Some((code, value)) => ui.label(format!(
            "En {year}, la région avec le plus grand nombre de cas est : {code} avec {} cas.",
            count(*value)
        )),
        None => ui.label(format!("Aucune donnée disponible pour l'année sélectionnée : {year}.")),
    };

    let entries = views.regions.entries();
    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, (code, value))| Bar::new(i as f64, *value).name(code).width(0.7))
        .collect();
    let labels: Vec<String> = entries.iter().map(|(code, _)| code.to_string()).collect();

    static_plot("region_plot")
        .x_axis_label("Région")
        .y_axis_label("Nombre de cas (en millions)")
        .x_axis_formatter(category_axis(labels))
        .y_axis_formatter(millions_axis)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).color(PURPLE)));

    if entries.is_empty() {
        return;
    }
    ui.push_id("region_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .vscroll(false)
            .column(Column::auto().at_least(50.0))
            .column(Column::auto().at_least(80.0))
            .column(Column::remainder())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Rang");
                });
                header.col(|ui| {
                    ui.strong("Région");
                });
                header.col(|ui| {
                    ui.strong("Cas");
                });
            })
            .body(|mut body| {
                for (rank, (code, value)) in entries.iter().enumerate() {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.label((rank + 1).to_string());
                        });
                        row.col(|ui| {
                            ui.label(code.to_string());
                        });
                        row.col(|ui| {
                            ui.label(count(*value));
                        });
                    });
                }
            });
    });
}

// ---------------------------------------------------------------------------
// 5. Yearly evolution of the focus pathology
// ---------------------------------------------------------------------------

fn evolution_section(ui: &mut Ui, state: &AppState) {
    let Some(views) = &state.views else { return };
    let (first, last) = year_bounds(&state.years);
    ui.heading(format!(
        "Évolution : {} ({first}-{last})",
        state.config.focus_pathology
    ));

    let extremes = match &views.extremes {
        Ok(e) => {
            ui.label(format!(
                "Année avec le plus grand nombre de cas : {} avec {} cas.",
                e.max_year,
                count(e.max_value)
            ));
            ui.label(format!(
                "Année avec le moins de cas : {} avec {} cas.",
                e.min_year,
                count(e.min_value)
            ));
            *e
        }
        Err(e) => {
            ui.label(format!("Aucune donnée disponible ({e})."));
            return;
        }
    };

    let points: Vec<[f64; 2]> = views
        .focus_series
        .iter()
        .map(|(year, value)| [*year as f64, *value])
        .collect();

    static_plot("evolution_plot")
        .legend(Legend::default())
        .x_axis_label("Année")
        .y_axis_label("Nombre de cas")
        .x_axis_formatter(year_axis)
        .y_axis_formatter(millions_axis)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(points.clone())
                    .name(&state.config.focus_pathology)
                    .color(PURPLE)
                    .width(2.0),
            );
            plot_ui.points(Points::new(points).radius(4.0).color(PURPLE));
            plot_ui.text(
                Text::new(
                    PlotPoint::new(extremes.max_year as f64, extremes.max_value),
                    RichText::new(format!("Max ({})", count(extremes.max_value))).strong(),
                )
                .anchor(Align2::CENTER_BOTTOM),
            );
            plot_ui.text(
                Text::new(
                    PlotPoint::new(extremes.min_year as f64, extremes.min_value),
                    RichText::new(format!("Min ({})", count(extremes.min_value))).strong(),
                )
                .anchor(Align2::CENTER_TOP),
            );
        });
}

// ---------------------------------------------------------------------------
// 6. Focus pathology by sex
// ---------------------------------------------------------------------------

fn sex_section(ui: &mut Ui, state: &AppState) {
    let Some(views) = &state.views else { return };
    ui.heading(format!("Répartition par sexe : {}", state.config.focus_pathology));

    let slices = pie_slices(&views.sexes);
    if slices.is_empty() {
        ui.label(NO_DATA);
        return;
    }
    let colors = ColorMap::new(slices.iter().map(|s| s.label.as_str()));

    Plot::new("sex_plot")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .include_x(-1.5)
        .include_x(1.5)
        .include_y(-1.5)
        .include_y(1.5)
        .show(ui, |plot_ui| {
            for slice in &slices {
                let color = colors.color_for(&slice.label);
                plot_ui.polygon(
                    Polygon::new(slice.outline(1.0, 0.1))
                        .name(&slice.label)
                        .fill_color(color)
                        .stroke(Stroke::new(1.0, Color32::WHITE)),
                );
                let [x, y] = slice.label_anchor(0.6);
                plot_ui.text(Text::new(
                    PlotPoint::new(x, y),
                    RichText::new(format!("{:.1}%", slice.share * 100.0)).strong(),
                ));
            }
        });
}

/// One slice of a pie chart, angles in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub share: f64,
    pub start: f64,
    pub end: f64,
}

impl PieSlice {
    fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Closed outline of the slice, pushed out of the centre by `explode`.
    pub fn outline(&self, radius: f64, explode: f64) -> Vec<[f64; 2]> {
        let (cx, cy) = (explode * self.mid().cos(), explode * self.mid().sin());
        let steps = ((self.end - self.start) / TAU * 96.0).ceil().max(2.0) as usize;
        let mut points = Vec::with_capacity(steps + 2);
        points.push([cx, cy]);
        for i in 0..=steps {
            let a = self.start + (self.end - self.start) * i as f64 / steps as f64;
            points.push([cx + radius * a.cos(), cy + radius * a.sin()]);
        }
        points
    }

    /// Point on the slice's bisector at `distance` from the centre.
    pub fn label_anchor(&self, distance: f64) -> [f64; 2] {
        [distance * self.mid().cos(), distance * self.mid().sin()]
    }
}

/// Split a full turn between `values`, starting at 90° and going
/// counter-clockwise. Empty when the values do not sum to a positive total.
pub fn pie_slices(values: &BTreeMap<String, f64>) -> Vec<PieSlice> {
    let total: f64 = values.values().sum();
    if total <= 0.0 || !total.is_finite() {
        return Vec::new();
    }
    let mut start = FRAC_PI_2;
    values
        .iter()
        .map(|(label, value)| {
            let share = value / total;
            let end = start + share * TAU;
            let slice = PieSlice {
                label: label.clone(),
                share,
                start,
                end,
            };
            start = end;
            slice
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Y axis labels in millions, e.g. `1.2M`.
pub fn format_millions(x: f64) -> String {
    format!("{:.1}M", x / 1e6)
}

fn count(value: f64) -> String {
    format!("{value:.0}")
}

fn millions_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    format_millions(mark.value)
}

fn year_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    match whole(mark.value) {
        Some(year) => year.to_string(),
        None => String::new(),
    }
}

/// `value` as an integer if it is one, up to grid rounding noise.
fn whole(value: f64) -> Option<i64> {
    let rounded = value.round();
    ((value - rounded).abs() < 1e-6).then_some(rounded as i64)
}

/// Label of the bar at position `value`; bars are placed at 0, 1, 2, …
fn category_label(labels: &[String], value: f64) -> String {
    whole(value)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| labels.get(i))
        .cloned()
        .unwrap_or_default()
}

fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| category_label(&labels, mark.value)
}

fn year_bounds(years: &[i32]) -> (i32, i32) {
    (
        years.first().copied().unwrap_or_default(),
        years.last().copied().unwrap_or_default(),
    )
}

/// Year combo box. Returns the new year when the user picked another one.
fn year_selector(ui: &mut Ui, id: &str, years: &[i32], current: i32) -> Option<i32> {
    let mut selected = current;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Sélectionner une année :");
        egui::ComboBox::from_id_salt(id)
            .selected_text(current.to_string())
            .show_ui(ui, |ui: &mut Ui| {
                for &year in years {
                    ui.selectable_value(&mut selected, year, year.to_string());
                }
            });
    });
    (selected != current).then_some(selected)
}

/// A plot without panning or zooming, sized for the scrolling dashboard.
fn static_plot<'a>(id: &str) -> Plot<'a> {
    Plot::new(id)
        .height(CHART_HEIGHT)
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
}
