use eframe::egui::{self, Color32, RichText, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – dataset facts
// ---------------------------------------------------------------------------

/// Render the left information panel.
pub fn side_panel(ui: &mut Ui, state: &AppState) {
    ui.heading("Dataset");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No dataset loaded.");
        return;
    };

    ui.label(
        RichText::new(state.config.data_path.display().to_string())
            .small()
            .weak(),
    );
    let stats = table.stats;
    egui::Grid::new("load_stats")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.label("Rows kept");
            ui.label(stats.kept.to_string());
            ui.end_row();
            ui.label("Rows read");
            ui.label(stats.rows_read.to_string());
            ui.end_row();
            ui.label("Malformed");
            ui.label(stats.malformed.to_string());
            ui.end_row();
            ui.label("Outside year range");
            ui.label(stats.out_of_range.to_string());
            ui.end_row();
        });
    ui.add_space(6.0);

    ui.strong("Years");
    match (table.years.first(), table.years.last()) {
        (Some(first), Some(last)) => ui.label(format!("{first} – {last}")),
        _ => ui.label("none"),
    };
    ui.add_space(6.0);

    ui.strong("Focus pathology");
    ui.label(&state.config.focus_pathology);
    if !table.pathologies.contains(&state.config.focus_pathology) {
        ui.label(RichText::new("not present in the dataset").color(Color32::YELLOW));
    }
    ui.add_space(6.0);

    ui.strong("Compared groups");
    for group in &state.config.groups {
        let color = state.group_colors.color_for(&group.label);
        egui::CollapsingHeader::new(RichText::new(&group.label).color(color))
            .id_salt(&group.label)
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                for pathology in &group.pathologies {
                    ui.label(pathology);
                }
            });
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.table.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export summary…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows, {} years",
                table.len(),
                state.years.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open patient counts")
        .add_filter("Delimited text", &["csv", "txt"])
        .add_filter("All files", &["*"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export summary")
        .set_file_name(format!("summary_{}.json", state.selection.totals))
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        match state.export_report(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to export summary: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
