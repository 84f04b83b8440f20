use eframe::egui;
use effectifs_dashboard::DashboardConfig;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    /// Create the app and load the configured dataset if it is there.
    pub fn new(config: DashboardConfig) -> Self {
        let data_path = config.data_path.clone();
        let mut state = AppState::new(config);
        if data_path.exists() {
            state.load_path(&data_path);
        } else {
            log::info!("{} not found, waiting for File → Open", data_path.display());
        }
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: dataset facts ----
        egui::SidePanel::left("dataset_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &self.state);
            });

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dashboard(ui, &mut self.state);
        });
    }
}
