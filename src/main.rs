mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use app::DashboardApp;
use clap::Parser;
use eframe::egui;
use effectifs_dashboard::data::loader::load_csv;
use effectifs_dashboard::report::Report;
use effectifs_dashboard::DashboardConfig;

/// Patient counts by pathology, age, sex and region.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Semicolon-separated extract to load (overrides the configuration).
    #[arg(long)]
    data: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the JSON summary for this year instead of opening the window.
    #[arg(long, value_name = "YEAR")]
    report: Option<i32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(data) = cli.data {
        config.data_path = data;
    }

    match cli.report {
        Some(year) => print_report(&config, year),
        None => run_gui(config),
    }
}

fn print_report(config: &DashboardConfig, year: i32) -> Result<()> {
    let table = load_csv(&config.data_path, &config.load_options())?;
    if !table.years.contains(&year) {
        log::warn!("{year} is not in the dataset, the year-specific summaries are empty");
    }
    let report = Report::build(&table, config, year);
    println!("{}", report.to_json().context("serialising report")?);
    Ok(())
}

fn run_gui(config: DashboardConfig) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 900.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Effectifs – Pathologies",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(config)))),
    )
    .map_err(|e| anyhow!("{e}"))
}
