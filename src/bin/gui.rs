use std::str::FromStr;

use eframe::egui;
use log::{error, info, LevelFilter};
use spring_network_editor::{load_config, EditorConfig, GraphEditorApp};

fn main() -> eframe::Result<()> {
    let config = load_config(None::<&str>).unwrap_or_else(|e| {
        eprintln!("{e}. Using default configuration.");
        EditorConfig::default()
    });

    let log_level = LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::Warn);
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    info!(session_path:? = config.session_path; "Starting spring network editor");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Spring Network Editor"),
        ..Default::default()
    };

    eframe::run_native(
        "Spring Network Editor",
        options,
        Box::new(|_cc| Ok(Box::new(GraphEditorApp::new(config)))),
    )
    .inspect_err(|e| error!("{e}"))
}
