use anyhow::Result;
use eframe::egui;

mod app;
mod canvas;
mod composite;
mod config;
mod export;
mod segment;
mod session;
mod store;

use app::AnnotatorApp;
use config::AppConfig;
use segment::SamSegmenter;
use session::Session;

const TITLE: &str = "sam-annotate";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    // A missing or broken model is fatal: there is nothing to annotate with.
    let segmenter = SamSegmenter::load(&config.encoder_path, &config.decoder_path)
        .inspect_err(|e| log::error!("cannot load segmentation model: {e:#}"))?;
    let session = Session::new(&config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title(TITLE),
        ..Default::default()
    };

    eframe::run_native(
        TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(AnnotatorApp::new(session, Box::new(segmenter))))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run eframe: {e}"))
}
