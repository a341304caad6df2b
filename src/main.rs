#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use tts_studio::{gui, StudioConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = StudioConfig::default();
    log::info!("Starting with model directory {}", config.model_dir.display());

    gui::run(config)?;
    Ok(())
}
