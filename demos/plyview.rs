//! Windowed viewer
//!
//! Loads `assets/settings.json`, then opens a window showing the mesh it
//! names. Build with `--features gpu`.
//!
//! Keys: R rotation, A axes, S camera snapshot, 0-9 level of detail,
//! arrows move and turn the pivot. Drag to orbit, right-drag to pan,
//! scroll to zoom.

use anyhow::Context;
use plyview_visualization::{gpu, Settings, Viewer};

const SETTINGS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/settings.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load_async(SETTINGS_PATH)
        .await
        .context("viewer cannot start without its settings")?;

    let mut viewer = Viewer::new(settings);
    if !viewer.load().await {
        log::warn!("Starting with an empty scene");
    }

    gpu::run(viewer, "plyview")?;
    Ok(())
}
