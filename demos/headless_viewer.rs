//! Headless viewer session
//!
//! Runs the same viewer as the windowed binary against a surface that only
//! records frames, pressing a scripted sequence of keys along the way. Each
//! level of detail visited is written to the system temp directory as
//! `plyview_lod_<level>.ply`.

use anyhow::Context;
use plyview_io::{PlyFormat, PlyWriter};
use plyview_visualization::{ControllerEvent, HeadlessSurface, Settings, Viewer, ViewerKey};

const SETTINGS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/settings.json");
const FRAME_DT: f32 = 1.0 / 60.0;

/// Key pressed before the given frame
const SCRIPT: &[(u64, ViewerKey)] = &[
    (30, ViewerKey::Char('5')),
    (60, ViewerKey::ArrowRight),
    (61, ViewerKey::ArrowUp),
    (90, ViewerKey::Char('r')),
    (100, ViewerKey::Char('2')),
    (120, ViewerKey::Char('a')),
    (130, ViewerKey::Char('0')),
    (150, ViewerKey::Char('s')),
];
const FRAMES: u64 = 180;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load_async(SETTINGS_PATH)
        .await
        .context("viewer cannot start without its settings")?;

    let mut viewer = Viewer::new(settings);
    if !viewer.load().await {
        log::warn!("Running with an empty scene");
    }

    let mut surface = HeadlessSurface::new(1280, 720);
    viewer.resize(1280, 720);

    let mut script = SCRIPT.iter().peekable();
    for frame in 0..FRAMES {
        while let Some((_, key)) = script.next_if(|(at, _)| *at == frame) {
            match viewer.handle_key(*key) {
                Some(ControllerEvent::LodChanged { level, .. }) => {
                    if let Some(mesh) = viewer.state().scene().live_mesh() {
                        let path = std::env::temp_dir().join(format!("plyview_lod_{}.ply", level.level()));
                        PlyWriter::write_mesh_with_format(mesh, &path, PlyFormat::BinaryLittleEndian)
                            .with_context(|| format!("writing {}", path.display()))?;
                        log::info!("Wrote {}", path.display());
                    }
                }
                Some(event) => log::debug!("{:?}", event),
                None => {}
            }
        }
        viewer.tick(FRAME_DT, &mut surface)?;
    }

    let stats = viewer.stats();
    let last = surface.last_frame().context("no frame was drawn")?;
    log::info!(
        "Drew {} frames ({:.0} fps simulated); last frame had {} vertices, {} faces, axes {}",
        stats.frames,
        stats.average_fps(),
        last.vertex_count,
        last.face_count,
        if last.axes_visible { "on" } else { "off" }
    );
    Ok(())
}
