//! Single-shot asynchronous mesh loading

use crate::error::LoadError;
use crate::ply::PlyReader;
use plyview_core::TriangleMesh;
use std::path::Path;

/// Load a PLY mesh without blocking the caller's executor thread.
///
/// The file is read with `tokio::fs` and parsed on the blocking pool. The
/// returned future resolves exactly once, with either the mesh or the error.
pub async fn load_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh, LoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension != "ply" {
        return Err(LoadError::UnsupportedFormat { extension });
    }

    let bytes = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound { path: display.clone() }
        } else {
            LoadError::Read { path: display.clone(), source }
        }
    })?;
    log::info!("{}: {} bytes loaded (100%), parsing", display, bytes.len());

    let mesh = tokio::task::spawn_blocking(move || PlyReader::read_mesh_from_bytes(&bytes))
        .await?
        .map_err(|e| LoadError::Parse {
            path: display.clone(),
            message: e.to_string(),
        })?;

    log::info!(
        "Loaded {} ({} vertices, {} faces)",
        display,
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}
