//! I/O operations for meshes and point clouds
//! 
//! This crate reads the PLY files shown by the viewer (ASCII and binary,
//! with optional normals, colors and polygon faces), writes them back out,
//! and provides the single-shot async loader used at startup.

pub mod ply;
pub mod loader;
pub mod error;

pub use error::*;
pub use loader::load_mesh;
pub use ply::{PlyFormat, PlyReader, PlyWriter};

use plyview_core::{Result, TriangleMesh};

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<std::path::Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<std::path::Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<std::path::Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ply") => ply::PlyReader::read_mesh(path),
        _ => Err(plyview_core::Error::UnsupportedFormat(
            format!("Unsupported mesh format: {:?}", path.extension())
        )),
    }
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<std::path::Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ply") => ply::PlyWriter::write_mesh(mesh, path),
        _ => Err(plyview_core::Error::UnsupportedFormat(
            format!("Unsupported mesh format: {:?}", path.extension())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plyview_core::{Point3f, Vector3f};
    use std::fs;

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("plyview_io_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_ply_mesh_roundtrip() {
        let path = temp_file("mesh.ply");

        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.set_normals(vec![Vector3f::z(); 3]);
        mesh.set_colors(vec![[10, 20, 30], [40, 50, 60], [70, 80, 90]]);

        write_mesh(&mesh, &path).unwrap();
        let loaded = read_mesh(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.vertex_count(), 3);
        assert_eq!(loaded.faces, mesh.faces);
        assert_eq!(loaded.normals, mesh.normals);
        assert_eq!(loaded.colors, mesh.colors);
    }

    #[test]
    fn test_unsupported_format() {
        let result = read_mesh("model.stl");
        assert!(matches!(result, Err(plyview_core::Error::UnsupportedFormat(_))));

        let mesh = TriangleMesh::new();
        assert!(write_mesh(&mesh, "model.obj").is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_mesh(temp_file("does_not_exist.ply"));
        assert!(matches!(result, Err(plyview_core::Error::Io(_))));
    }

    #[test]
    fn test_writer_rejects_invalid_mesh() {
        let mesh = TriangleMesh::from_vertices_and_faces(vec![Point3f::origin()], vec![[0, 1, 2]]);
        let mut buffer = Vec::new();
        assert!(PlyWriter::write_mesh_to(&mesh, &mut buffer, PlyFormat::Ascii).is_err());
    }
}
