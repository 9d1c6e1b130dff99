//! End-to-end tests driving the viewer through a headless surface

use approx::assert_relative_eq;
use plyview_core::{Point3f, TriangleMesh};
use plyview_io::{write_mesh, PlyFormat, PlyWriter};
use plyview_visualization::{
    ControllerEvent, HeadlessSurface, PointerButton, PointerInput, RenderSurface, Settings,
    Viewer, ViewerKey,
};
use std::path::{Path, PathBuf};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("plyview_viewer_{}", name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A unit cube centred at (5, 5, 5) with colours
fn offset_cube() -> TriangleMesh {
    let mut vertices = Vec::new();
    for &z in &[4.5, 5.5] {
        for &(x, y) in &[(4.5, 4.5), (5.5, 4.5), (5.5, 5.5), (4.5, 5.5)] {
            vertices.push(Point3f::new(x, y, z));
        }
    }
    let faces = vec![
        [0, 2, 1], [0, 3, 2],
        [4, 5, 6], [4, 6, 7],
        [0, 1, 5], [0, 5, 4],
        [3, 7, 6], [3, 6, 2],
        [0, 4, 7], [0, 7, 3],
        [1, 2, 6], [1, 6, 5],
    ];
    let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
    mesh.set_colors((0..8).map(|i| [i * 30, 255 - i * 30, 128]).collect());
    mesh
}

fn settings_for(dir: &Path, mesh_file: &str) -> Settings {
    let json = format!(
        r#"{{
            "camera":   {{ "fov": 75, "position": {{"x": 0, "y": 0, "z": 5}}, "rotation": {{"x": 0, "y": 0, "z": 0}} }},
            "rotation": {{ "axisOffset": {{"x": 0, "y": 0, "z": 0}}, "yRotation": 0, "speed": 0.01 }},
            "mesh":     {{ "filePath": "{}", "scaleFactor": 2.0, "initialRotation": {{"x": 0, "y": 0, "z": 0}} }}
        }}"#,
        mesh_file
    );
    let path = dir.join("settings.json");
    std::fs::write(&path, json).unwrap();
    Settings::load(&path).unwrap()
}

#[tokio::test]
async fn test_load_normalize_and_render() {
    let dir = scratch_dir("render");
    write_mesh(&offset_cube(), dir.join("cube.ply")).unwrap();

    let mut viewer = Viewer::new(settings_for(&dir, "cube.ply"));
    assert!(viewer.load().await);

    let mesh = viewer.state().scene().live_mesh().unwrap();
    assert_eq!(mesh.vertex_count(), 8);
    assert!(mesh.colors.is_some());
    assert!(mesh.normals.is_some());
    let bounds = mesh.bounds().unwrap();
    assert_relative_eq!(bounds.max_extent(), 2.0, epsilon = 1e-5);
    assert_relative_eq!(bounds.center(), Point3f::origin(), epsilon = 1e-5);

    let mut surface = HeadlessSurface::new(800, 600);
    for _ in 0..3 {
        viewer.tick(1.0 / 60.0, &mut surface).unwrap();
    }
    assert_eq!(surface.draw_count(), 3);
    assert_eq!(surface.last_frame().unwrap().face_count, 12);
    assert_relative_eq!(viewer.state().scene().pivot_state().yaw, 0.03, epsilon = 1e-6);
}

#[tokio::test]
async fn test_binary_point_cloud_loads() {
    let dir = scratch_dir("cloud");
    let cloud = TriangleMesh::from_points(vec![
        Point3f::new(-3.0, 0.0, 0.0),
        Point3f::new(3.0, 1.0, 0.0),
        Point3f::new(0.0, -1.0, 2.0),
    ]);
    PlyWriter::write_mesh_with_format(&cloud, dir.join("cloud.ply"), PlyFormat::BinaryLittleEndian)
        .unwrap();

    let mut viewer = Viewer::new(settings_for(&dir, "cloud.ply"));
    assert!(viewer.load().await);
    let mesh = viewer.state().scene().live_mesh().unwrap();
    assert!(!mesh.has_faces());
    assert_relative_eq!(mesh.bounds().unwrap().max_extent(), 2.0, epsilon = 1e-5);
}

#[tokio::test]
async fn test_missing_mesh_leaves_functional_empty_scene() {
    let dir = scratch_dir("missing");
    let mut viewer = Viewer::new(settings_for(&dir, "nothing-here.ply"));
    assert!(!viewer.load().await);

    let mut surface = HeadlessSurface::new(640, 480);
    viewer.tick(0.016, &mut surface).unwrap();
    assert_eq!(surface.last_frame().unwrap().vertex_count, 0);

    // Lights, camera and input still work
    assert_eq!(viewer.state().scene().lights().len(), 2);
    viewer.handle_key(ViewerKey::Char('a'));
    viewer.tick(0.016, &mut surface).unwrap();
    assert!(!surface.last_frame().unwrap().axes_visible);
}

#[tokio::test]
async fn test_interaction_session() {
    let dir = scratch_dir("session");
    write_mesh(&offset_cube(), dir.join("cube.ply")).unwrap();
    let mut viewer = Viewer::new(settings_for(&dir, "cube.ply"));
    assert!(viewer.load().await);
    let mut surface = HeadlessSurface::new(800, 600);

    // Pause rotation: yaw stays put across frames
    viewer.handle_key(ViewerKey::Char('R'));
    viewer.tick(0.016, &mut surface).unwrap();
    let yaw = viewer.state().scene().pivot_state().yaw;
    viewer.tick(0.016, &mut surface).unwrap();
    assert_eq!(viewer.state().scene().pivot_state().yaw, yaw);

    // LOD 5 then back to full detail
    viewer.handle_key(ViewerKey::Char('5'));
    viewer.tick(0.016, &mut surface).unwrap();
    assert!(surface.last_frame().unwrap().vertex_count <= 4);
    viewer.handle_key(ViewerKey::Char('0'));
    viewer.tick(0.016, &mut surface).unwrap();
    assert_eq!(surface.last_frame().unwrap().vertex_count, 8);

    // Nudge the pivot and check the model matrix follows
    viewer.handle_key(ViewerKey::ArrowRight);
    viewer.tick(0.016, &mut surface).unwrap();
    let model = surface.last_frame().unwrap().model;
    assert_relative_eq!(model[(0, 3)], 0.1, epsilon = 1e-6);

    // Orbit drag moves the camera over the next frames
    let before = viewer.state().camera().position;
    viewer.handle_pointer(PointerInput::Drag {
        button: PointerButton::Primary,
        dx: 50.0,
        dy: 0.0,
    });
    viewer.tick(0.016, &mut surface).unwrap();
    assert_ne!(viewer.state().camera().position, before);

    match viewer.handle_key(ViewerKey::Char('s')) {
        Some(ControllerEvent::Snapshot(snapshot)) => {
            assert_eq!(snapshot.fov, 75.0);
            assert_relative_eq!(snapshot.pivot_offset.x, 0.1, epsilon = 1e-6);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[test]
fn test_resize_ignores_zero_height() {
    let mut viewer = Viewer::new(Settings::default());
    let mut surface = HeadlessSurface::new(640, 480);

    assert!(viewer.resize(1920, 1080));
    surface.resize(1920, 1080);
    assert_relative_eq!(viewer.state().camera().aspect_ratio, 1920.0 / 1080.0);

    assert!(!viewer.resize(1920, 0));
    surface.resize(1920, 0);
    assert_relative_eq!(viewer.state().camera().aspect_ratio, 1920.0 / 1080.0);
    assert_eq!(surface.size(), (1920, 1080));
}
