//! The settings document
//!
//! A small camelCase JSON file read once at startup. Every field is
//! optional; missing fields take the reference defaults.

use crate::error::SettingsError;
use plyview_core::Vector3f;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A vector written as `{"x": .., "y": .., "z": ..}`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3Setting {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3Setting {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3Setting> for Vector3f {
    fn from(v: Vec3Setting) -> Self {
        Vector3f::new(v.x, v.y, v.z)
    }
}

impl From<Vector3f> for Vec3Setting {
    fn from(v: Vector3f) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Initial camera placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub position: Vec3Setting,
    /// Euler angles in radians, XYZ order
    pub rotation: Vec3Setting,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 75.0,
            position: Vec3Setting::new(0.0, 0.0, 5.0),
            rotation: Vec3Setting::default(),
        }
    }
}

/// Pivot placement and auto-rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotationSettings {
    pub axis_offset: Vec3Setting,
    /// Initial pivot yaw in degrees
    pub y_rotation: f32,
    /// Yaw added per frame while rotating, in radians
    pub speed: f32,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            axis_offset: Vec3Setting::default(),
            y_rotation: 0.0,
            speed: 0.01,
        }
    }
}

/// The asset to show and how to place it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshSettings {
    pub file_path: PathBuf,
    /// Length of the longest bounding box side after normalization
    pub scale_factor: f32,
    /// Euler angles in radians, XYZ order
    pub initial_rotation: Vec3Setting,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("assets/model.ply"),
            scale_factor: 2.0,
            initial_rotation: Vec3Setting::default(),
        }
    }
}

/// The whole settings document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    pub rotation: RotationSettings,
    pub mesh: MeshSettings,
    /// Directory relative mesh paths resolve against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Settings {
    /// Parse a settings document held in memory
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(json).map_err(|source| SettingsError::Parse {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// Read and parse a settings file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_file(path, &text)
    }

    /// Read and parse a settings file on the tokio runtime
    pub async fn load_async<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse_file(path, &text)
    }

    fn parse_file(path: &Path, text: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings =
            serde_json::from_str(text).map_err(|source| SettingsError::Parse {
                origin: path.display().to_string(),
                source,
            })?;
        settings.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolve relative mesh paths against the given directory
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// The mesh path, resolved against the settings file's directory
    pub fn mesh_path(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) if self.mesh.file_path.is_relative() => dir.join(&self.mesh.file_path),
            _ => self.mesh.file_path.clone(),
        }
    }

    /// Initial pivot yaw in radians
    pub fn initial_yaw(&self) -> f32 {
        self.rotation.y_rotation.to_radians()
    }
}
