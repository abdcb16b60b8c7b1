//! Persistent editor settings.

use crate::render::{CameraSettings, GizmoConfig, PickFilter};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub camera: CameraSettings,
    pub gizmo: GizmoConfig,
    /// Point-helper handle length as a fraction of the camera distance.
    pub point_helper_size: f32,
    pub pick: PickFilter,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            gizmo: GizmoConfig::default(),
            point_helper_size: 0.08,
            pick: PickFilter::default(),
        }
    }
}

impl EditorSettings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::VisibilityFilter;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!(
            "sceneedit_settings_{tag}_{}_{nonce}.json",
            std::process::id()
        ))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = EditorSettings::load(&temp_path("missing")).unwrap();
        assert_eq!(settings, EditorSettings::default());
        assert_eq!(settings.camera.default_move_speed, 1.125);
        assert_eq!(settings.camera.move_speed_step, 0.0625);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: EditorSettings = serde_json::from_str(
            r#"{ "gizmo": { "rotate_speed": 32.0 }, "pick": { "visibility": "All" } }"#,
        )
        .unwrap();
        assert_eq!(settings.gizmo.rotate_speed, 32.0);
        assert_eq!(settings.gizmo.scale_speed, GizmoConfig::default().scale_speed);
        assert_eq!(settings.pick.visibility, VisibilityFilter::All);
        assert!(settings.pick.geometry);
    }

    #[test]
    fn save_then_load_via_file() {
        let path = temp_path("roundtrip");
        let mut settings = EditorSettings::default();
        settings.pick.death_zones = true;
        settings.point_helper_size = 0.2;
        settings.save(&path).unwrap();
        let loaded = EditorSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let path = temp_path("broken");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(EditorSettings::load(&path), Err(ConfigError::Json(_))));
        let _ = std::fs::remove_file(path);
    }
}
