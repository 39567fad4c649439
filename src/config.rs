//! Session configuration.
//!
//! The preview pixel format decides the size of every frame buffer, so it
//! is fixed per session rather than negotiated per command.

use crate::buffers::PixelFormat;
use crate::device::{Facing, MockCameraSpec};
use crate::geometry::Rotation;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a camera session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pixel format requested for preview frames.
    pub preview_format: PixelFormat,
    /// Facing opened by default when both are available.
    pub default_facing: Facing,
    /// Emit a notification for every delivered preview frame.
    pub emit_frame_events: bool,
    /// Display rotation in degrees at startup (0, 90, 180 or 270).
    pub display_rotation: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preview_format: PixelFormat::Nv21,
            default_facing: Facing::Front,
            emit_frame_events: false,
            display_rotation: 0,
        }
    }
}

impl SessionConfig {
    /// Initial display rotation.
    pub fn rotation(&self) -> Rotation {
        Rotation::from_degrees(i32::from(self.display_rotation))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display_rotation % 90 != 0 || self.display_rotation >= 360 {
            return Err(ConfigError::InvalidRotation(self.display_rotation));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid display rotation {0} (must be 0, 90, 180 or 270)")]
    InvalidRotation(u16),
    #[error("simulated camera {index} advertises no preview sizes")]
    NoPreviewSizes { index: usize },
    #[error("simulated camera {index} has bad sensor orientation {orientation}")]
    InvalidSensorOrientation { index: usize, orientation: u16 },
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Simulated platform used when no real camera backend is linked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub cameras: Vec<MockCameraSpec>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            cameras: vec![
                MockCameraSpec::new(Facing::Back, 90),
                MockCameraSpec::new(Facing::Front, 270),
            ],
        }
    }
}

impl MockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, camera) in self.cameras.iter().enumerate() {
            if camera.preview_sizes.is_empty() {
                return Err(ConfigError::NoPreviewSizes { index });
            }
            if camera.sensor_orientation >= 360 {
                return Err(ConfigError::InvalidSensorOrientation {
                    index,
                    orientation: camera.sensor_orientation,
                });
            }
        }
        Ok(())
    }
}

/// Output configuration for the demonstration binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Preview frames to pump while previewing.
    pub frame_count: u32,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_count: 30,
            metrics_port: 9090,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub mock: MockConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session.validate()?;
        config.mock.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert!(MockConfig::default().validate().is_ok());
    }

    #[test]
    fn test_odd_rotation_invalid() {
        let config = SessionConfig {
            display_rotation: 45,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRotation(45))));
    }

    #[test]
    fn test_parse_file_config() {
        let text = r#"
            [session]
            preview_format = "yv12"
            display_rotation = 90

            [[mock.cameras]]
            facing = "back"
            sensor_orientation = 90
            preview_sizes = [[1920, 1080], [1280, 720]]

            [output]
            frame_count = 5
            metrics_port = 0
        "#;

        let config = FileConfig::from_toml(text).unwrap();
        assert_eq!(config.session.preview_format, PixelFormat::Yv12);
        assert_eq!(config.session.rotation(), Rotation::Deg90);
        assert_eq!(config.mock.cameras.len(), 1);
        assert_eq!(config.mock.cameras[0].preview_sizes.len(), 2);
        assert_eq!(config.output.frame_count, 5);
    }

    #[test]
    fn test_camera_without_preview_sizes_rejected() {
        let text = r#"
            [[mock.cameras]]
            facing = "front"
            sensor_orientation = 270
            preview_sizes = []
        "#;
        assert!(matches!(
            FileConfig::from_toml(text),
            Err(ConfigError::NoPreviewSizes { index: 0 })
        ));
    }
}
