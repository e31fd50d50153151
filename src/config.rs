use std::path::Path;

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Joints to rotate while the viewer runs.
    #[serde(default = "default_spin")]
    pub spin: Vec<SpinConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// Background color, rgb in 0..1.
    #[serde(default = "default_background")]
    pub background: [f32; 3],
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Model file, relative to the data directory.
    #[serde(default = "default_model_file")]
    pub file: String,
    /// Nodes with this name prefix are treated as skeleton joints.
    #[serde(default = "default_joint_prefix")]
    pub joint_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// In-flight frame budget; frames beyond it are dropped at the source.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpinConfig {
    pub joint: String,
    #[serde(default = "default_spin_axis")]
    pub axis: [f32; 3],
    #[serde(default = "default_spin_velocity")]
    pub degrees_per_second: f32,
}

fn default_width() -> usize {
    960
}
fn default_height() -> usize {
    720
}
fn default_target_fps() -> u32 {
    60
}
fn default_background() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}
fn default_model_file() -> String {
    "models/tpose.glb".to_string()
}
fn default_joint_prefix() -> String {
    "mixamorig:".to_string()
}
fn default_camera_fps() -> u32 {
    30
}
fn default_camera_width() -> u32 {
    320
}
fn default_camera_height() -> u32 {
    240
}
fn default_pool_capacity() -> usize {
    4
}
fn default_queue_depth() -> usize {
    2
}
fn default_spin_axis() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}
fn default_spin_velocity() -> f32 {
    45.0
}
fn default_spin() -> Vec<SpinConfig> {
    vec![SpinConfig {
        joint: "mixamorig:RightArm".to_string(),
        axis: default_spin_axis(),
        degrees_per_second: default_spin_velocity(),
    }]
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            target_fps: default_target_fps(),
            background: default_background(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file: default_model_file(),
            joint_prefix: default_joint_prefix(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fps: default_camera_fps(),
            width: default_camera_width(),
            height: default_camera_height(),
            pool_capacity: default_pool_capacity(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "Could not load config from {:?} ({err}), using defaults",
                    path.as_ref()
                );
                Self::spin_defaulted(Self::default())
            }
        }
    }

    fn spin_defaulted(mut config: Self) -> Self {
        if config.spin.is_empty() {
            config.spin = default_spin();
        }
        config
    }
}
