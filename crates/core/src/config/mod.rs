use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Color, Depth, Result, ScaleMethod, VideoError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(?path, "loading configuration");
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.display.validate()
    }
}

/// Geometry and format of the presented frame buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub depth: Depth,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            depth: Depth::Rgba32,
        }
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::msg(format!(
                "display dimension {}x{} is empty",
                self.width, self.height
            )));
        }
        if !self.depth.is_raster() {
            return Err(VideoError::InvalidDepth);
        }
        Ok(())
    }
}

/// Parameters of the render pipeline run by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub scale_method: ScaleMethod,
    /// Density of the translucent overlay, 0 transparent to 255 opaque.
    pub surface_alpha: u8,
    pub background: Color,
    /// Color treated as transparent in the keyed overlay.
    pub colorkey: Color,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale_method: ScaleMethod::Bilinear,
            surface_alpha: 128,
            background: Color::rgb(0, 0, 64),
            colorkey: Color::rgb(255, 0, 255),
        }
    }
}
