use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::BoxscanError;

/// Viewer settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Zoom a freshly opened document starts at.
    pub initial_zoom: f64,
    /// Zoom floor; zooming out never goes below it.
    pub min_zoom: f64,
    /// Factor applied per zoom-in / zoom-out step.
    pub zoom_step: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            initial_zoom: 1.0,
            min_zoom: 1.0,
            zoom_step: 1.1,
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), BoxscanError> {
        for zoom in [self.initial_zoom, self.min_zoom] {
            if !(zoom.is_finite() && zoom > 0.0) {
                return Err(BoxscanError::InvalidZoom(zoom));
            }
        }
        if self.initial_zoom < self.min_zoom {
            return Err(BoxscanError::InvalidZoom(self.initial_zoom));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(BoxscanError::InvalidZoom(self.zoom_step));
        }
        Ok(())
    }
}

/// Load a viewer config from a JSON file.
pub fn load_config(path: &Path) -> Result<ViewerConfig, BoxscanError> {
    let config_err = |reason: String| BoxscanError::Config {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
    let config: ViewerConfig =
        serde_json::from_str(&content).map_err(|e| config_err(e.to_string()))?;
    config.validate().map_err(|e| config_err(e.to_string()))?;
    Ok(config)
}
