//! Surface creation options handed to the rendering engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOptions {
    pub theme: Theme,
    pub width: u32,
    pub height: u32,
    /// Draw a volume histogram under the candles (price pane only).
    pub volume_histogram: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            width: 1200,
            height: 600,
            volume_histogram: true,
        }
    }
}

impl SurfaceOptions {
    /// Options for the RSI sub-panel derived from the main chart's options.
    pub fn for_oscillator(&self, height: u32) -> Self {
        Self {
            height,
            volume_histogram: false,
            ..self.clone()
        }
    }
}
