use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{DualTrackError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyser: AnalyserConfig,
    pub canvas: CanvasConfig,
    pub playback: PlaybackConfig,
    pub visuals: VisualConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections and fields fall back
    /// to their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the analyser or the frame loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.analyser.validate()?;

        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(DualTrackError::InvalidInput(
                "canvas dimensions must be non-zero",
            ));
        }
        if self.canvas.fps == 0 {
            return Err(DualTrackError::InvalidInput("canvas fps must be non-zero"));
        }
        Ok(())
    }
}

/// Settings for the byte-output frequency analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Transform size. The analyser exposes `fft_size / 2` bins.
    pub fft_size: usize,
    pub min_decibels: f32,
    pub max_decibels: f32,
    /// Weight of the previous magnitude when smoothing, in `[0, 1]`.
    pub smoothing_time_constant: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            min_decibels: -100.0,
            max_decibels: -30.0,
            smoothing_time_constant: 0.8,
        }
    }
}

impl AnalyserConfig {
    pub const MIN_FFT_SIZE: usize = 32;
    pub const MAX_FFT_SIZE: usize = 32_768;

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(Self::MIN_FFT_SIZE..=Self::MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(DualTrackError::InvalidInput(
                "fft size must be a power of two between 32 and 32768",
            ));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(DualTrackError::InvalidInput(
                "min decibels must be below max decibels",
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(DualTrackError::InvalidInput(
                "smoothing time constant must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Dimensions and refresh rate of the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Restart tracks from the beginning once they reach their end.
    pub loop_tracks: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { loop_tracks: true }
    }
}

/// Tunables for the visual layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Radians added to the sphere rotation on every rendered sphere frame.
    pub sphere_step: f64,
    /// Multiplier applied to `width / bins` to get a bar width.
    pub bar_width_scale: f32,
    pub bar_gap: f32,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            sphere_step: 0.005,
            bar_width_scale: 2.5,
            bar_gap: 1.0,
        }
    }
}
