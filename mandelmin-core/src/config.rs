//! Render parameter configuration.
//!
//! `RenderParameters` is the single immutable input of a render. The default
//! value is the canonical view of the Mandelbrot set this tool renders; a JSON
//! file may override any subset of the fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Parameters of one render.
///
/// The field order mirrors the kernel's argument order (center, magnification,
/// iteration budget, then the grid extent).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParameters {
    /// Center of the view in the complex plane as (re, im).
    pub center: (f64, f64),
    /// Width of the view in complex-plane units.
    pub magnification: f64,
    /// Output grid width in pixels.
    pub width: u32,
    /// Output grid height in pixels.
    pub height: u32,
    /// Iteration budget per pixel.
    pub iterations: u32,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            center: (-0.5, 0.0),
            magnification: 4.5,
            width: 1200,
            height: 640,
            iterations: 50,
        }
    }
}

impl RenderParameters {
    /// Number of pixels in the output grid.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check every field against what the kernel can accept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::invalid(
                "extent",
                format!("{}x{} grid has no pixels", self.width, self.height),
            ));
        }
        // Extents are passed to the kernel as signed 32-bit integers.
        if i32::try_from(self.width).is_err() || i32::try_from(self.height).is_err() {
            return Err(ConfigError::invalid(
                "extent",
                format!("{}x{} exceeds i32::MAX", self.width, self.height),
            ));
        }
        if self.iterations == 0 {
            return Err(ConfigError::invalid("iterations", "must be at least 1"));
        }
        if !self.magnification.is_finite() || self.magnification <= 0.0 {
            return Err(ConfigError::invalid(
                "magnification",
                format!("{} is not a finite positive number", self.magnification),
            ));
        }
        if !self.center.0.is_finite() || !self.center.1.is_finite() {
            return Err(ConfigError::invalid(
                "center",
                format!("({}, {}) is not finite", self.center.0, self.center.1),
            ));
        }
        Ok(())
    }

    /// Parse parameters from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded render parameters from {}", path.display());
        Self::from_json_str(&text)
    }
}
