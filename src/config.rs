//! Configuration for surfaces, binning and export.
//!
//! Every section has defaults, so a partial (or empty) JSON document is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub surface: SurfaceConfig,
    pub binning: BinningConfig,
    pub export: ExportConfig,
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Limits of the in-memory raster surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Largest drawing width (pixels) a surface will be created for.
    pub max_width: u32,
    /// Largest drawing height (pixels) a surface will be created for.
    pub max_height: u32,
    /// Curve flattening scale; higher values produce finer polylines.
    pub approximation_scale: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_width: 8192,
            max_height: 8192,
            approximation_scale: 1.0,
        }
    }
}

/// How the bin grid is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinAllocation {
    /// Every cell of the domain is created up front.
    #[default]
    Eager,
    /// Cells are created when the first point lands in them.
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    pub bin_width: f64,
    pub bin_height: f64,
    pub allocation: BinAllocation,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            bin_width: 1.0,
            bin_height: 1.0,
            allocation: BinAllocation::Eager,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub compression: Compression,
    /// Write `manifest.json` as the last entry of a finished archive.
    pub write_manifest: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            write_manifest: true,
        }
    }
}
