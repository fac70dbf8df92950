//! Configuration file parsing.
//!
//! # File Format
//!
//! ```toml
//! threads = 8
//!
//! [mesh]
//! ndim = 3
//! nmesh = 64
//! box_size = 1.0
//!
//! [hessian]
//! normalization = 1.0
//! potential_mode = true
//!
//! [eigensolver]
//! compute_eigenvectors = false
//! tol = 1e-12
//! max_iter = 500
//!
//! [classification]
//! threshold = 0.0
//! ```
//!
//! Only `[mesh]` is required. Omitting `[classification]` skips the
//! cosmic-web labelling step.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classification::ClassificationOptions;
use crate::eigensystem::EigenOptions;
use crate::error::{Result, TidalError};
use crate::grid::{Grid, SUPPORTED_DIMS};
use crate::hessian::HessianOptions;

/// Cubic periodic mesh description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeshConfig {
    pub ndim: usize,
    pub nmesh: usize,
    #[serde(default = "default_box_size")]
    pub box_size: f64,
}

fn default_box_size() -> f64 {
    1.0
}

impl MeshConfig {
    /// Build the mesh for a statically known dimension.
    pub fn grid<const N: usize>(&self) -> Result<Grid<N>> {
        if self.ndim != N {
            return Err(TidalError::Config(format!(
                "mesh.ndim = {} but a {N}D mesh was requested",
                self.ndim
            )));
        }
        let grid = Grid::cubic(self.nmesh, self.box_size);
        grid.validate()?;
        Ok(grid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidalConfig {
    /// Worker threads for per-cell work; `None` uses the global rayon pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    pub mesh: MeshConfig,
    #[serde(default)]
    pub hessian: HessianOptions,
    #[serde(default)]
    pub eigensolver: EigenOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationOptions>,
}

impl TidalConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: TidalConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_DIMS.contains(&self.mesh.ndim) {
            return Err(TidalError::Config(format!(
                "mesh.ndim must be 2 or 3, got {}",
                self.mesh.ndim
            )));
        }
        if self.mesh.nmesh == 0 {
            return Err(TidalError::Config("mesh.nmesh must be positive".into()));
        }
        if !(self.mesh.box_size.is_finite() && self.mesh.box_size > 0.0) {
            return Err(TidalError::Config(format!(
                "mesh.box_size must be positive, got {}",
                self.mesh.box_size
            )));
        }
        if !self.hessian.normalization.is_finite() {
            return Err(TidalError::Config(format!(
                "hessian.normalization must be finite, got {}",
                self.hessian.normalization
            )));
        }
        self.eigensolver.validate()?;
        if let Some(classification) = &self.classification {
            if !classification.threshold.is_finite() {
                return Err(TidalError::Config(format!(
                    "classification.threshold must be finite, got {}",
                    classification.threshold
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(TidalError::Config("threads must be at least 1".into()));
        }
        Ok(())
    }
}
