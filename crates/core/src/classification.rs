//! Cosmic-web classification from tidal tensor eigenvalues.
//!
//! A cell is labelled by how many eigenvalues exceed a threshold: none is a
//! void, all of them a knot, all but one a filament, anything else a sheet.
//! On a 2D mesh this gives void / filament / knot.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::eigensystem::EigenvalueField;
use crate::error::{Result, TidalError};
use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebType {
    Void,
    Sheet,
    Filament,
    Knot,
}

impl WebType {
    pub const ALL: [WebType; 4] = [
        WebType::Void,
        WebType::Sheet,
        WebType::Filament,
        WebType::Knot,
    ];

    /// Structure type of a cell with `count` of `ndim` eigenvalues above
    /// threshold.
    pub fn from_count(count: usize, ndim: usize) -> Self {
        if count == 0 {
            WebType::Void
        } else if count >= ndim {
            WebType::Knot
        } else if count + 1 == ndim {
            WebType::Filament
        } else {
            WebType::Sheet
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WebType::Void => "void",
            WebType::Sheet => "sheet",
            WebType::Filament => "filament",
            WebType::Knot => "knot",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassificationOptions {
    #[serde(default)]
    pub threshold: f64,
}

impl Default for ClassificationOptions {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

/// Volume fraction of each structure type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WebFractions {
    pub void: f64,
    pub sheet: f64,
    pub filament: f64,
    pub knot: f64,
}

#[derive(Debug, Clone)]
pub struct WebClassification<const N: usize> {
    grid: Grid<N>,
    threshold: f64,
    labels: Vec<WebType>,
}

impl<const N: usize> WebClassification<N> {
    pub fn grid(&self) -> Grid<N> {
        self.grid
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn labels(&self) -> &[WebType] {
        &self.labels
    }

    pub fn label(&self, cell: usize) -> WebType {
        self.labels[cell]
    }

    pub fn count(&self, kind: WebType) -> usize {
        self.labels.iter().filter(|&&label| label == kind).count()
    }

    /// Fractions of the locally owned cells.
    pub fn fractions(&self) -> WebFractions {
        let total = self.labels.len().max(1) as f64;
        WebFractions {
            void: self.count(WebType::Void) as f64 / total,
            sheet: self.count(WebType::Sheet) as f64 / total,
            filament: self.count(WebType::Filament) as f64 / total,
            knot: self.count(WebType::Knot) as f64 / total,
        }
    }
}

/// Label every cell by the number of eigenvalues strictly above `threshold`.
pub fn classify<const N: usize>(
    eigenvalues: &EigenvalueField<N>,
    threshold: f64,
) -> Result<WebClassification<N>> {
    if !threshold.is_finite() {
        warn!("[classify] rejecting non-finite threshold {threshold}");
        return Err(TidalError::InvalidParameter(format!(
            "classification threshold must be finite, got {threshold}"
        )));
    }
    let grid = eigenvalues.grid();
    let labels: Vec<WebType> = (0..grid.len())
        .into_par_iter()
        .map(|cell| {
            let above = eigenvalues
                .at(cell)
                .iter()
                .filter(|&&lambda| lambda > threshold)
                .count();
            WebType::from_count(above, N)
        })
        .collect();

    let classification = WebClassification {
        grid,
        threshold,
        labels,
    };
    let fractions = classification.fractions();
    info!(
        "[classify] threshold {threshold}: void {:.3}, sheet {:.3}, filament {:.3}, knot {:.3}",
        fractions.void, fractions.sheet, fractions.filament, fractions.knot
    );
    Ok(classification)
}
