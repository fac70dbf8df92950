//! Per-cell eigensystems of a packed symmetric tensor field.
//!
//! Eigenvalues are ordered in descending order. Eigenvector block `k`
//! (components `[k*N .. k*N + N)`) holds the unit eigenvector paired with
//! eigenvalue slot `k`.
//!
//! # Degenerate eigenvalues
//!
//! Pairs are sorted with a stable sort, so numerically equal eigenvalues
//! keep the order the dense decomposition returned them in. Inside a
//! degenerate eigenspace the basis is whatever the decomposition produced;
//! only the spanned subspace is meaningful. Each eigenvector is signed so
//! its largest-magnitude component is positive.

use std::cmp::Ordering;
use std::time::Instant;

use log::{debug, info};
use nalgebra::{DMatrix, Matrix2, Matrix3, SymmetricEigen};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TidalError};
use crate::field::Field;
use crate::grid::Grid;
use crate::hessian::HessianField;

/// Cells per parallel work item of the eigensolve.
pub(crate) const CELLS_PER_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EigenOptions {
    #[serde(default)]
    pub compute_eigenvectors: bool,
    /// Relative off-diagonal tolerance of the symmetric QR iteration.
    #[serde(default = "default_tol")]
    pub tol: f64,
    /// Iteration cap per cell; exceeding it is a numeric failure.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self {
            compute_eigenvectors: false,
            tol: default_tol(),
            max_iter: default_max_iter(),
        }
    }
}

fn default_tol() -> f64 {
    1e-12
}

fn default_max_iter() -> usize {
    500
}

impl EigenOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(TidalError::InvalidParameter(format!(
                "eigensolver tol must be positive, got {}",
                self.tol
            )));
        }
        if self.max_iter == 0 {
            return Err(TidalError::InvalidParameter(
                "eigensolver max_iter must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// `N` fields, slot 0 holding the largest eigenvalue at every cell.
#[derive(Debug, Clone)]
pub struct EigenvalueField<const N: usize> {
    slots: Box<[Field<N>]>,
}

impl<const N: usize> EigenvalueField<N> {
    pub fn grid(&self) -> Grid<N> {
        self.slots[0].grid()
    }

    pub fn slot(&self, k: usize) -> &Field<N> {
        &self.slots[k]
    }

    pub fn slots(&self) -> &[Field<N>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<Field<N>> {
        self.slots.into_vec()
    }

    #[inline]
    pub fn at(&self, cell: usize) -> [f64; N] {
        std::array::from_fn(|k| self.slots[k].real(cell))
    }
}

/// `N × N` fields; block `k` is the eigenvector of eigenvalue slot `k`.
#[derive(Debug, Clone)]
pub struct EigenvectorField<const N: usize> {
    components: Box<[Field<N>]>,
}

impl<const N: usize> EigenvectorField<N> {
    pub fn component(&self, slot: usize, axis: usize) -> &Field<N> {
        &self.components[slot * N + axis]
    }

    pub fn block(&self, slot: usize) -> &[Field<N>] {
        &self.components[slot * N..(slot + 1) * N]
    }

    pub fn components(&self) -> &[Field<N>] {
        &self.components
    }

    pub fn into_components(self) -> Vec<Field<N>> {
        self.components.into_vec()
    }

    #[inline]
    pub fn vector_at(&self, slot: usize, cell: usize) -> [f64; N] {
        std::array::from_fn(|axis| self.components[slot * N + axis].real(cell))
    }
}

#[derive(Debug, Clone)]
pub struct Eigensystem<const N: usize> {
    pub eigenvalues: EigenvalueField<N>,
    pub eigenvectors: Option<EigenvectorField<N>>,
}

/// Sorted eigenpairs of one cell; `vectors[k]` pairs with `values[k]`.
///
/// `vectors` is only filled when eigenvectors were requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellEigen<const N: usize> {
    pub values: [f64; N],
    pub vectors: Option<[[f64; N]; N]>,
}

/// Decompose the symmetric matrix of `cell` and sort its eigenpairs
/// descending.
///
/// 2×2 and 3×3 tensors are decomposed on the stack.
pub(crate) fn decompose_symmetric<const N: usize>(
    cell: usize,
    matrix: &[[f64; N]; N],
    options: &EigenOptions,
) -> Result<CellEigen<N>> {
    let failure = |reason: String| TidalError::NumericFailure { cell, reason };
    if matrix.iter().flatten().any(|v| !v.is_finite()) {
        return Err(failure(format!("non-finite tensor entry in {matrix:?}")));
    }

    let not_converged = || {
        failure(format!(
            "no convergence within {} iterations",
            options.max_iter
        ))
    };
    let eigen = match N {
        2 => {
            let dense = Matrix2::from_fn(|r, c| matrix[r][c]);
            let eigen = SymmetricEigen::try_new(dense, options.tol, options.max_iter)
                .ok_or_else(not_converged)?;
            sorted_pairs(
                |k| eigen.eigenvalues[k],
                |k, axis| eigen.eigenvectors[(axis, k)],
                options.compute_eigenvectors,
            )
        }
        3 => {
            let dense = Matrix3::from_fn(|r, c| matrix[r][c]);
            let eigen = SymmetricEigen::try_new(dense, options.tol, options.max_iter)
                .ok_or_else(not_converged)?;
            sorted_pairs(
                |k| eigen.eigenvalues[k],
                |k, axis| eigen.eigenvectors[(axis, k)],
                options.compute_eigenvectors,
            )
        }
        _ => {
            let dense = DMatrix::from_fn(N, N, |r, c| matrix[r][c]);
            let eigen = SymmetricEigen::try_new(dense, options.tol, options.max_iter)
                .ok_or_else(not_converged)?;
            sorted_pairs(
                |k| eigen.eigenvalues[k],
                |k, axis| eigen.eigenvectors[(axis, k)],
                options.compute_eigenvectors,
            )
        }
    };

    if eigen.values.iter().any(|v| !v.is_finite()) {
        return Err(failure(format!("non-finite eigenvalues {:?}", eigen.values)));
    }
    Ok(eigen)
}

/// Stable descending sort of the decomposition's eigenpairs. `vector(k, axis)`
/// reads component `axis` of the eigenvector paired with unsorted value `k`.
fn sorted_pairs<const N: usize>(
    value: impl Fn(usize) -> f64,
    vector: impl Fn(usize, usize) -> f64,
    with_vectors: bool,
) -> CellEigen<N> {
    let mut order: [usize; N] = std::array::from_fn(|k| k);
    order.sort_by(|&a, &b| value(b).partial_cmp(&value(a)).unwrap_or(Ordering::Equal));

    let values = order.map(&value);
    let vectors = with_vectors.then(|| {
        order.map(|k| {
            let mut v: [f64; N] = std::array::from_fn(|axis| vector(k, axis));
            canonicalize_sign(&mut v);
            v
        })
    });
    CellEigen { values, vectors }
}

/// Flip `vector` so its largest-magnitude component (first on ties) is
/// positive.
fn canonicalize_sign<const N: usize>(vector: &mut [f64; N]) {
    let mut pivot = 0;
    for (axis, value) in vector.iter().enumerate() {
        if value.abs() > vector[pivot].abs() {
            pivot = axis;
        }
    }
    if vector[pivot] < 0.0 {
        for value in vector.iter_mut() {
            *value = -*value;
        }
    }
}

/// Eigenvalues (and optionally eigenvectors) of the Hessian at every cell.
pub fn solve_eigensystem<const N: usize>(
    hessian: &HessianField<N>,
    compute_eigenvectors: bool,
) -> Result<Eigensystem<N>> {
    let options = EigenOptions {
        compute_eigenvectors,
        ..EigenOptions::default()
    };
    solve_eigensystem_with(hessian, &options)
}

pub fn solve_eigensystem_with<const N: usize>(
    hessian: &HessianField<N>,
    options: &EigenOptions,
) -> Result<Eigensystem<N>> {
    options.validate()?;
    let grid = hessian.grid();
    for component in hessian.components() {
        component.validate()?;
        if !component.grid().same_layout(&grid) {
            return Err(TidalError::InvalidGrid(
                "Hessian components do not share one mesh".into(),
            ));
        }
    }

    let start = Instant::now();
    let cells = grid.len();
    debug!(
        "[solve_eigensystem] {cells} cells, N = {N}, eigenvectors = {}",
        options.compute_eigenvectors
    );

    let mut slots: Vec<Field<N>> = (0..N).map(|_| Field::zeros(grid)).collect();
    let mut vectors: Vec<Field<N>> = if options.compute_eigenvectors {
        (0..N * N).map(|_| Field::zeros(grid)).collect()
    } else {
        Vec::new()
    };

    // Chunk `c` of every output field covers the same cells, so each worker
    // owns one disjoint cell range across all outputs.
    let n_chunks = cells.div_ceil(CELLS_PER_CHUNK);
    let mut chunks: Vec<Vec<&mut [Complex64]>> = (0..n_chunks)
        .map(|_| Vec::with_capacity(slots.len() + vectors.len()))
        .collect();
    for field in slots.iter_mut().chain(vectors.iter_mut()) {
        let parts = field.as_mut_slice().chunks_mut(CELLS_PER_CHUNK);
        for (chunk, part) in chunks.iter_mut().zip(parts) {
            chunk.push(part);
        }
    }

    chunks
        .into_par_iter()
        .enumerate()
        .try_for_each(|(chunk_idx, mut outputs)| {
            let first = chunk_idx * CELLS_PER_CHUNK;
            let (value_out, vector_out) = outputs.split_at_mut(N);
            for local in 0..value_out[0].len() {
                let cell = first + local;
                let eigen = decompose_symmetric(cell, &hessian.matrix_at(cell), options)?;
                for (out, value) in value_out.iter_mut().zip(eigen.values) {
                    out[local] = Complex64::new(value, 0.0);
                }
                if let Some(pairs) = eigen.vectors {
                    for (out, component) in vector_out.iter_mut().zip(pairs.iter().flatten()) {
                        out[local] = Complex64::new(*component, 0.0);
                    }
                }
            }
            Ok::<(), TidalError>(())
        })?;

    let eigenvectors = options
        .compute_eigenvectors
        .then(|| EigenvectorField {
            components: vectors.into_boxed_slice(),
        });

    info!(
        "[solve_eigensystem] {cells} cells in {:.2?}",
        start.elapsed()
    );
    Ok(Eigensystem {
        eigenvalues: EigenvalueField {
            slots: slots.into_boxed_slice(),
        },
        eigenvectors,
    })
}
