//! Hessian of a scalar field by spectral differentiation.
//!
//! Only the upper triangle is computed. Components are packed row-major:
//!
//! - 2D: `[fxx, fxy, fyy]`
//! - 3D: `[fxx, fxy, fxz, fyy, fyz, fzz]`
//!
//! In potential mode the Hessian of `phi` with `∇²phi = norm * f` is
//! returned instead, using `phi(k) = -norm * f(k) / |k|²`.

use std::time::Instant;

use log::{debug, info};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::SpectralBackend;
use crate::error::{Result, TidalError, invalid_grid};
use crate::field::{Domain, Field};
use crate::grid::Grid;

/// Number of independent components of a symmetric `ndim × ndim` tensor.
pub const fn component_count(ndim: usize) -> usize {
    ndim * (ndim + 1) / 2
}

/// Flat position of `(i, j)` in the packed upper triangle. Symmetric in
/// its arguments.
#[inline]
pub const fn pair_index(ndim: usize, i: usize, j: usize) -> usize {
    let (row, col) = if i <= j { (i, j) } else { (j, i) };
    row * (2 * ndim - row + 1) / 2 + (col - row)
}

/// The `(i, j)` pairs with `i <= j` in packing order.
pub fn index_pairs(ndim: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..ndim).flat_map(move |i| (i..ndim).map(move |j| (i, j)))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HessianOptions {
    /// Multiplies the field (or the Poisson source) before differentiation.
    #[serde(default = "default_normalization")]
    pub normalization: f64,
    /// Differentiate the potential sourced by the field instead of the field.
    #[serde(default)]
    pub potential_mode: bool,
}

impl Default for HessianOptions {
    fn default() -> Self {
        Self {
            normalization: default_normalization(),
            potential_mode: false,
        }
    }
}

fn default_normalization() -> f64 {
    1.0
}

/// Packed upper-triangular second derivatives, one field per component.
#[derive(Debug, Clone)]
pub struct HessianField<const N: usize> {
    components: Box<[Field<N>]>,
}

impl<const N: usize> HessianField<N> {
    /// Assemble from already packed components.
    ///
    /// Fails with `InvalidGrid` unless exactly `N(N+1)/2` allocated
    /// real-domain fields on one mesh are supplied.
    pub fn from_components(components: Vec<Field<N>>) -> Result<Self> {
        let expected = component_count(N);
        if components.len() != expected {
            return Err(invalid_grid(format!(
                "expected {expected} Hessian components, got {}",
                components.len()
            )));
        }
        let grid = components[0].grid();
        for (count, component) in components.iter().enumerate() {
            component
                .validate()
                .map_err(|err| invalid_grid(format!("component {count}: {err}")))?;
            component.ensure_domain(Domain::Real, "Hessian component")?;
            if !component.grid().same_layout(&grid) {
                return Err(invalid_grid(format!(
                    "component {count} does not share the mesh of component 0"
                )));
            }
        }
        Ok(Self {
            components: components.into_boxed_slice(),
        })
    }

    pub fn grid(&self) -> Grid<N> {
        self.components[0].grid()
    }

    pub fn component(&self, i: usize, j: usize) -> &Field<N> {
        &self.components[pair_index(N, i, j)]
    }

    pub fn components(&self) -> &[Field<N>] {
        &self.components
    }

    pub fn into_components(self) -> Vec<Field<N>> {
        self.components.into_vec()
    }

    /// The full symmetric matrix at one cell.
    #[inline]
    pub fn matrix_at(&self, cell: usize) -> [[f64; N]; N] {
        std::array::from_fn(|i| {
            std::array::from_fn(|j| self.components[pair_index(N, i, j)].real(cell))
        })
    }

    pub fn trace_at(&self, cell: usize) -> f64 {
        (0..N)
            .map(|i| self.components[pair_index(N, i, i)].real(cell))
            .sum()
    }
}

/// Compute the Hessian of `normalization * field` (or of its potential).
///
/// The field is consumed: it is transformed to Fourier space in place and
/// its storage is reused for the last component.
pub fn compute_hessian<B, const N: usize>(
    backend: &B,
    field: Field<N>,
    normalization: f64,
    potential_mode: bool,
) -> Result<HessianField<N>>
where
    B: SpectralBackend,
{
    let options = HessianOptions {
        normalization,
        potential_mode,
    };
    compute_hessian_with(backend, field, &options)
}

pub fn compute_hessian_with<B, const N: usize>(
    backend: &B,
    field: Field<N>,
    options: &HessianOptions,
) -> Result<HessianField<N>>
where
    B: SpectralBackend,
{
    field.validate()?;
    field.ensure_domain(Domain::Real, "compute_hessian")?;
    if !options.normalization.is_finite() {
        return Err(TidalError::InvalidParameter(format!(
            "normalization must be finite, got {}",
            options.normalization
        )));
    }

    let start = Instant::now();
    let mut spectral = field;
    backend.forward_fft(&mut spectral)?;

    let pairs: Vec<(usize, usize)> = index_pairs(N).collect();
    let mut components: Vec<Field<N>> = Vec::with_capacity(pairs.len());
    components.extend((1..pairs.len()).map(|_| spectral.clone()));
    components.push(spectral);
    for (component, &(i, j)) in components.iter_mut().zip(&pairs) {
        debug!("[compute_hessian] computing d2/dx{i}dx{j}");
        apply_second_derivative(component, i, j, options);
    }

    backend.batch_inverse_fft(&mut components)?;
    for component in &mut components {
        component.discard_imaginary();
    }

    info!(
        "[compute_hessian] {} components on {:?} mesh in {:.2?}",
        components.len(),
        components[0].grid().nmesh(),
        start.elapsed()
    );
    HessianField::from_components(components)
}

/// `f(k) -> -norm k_i k_j f(k)`, times `-1/|k|²` in potential mode, then
/// zero the DC coefficient if this worker owns it.
pub(crate) fn apply_second_derivative<const N: usize>(
    spectral: &mut Field<N>,
    i: usize,
    j: usize,
    options: &HessianOptions,
) {
    let grid = spectral.grid();
    let norm = options.normalization;
    let potential_mode = options.potential_mode;
    spectral
        .as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, value)| {
            let (kvec, kmag2) = grid.wavevector(idx);
            let mut factor = -norm * kvec[i] * kvec[j];
            if potential_mode && kmag2 > 0.0 {
                factor *= -1.0 / kmag2;
            }
            *value *= factor;
        });

    if grid.slab().owns_global_origin() {
        spectral.set_fourier(0, Complex64::new(0.0, 0.0));
    }
}
