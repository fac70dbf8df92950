//! Contiguous scalar field storage on a (slab of a) periodic mesh.
//!
//! Samples are stored as `Complex64` in both domains so a field can be
//! transformed in place. In the real domain only the real part carries
//! meaning.

use num_complex::Complex64;

use crate::error::{Result, invalid_grid};
use crate::grid::Grid;

/// Which representation a field buffer currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Real,
    Fourier,
}

#[derive(Debug, Clone)]
pub struct Field<const N: usize> {
    grid: Grid<N>,
    domain: Domain,
    data: Vec<Complex64>,
}

impl<const N: usize> Field<N> {
    pub fn zeros(grid: Grid<N>) -> Self {
        Self {
            data: vec![Complex64::default(); grid.len()],
            domain: Domain::Real,
            grid,
        }
    }

    pub fn from_real(grid: Grid<N>, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), grid.len(), "data length must match grid size");
        Self {
            data: values.into_iter().map(|v| Complex64::new(v, 0.0)).collect(),
            domain: Domain::Real,
            grid,
        }
    }

    /// Wrap spectral coefficients for the locally owned Fourier cells.
    pub fn from_fourier(grid: Grid<N>, coefficients: Vec<Complex64>) -> Self {
        assert_eq!(
            coefficients.len(),
            grid.len(),
            "data length must match grid size"
        );
        Self {
            data: coefficients,
            domain: Domain::Fourier,
            grid,
        }
    }

    /// Sample `f` at the position of every locally owned cell.
    pub fn from_fn<F>(grid: Grid<N>, f: F) -> Self
    where
        F: Fn([f64; N]) -> f64,
    {
        let data = (0..grid.len())
            .map(|idx| Complex64::new(f(grid.position(idx)), 0.0))
            .collect();
        Self {
            data,
            domain: Domain::Real,
            grid,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn grid(&self) -> Grid<N> {
        self.grid
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Retag the buffer after a transform. Only spectral backends should
    /// call this.
    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    #[inline]
    pub fn real(&self, idx: usize) -> f64 {
        self.data[idx].re
    }

    #[inline]
    pub fn set_real(&mut self, idx: usize, value: f64) {
        self.data[idx] = Complex64::new(value, 0.0);
    }

    #[inline]
    pub fn fourier(&self, idx: usize) -> Complex64 {
        self.data[idx]
    }

    #[inline]
    pub fn set_fourier(&mut self, idx: usize, value: Complex64) {
        self.data[idx] = value;
    }

    /// Copy out the real samples.
    pub fn real_values(&self) -> Vec<f64> {
        self.data.iter().map(|c| c.re).collect()
    }

    /// Drop imaginary residue left by an inverse transform.
    pub fn discard_imaginary(&mut self) {
        for value in &mut self.data {
            value.im = 0.0;
        }
    }

    /// Check the field is allocated on a usable mesh.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if self.data.is_empty() {
            return Err(invalid_grid("field is not allocated"));
        }
        if self.data.len() != self.grid.len() {
            return Err(invalid_grid(format!(
                "field holds {} samples but its grid owns {} cells",
                self.data.len(),
                self.grid.len()
            )));
        }
        Ok(())
    }

    pub fn ensure_domain(&self, expected: Domain, context: &str) -> Result<()> {
        if self.domain != expected {
            return Err(invalid_grid(format!(
                "{context}: expected a {expected:?}-domain field, got {:?}",
                self.domain
            )));
        }
        Ok(())
    }
}

impl<const N: usize> From<Field<N>> for Vec<Complex64> {
    fn from(field: Field<N>) -> Self {
        field.data
    }
}
