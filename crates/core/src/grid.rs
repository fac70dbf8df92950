//! Uniform periodic mesh helpers with slab partitioning.
//!
//! Flat indices run with axis 0 fastest: `idx = i0 + n0 * (i1 + n1 * i2)`.
//! A distributed mesh is cut into slabs along the slowest (last) axis; each
//! worker owns `slab.len` planes starting at global plane `slab.start`.
//! Real-space and Fourier-space cells share the same local indexing.

use std::f64::consts::PI;

use crate::error::{Result, invalid_grid};

/// Mesh dimensions the engine supports.
pub const SUPPORTED_DIMS: [usize; 2] = [2, 3];

/// The range of slowest-axis planes owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slab {
    pub rank: usize,
    pub n_ranks: usize,
    pub start: usize,
    pub len: usize,
}

impl Slab {
    /// A single worker owning all `planes`.
    pub fn whole(planes: usize) -> Self {
        Self {
            rank: 0,
            n_ranks: 1,
            start: 0,
            len: planes,
        }
    }

    /// Whether this slab holds the globally-first cell, which in Fourier
    /// space is the zero wavevector.
    #[inline]
    pub fn owns_global_origin(&self) -> bool {
        self.start == 0 && self.len > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid<const N: usize> {
    nmesh: [usize; N],
    lengths: [f64; N],
    slab: Slab,
}

impl<const N: usize> Grid<N> {
    /// A mesh held entirely by one worker. Use [`Grid::validate`] before
    /// handing it to a computation.
    pub fn new(nmesh: [usize; N], lengths: [f64; N]) -> Self {
        let planes = if N == 0 { 0 } else { nmesh[N - 1] };
        Self {
            nmesh,
            lengths,
            slab: Slab::whole(planes),
        }
    }

    /// Same resolution and box length along every axis.
    pub fn cubic(nmesh: usize, box_size: f64) -> Self {
        Self::new([nmesh; N], [box_size; N])
    }

    /// Restrict this mesh to the planes owned by one worker.
    pub fn with_slab(mut self, slab: Slab) -> Self {
        self.slab = slab;
        self
    }

    pub fn nmesh(&self) -> [usize; N] {
        self.nmesh
    }

    pub fn lengths(&self) -> [f64; N] {
        self.lengths
    }

    pub fn slab(&self) -> Slab {
        self.slab
    }

    /// Number of cells in the whole (global) mesh.
    pub fn total_cells(&self) -> usize {
        self.nmesh.iter().product()
    }

    /// Number of locally owned cells.
    pub fn len(&self) -> usize {
        if N == 0 {
            return 0;
        }
        self.nmesh[..N - 1].iter().product::<usize>() * self.slab.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the local slab covers every plane of the mesh.
    pub fn is_whole(&self) -> bool {
        N > 0 && self.slab.start == 0 && self.slab.len == self.nmesh[N - 1]
    }

    /// Check the mesh can carry a computation.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_DIMS.contains(&N) {
            return Err(invalid_grid(format!(
                "unsupported mesh dimension {N} (expected 2 or 3)"
            )));
        }
        if let Some(axis) = self.nmesh.iter().position(|&n| n == 0) {
            return Err(invalid_grid(format!("axis {axis} has zero resolution")));
        }
        if let Some(axis) = self
            .lengths
            .iter()
            .position(|&l| !(l.is_finite() && l > 0.0))
        {
            return Err(invalid_grid(format!(
                "axis {axis} has non-positive box length {}",
                self.lengths[axis]
            )));
        }
        let slab = self.slab;
        if slab.n_ranks == 0 || slab.rank >= slab.n_ranks {
            return Err(invalid_grid(format!(
                "slab rank {} outside 0..{}",
                slab.rank, slab.n_ranks
            )));
        }
        if slab.len == 0 {
            return Err(invalid_grid(format!("rank {} owns no planes", slab.rank)));
        }
        if slab.start + slab.len > self.nmesh[N - 1] {
            return Err(invalid_grid(format!(
                "slab {}..{} exceeds {} planes",
                slab.start,
                slab.start + slab.len,
                self.nmesh[N - 1]
            )));
        }
        Ok(())
    }

    /// Whether two meshes have identical resolution, extent and partitioning.
    pub fn same_layout(&self, other: &Self) -> bool {
        self == other
    }

    #[inline]
    pub fn idx(&self, local: [usize; N]) -> usize {
        let mut idx = 0;
        for axis in (0..N).rev() {
            let extent = if axis == N - 1 {
                self.slab.len
            } else {
                self.nmesh[axis]
            };
            idx = idx * extent + local[axis];
        }
        idx
    }

    /// Local multi-index of a flat local index.
    #[inline]
    pub fn local_coords(&self, mut idx: usize) -> [usize; N] {
        let mut coords = [0; N];
        for (axis, coord) in coords.iter_mut().enumerate().take(N.saturating_sub(1)) {
            let n = self.nmesh[axis];
            *coord = idx % n;
            idx /= n;
        }
        if N > 0 {
            coords[N - 1] = idx;
        }
        coords
    }

    /// Global multi-index of a flat local index.
    #[inline]
    pub fn global_coords(&self, idx: usize) -> [usize; N] {
        let mut coords = self.local_coords(idx);
        if N > 0 {
            coords[N - 1] += self.slab.start;
        }
        coords
    }

    /// Real-space position of a cell, `x_a = i_a * L_a / n_a`.
    pub fn position(&self, idx: usize) -> [f64; N] {
        let coords = self.global_coords(idx);
        std::array::from_fn(|axis| {
            coords[axis] as f64 * self.lengths[axis] / self.nmesh[axis] as f64
        })
    }

    /// Wavevector and its squared norm at a flat local Fourier index.
    #[inline]
    pub fn wavevector(&self, idx: usize) -> ([f64; N], f64) {
        let coords = self.global_coords(idx);
        let kvec: [f64; N] = std::array::from_fn(|axis| {
            2.0 * PI * centered_frequency(coords[axis], self.nmesh[axis]) as f64
                / self.lengths[axis]
        });
        let kmag2 = kvec.iter().map(|k| k * k).sum();
        (kvec, kmag2)
    }
}

/// Signed frequency of FFT bin `m` on an axis of `n` bins; the Nyquist bin
/// is taken as positive.
#[inline]
pub fn centered_frequency(m: usize, n: usize) -> isize {
    if m <= n / 2 {
        m as isize
    } else {
        m as isize - n as isize
    }
}
