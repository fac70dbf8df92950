//! CPU spectral backend built on rustfft.
//!
//! Multi-dimensional transforms are done axis by axis. Lines along axis 0
//! are contiguous and transformed in place; lines along slower axes are
//! gathered into a contiguous batch per block, transformed together and
//! scattered back. Blocks are distributed over rayon workers.
//!
//! This backend holds the whole mesh in one process. Fields whose slab is
//! only part of a distributed mesh are rejected, since the collective
//! transpose of a distributed transform is not available here.

use std::sync::Arc;

use log::debug;
use num_complex::Complex64;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustfft::{Fft, FftDirection, FftPlanner};

use tidal_core::backend::SpectralBackend;
use tidal_core::error::{Result, TidalError};
use tidal_core::field::{Domain, Field};

pub struct CpuBackend {
    planner: Mutex<FftPlanner<f64>>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    /// The planner caches plans, so repeated lengths are cheap.
    fn plan(&self, len: usize, direction: FftDirection) -> Arc<dyn Fft<f64>> {
        debug!("[cpu-backend] {direction:?} FFT of length {len}");
        self.planner.lock().plan_fft(len, direction)
    }

    fn transform<const N: usize>(
        &self,
        field: &mut Field<N>,
        direction: FftDirection,
    ) -> Result<()> {
        let (from, to) = match direction {
            FftDirection::Forward => (Domain::Real, Domain::Fourier),
            FftDirection::Inverse => (Domain::Fourier, Domain::Real),
        };
        field.validate()?;
        field.ensure_domain(from, "cpu-backend transform")?;
        let grid = field.grid();
        if !grid.is_whole() {
            return Err(TidalError::InvalidGrid(format!(
                "cpu backend needs the whole mesh, got slab {:?}",
                grid.slab()
            )));
        }

        let nmesh = grid.nmesh();
        let data = field.as_mut_slice();
        let mut stride = 1;
        for &len in &nmesh {
            let fft = self.plan(len, direction);
            transform_axis(data, len, stride, fft.as_ref());
            stride *= len;
        }

        if direction == FftDirection::Inverse {
            let scale = 1.0 / grid.total_cells() as f64;
            data.par_iter_mut().for_each(|value| *value *= scale);
        }
        field.set_domain(to);
        Ok(())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralBackend for CpuBackend {
    fn forward_fft<const N: usize>(&self, field: &mut Field<N>) -> Result<()> {
        self.transform(field, FftDirection::Forward)
    }

    fn inverse_fft<const N: usize>(&self, field: &mut Field<N>) -> Result<()> {
        self.transform(field, FftDirection::Inverse)
    }
}

/// Transform every line of length `len` whose consecutive elements are
/// `stride` apart.
fn transform_axis(data: &mut [Complex64], len: usize, stride: usize, fft: &dyn Fft<f64>) {
    let block = len * stride;
    let scratch_len = fft.get_inplace_scratch_len();
    data.par_chunks_mut(block).for_each_init(
        || {
            (
                vec![Complex64::default(); if stride == 1 { 0 } else { block }],
                vec![Complex64::default(); scratch_len],
            )
        },
        |(lines, scratch), chunk| {
            if stride == 1 {
                fft.process_with_scratch(chunk, scratch);
                return;
            }
            for m in 0..len {
                for inner in 0..stride {
                    lines[inner * len + m] = chunk[m * stride + inner];
                }
            }
            fft.process_with_scratch(lines, scratch);
            for m in 0..len {
                for inner in 0..stride {
                    chunk[m * stride + inner] = lines[inner * len + m];
                }
            }
        },
    );
}
