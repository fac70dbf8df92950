//! End-to-end tidal tensor run: Hessian, eigensystem, classification.

use std::time::Instant;

use log::info;

use crate::backend::SpectralBackend;
use crate::classification::{WebClassification, classify};
use crate::eigensystem::{Eigensystem, solve_eigensystem_with};
use crate::error::{Result, TidalError};
use crate::field::Field;
use crate::hessian::{HessianField, compute_hessian_with};
use crate::io::TidalConfig;

#[derive(Debug, Clone)]
pub struct TidalTensorResult<const N: usize> {
    pub hessian: HessianField<N>,
    pub eigensystem: Eigensystem<N>,
    pub classification: Option<WebClassification<N>>,
}

pub struct TidalPipeline<B: SpectralBackend> {
    backend: B,
    config: TidalConfig,
    pool: Option<rayon::ThreadPool>,
}

impl<B: SpectralBackend + Sync> TidalPipeline<B> {
    pub fn new(backend: B, config: TidalConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| TidalError::ThreadPool(e.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            backend,
            config,
            pool,
        })
    }

    pub fn config(&self) -> &TidalConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run every configured stage on `field`, which is consumed.
    pub fn run<const N: usize>(&self, field: Field<N>) -> Result<TidalTensorResult<N>> {
        let expected = self.config.mesh.grid::<N>()?;
        let grid = field.grid();
        if grid.nmesh() != expected.nmesh() || grid.lengths() != expected.lengths() {
            return Err(TidalError::InvalidGrid(format!(
                "field mesh {:?} / {:?} does not match configured {:?} / {:?}",
                grid.nmesh(),
                grid.lengths(),
                expected.nmesh(),
                expected.lengths()
            )));
        }

        match &self.pool {
            Some(pool) => pool.install(|| self.run_stages(field)),
            None => self.run_stages(field),
        }
    }

    fn run_stages<const N: usize>(&self, field: Field<N>) -> Result<TidalTensorResult<N>> {
        let start = Instant::now();
        let hessian = compute_hessian_with(&self.backend, field, &self.config.hessian)?;
        let eigensystem = solve_eigensystem_with(&hessian, &self.config.eigensolver)?;
        let classification = match &self.config.classification {
            Some(options) => Some(classify(&eigensystem.eigenvalues, options.threshold)?),
            None => None,
        };
        info!(
            "[pipeline] {}D run on {:?} mesh finished in {:.2?}",
            N,
            hessian.grid().nmesh(),
            start.elapsed()
        );
        Ok(TidalTensorResult {
            hessian,
            eigensystem,
            classification,
        })
    }
}
