//! Tidal tensor engine: spectral Hessians of scalar fields on periodic
//! meshes and their per-cell symmetric eigensystems.

pub mod backend;
pub mod classification;
pub mod eigensystem;
pub mod error;
pub mod field;
pub mod grid;
pub mod hessian;
pub mod io;
pub mod pipeline;

pub use error::{Result, TidalError};

#[cfg(test)]
mod _tests_classification;
#[cfg(test)]
mod _tests_hessian;
