//! Backend trait for the spectral transforms the engine consumes.
//!
//! A backend owns the transform plans and, for distributed meshes, the
//! collective communication. The engine only relies on the documented
//! output convention:
//!
//! - `forward_fft` maps a real-domain field to unnormalised Fourier
//!   coefficients `F(k) = Σ_x f(x) e^{-i k·x}` laid out with the same local
//!   indexing as the real-space slab.
//! - `inverse_fft` applies the conjugate transform scaled by `1 / total_cells`
//!   so `inverse_fft(forward_fft(f)) == f`.
//!
//! Both retag the field's [`Domain`](crate::field::Domain) and fail with
//! `InvalidGrid` when handed a field in the wrong domain.

use crate::error::Result;
use crate::field::Field;

pub trait SpectralBackend {
    fn forward_fft<const N: usize>(&self, field: &mut Field<N>) -> Result<()>;
    fn inverse_fft<const N: usize>(&self, field: &mut Field<N>) -> Result<()>;

    /// Inverse transform on multiple fields sharing one mesh.
    ///
    /// Backends can override this to amortise plan lookup across fields.
    fn batch_inverse_fft<const N: usize>(&self, fields: &mut [Field<N>]) -> Result<()> {
        for field in fields.iter_mut() {
            self.inverse_fft(field)?;
        }
        Ok(())
    }
}
