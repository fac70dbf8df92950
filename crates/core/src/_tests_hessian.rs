#![cfg(test)]

use std::f64::consts::PI;

use num_complex::Complex64;

use super::error::TidalError;
use super::field::{Domain, Field};
use super::grid::{Grid, Slab};
use super::hessian::{
    HessianField, HessianOptions, apply_second_derivative, component_count, compute_hessian,
    index_pairs, pair_index,
};
use super::test_support::{TestBackend, assert_close};

#[test]
fn pair_index_packs_upper_triangle_row_major() {
    assert_eq!(component_count(2), 3);
    assert_eq!(component_count(3), 6);
    let pairs: Vec<_> = index_pairs(3).collect();
    assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]);
    for (flat, &(i, j)) in pairs.iter().enumerate() {
        assert_eq!(pair_index(3, i, j), flat);
        assert_eq!(pair_index(3, j, i), flat);
    }
    let pairs_2d: Vec<_> = index_pairs(2).collect();
    assert_eq!(pairs_2d, vec![(0, 0), (0, 1), (1, 1)]);
    assert_eq!(pair_index(2, 1, 0), 1);
    assert_eq!(pair_index(2, 1, 1), 2);
}

#[test]
fn constant_field_has_zero_hessian() {
    let grid = Grid::<2>::cubic(4, 1.0);
    for potential_mode in [false, true] {
        let field = Field::from_real(grid, vec![3.25; grid.len()]);
        let hessian = compute_hessian(&TestBackend, field, 1.0, potential_mode).unwrap();
        assert_eq!(hessian.components().len(), 3);
        for component in hessian.components() {
            assert_eq!(component.domain(), Domain::Real);
            for cell in 0..grid.len() {
                assert_close(component.real(cell), 0.0, 1e-10, "constant field");
            }
        }
    }
}

#[test]
fn sine_along_x_has_only_xx_component() {
    let grid = Grid::<3>::cubic(8, 1.0);
    let field = Field::from_fn(grid, |x| (2.0 * PI * x[0]).sin());
    let hessian = compute_hessian(&TestBackend, field, 1.0, false).unwrap();
    let k2 = (2.0 * PI).powi(2);
    for cell in 0..grid.len() {
        let x = grid.position(cell);
        let expected = -k2 * (2.0 * PI * x[0]).sin();
        assert_close(hessian.component(0, 0).real(cell), expected, 1e-8, "fxx");
        for (i, j) in index_pairs(3).skip(1) {
            assert_close(hessian.component(i, j).real(cell), 0.0, 1e-8, "off-xx");
        }
    }
}

#[test]
fn normalization_scales_every_component() {
    let grid = Grid::<2>::cubic(8, 1.0);
    let f = |x: [f64; 2]| (2.0 * PI * (x[0] + x[1])).cos();
    let unit = compute_hessian(&TestBackend, Field::from_fn(grid, f), 1.0, false).unwrap();
    let scaled = compute_hessian(&TestBackend, Field::from_fn(grid, f), -2.5, false).unwrap();
    for (a, b) in unit.components().iter().zip(scaled.components()) {
        for cell in 0..grid.len() {
            assert_close(b.real(cell), -2.5 * a.real(cell), 1e-9, "scaled");
        }
    }
}

#[test]
fn potential_mode_solves_poisson_for_single_mode() {
    let grid = Grid::<2>::cubic(8, 1.0);
    let norm = 1.5;
    let k = [2.0 * PI, 4.0 * PI];
    let kmag2 = k[0] * k[0] + k[1] * k[1];
    let source = |x: [f64; 2]| (k[0] * x[0] + k[1] * x[1]).cos();
    let hessian = compute_hessian(&TestBackend, Field::from_fn(grid, source), norm, true).unwrap();
    for cell in 0..grid.len() {
        let s = source(grid.position(cell));
        for (i, j) in index_pairs(2) {
            let expected = norm * k[i] * k[j] / kmag2 * s;
            assert_close(hessian.component(i, j).real(cell), expected, 1e-9, "phi_ij");
        }
        // Poisson: trace of the potential Hessian is the scaled source.
        assert_close(hessian.trace_at(cell), norm * s, 1e-9, "trace");
    }
}

#[test]
fn zero_wavevector_is_forced_to_zero_in_both_modes() {
    let grid = Grid::<2>::cubic(4, 1.0);
    for potential_mode in [false, true] {
        let options = HessianOptions {
            normalization: 1.0,
            potential_mode,
        };
        for (i, j) in index_pairs(2) {
            let mut spectral =
                Field::from_fourier(grid, vec![Complex64::new(1.0, 1.0); grid.len()]);
            apply_second_derivative(&mut spectral, i, j, &options);
            assert_eq!(spectral.fourier(0), Complex64::new(0.0, 0.0));
            assert!(spectral.as_slice().iter().all(|v| v.re.is_finite() && v.im.is_finite()));
        }
    }
}

#[test]
fn only_the_origin_owner_zeroes_its_first_coefficient() {
    let grid = Grid::<2>::cubic(4, 1.0).with_slab(Slab {
        rank: 1,
        n_ranks: 2,
        start: 2,
        len: 2,
    });
    let options = HessianOptions::default();
    let mut spectral = Field::from_fourier(grid, vec![Complex64::new(1.0, 0.0); grid.len()]);
    apply_second_derivative(&mut spectral, 1, 1, &options);
    let (k, _) = grid.wavevector(0);
    assert_close(spectral.fourier(0).re, -k[1] * k[1], 1e-12, "non-owner DC slot");
    assert!(spectral.fourier(0).re != 0.0);
}

#[test]
fn invalid_inputs_are_rejected_before_any_work() {
    let empty = Field::zeros(Grid::<2>::new([0, 4], [1.0; 2]));
    assert!(matches!(
        compute_hessian(&TestBackend, empty, 1.0, false),
        Err(TidalError::InvalidGrid(_))
    ));

    let grid = Grid::<2>::cubic(2, 1.0);
    let spectral = Field::from_fourier(grid, vec![Complex64::default(); grid.len()]);
    assert!(matches!(
        compute_hessian(&TestBackend, spectral, 1.0, false),
        Err(TidalError::InvalidGrid(_))
    ));

    let field = Field::zeros(grid);
    assert!(matches!(
        compute_hessian(&TestBackend, field, f64::NAN, false),
        Err(TidalError::InvalidParameter(_))
    ));
}

#[test]
fn from_components_checks_count_and_layout() {
    let grid = Grid::<2>::cubic(2, 1.0);
    let too_few = vec![Field::zeros(grid), Field::zeros(grid)];
    assert!(matches!(
        HessianField::from_components(too_few),
        Err(TidalError::InvalidGrid(_))
    ));

    let other = Grid::<2>::cubic(4, 1.0);
    let mismatched = vec![Field::zeros(grid), Field::zeros(other), Field::zeros(grid)];
    assert!(matches!(
        HessianField::from_components(mismatched),
        Err(TidalError::InvalidGrid(_))
    ));

    let ok = HessianField::from_components(vec![Field::zeros(grid); 3]).unwrap();
    assert_eq!(ok.grid(), grid);
    assert_eq!(ok.into_components().len(), 3);
}
