#![cfg(test)]

use super::classification::{WebType, classify};
use super::eigensystem::solve_eigensystem;
use super::error::TidalError;
use super::field::Field;
use super::grid::Grid;
use super::hessian::HessianField;

fn diagonal_hessian_3d(grid: Grid<3>, diagonals: &[[f64; 3]]) -> HessianField<3> {
    let column = |axis: usize| diagonals.iter().map(|d| d[axis]).collect::<Vec<_>>();
    let zeros = vec![0.0; grid.len()];
    HessianField::from_components(vec![
        Field::from_real(grid, column(0)),
        Field::from_real(grid, zeros.clone()),
        Field::from_real(grid, zeros.clone()),
        Field::from_real(grid, column(1)),
        Field::from_real(grid, zeros),
        Field::from_real(grid, column(2)),
    ])
    .unwrap()
}

#[test]
fn from_count_maps_3d_structures() {
    assert_eq!(WebType::from_count(0, 3), WebType::Void);
    assert_eq!(WebType::from_count(1, 3), WebType::Sheet);
    assert_eq!(WebType::from_count(2, 3), WebType::Filament);
    assert_eq!(WebType::from_count(3, 3), WebType::Knot);
}

#[test]
fn from_count_maps_2d_structures() {
    assert_eq!(WebType::from_count(0, 2), WebType::Void);
    assert_eq!(WebType::from_count(1, 2), WebType::Filament);
    assert_eq!(WebType::from_count(2, 2), WebType::Knot);
}

#[test]
fn classify_counts_eigenvalues_above_threshold() {
    let grid = Grid::<3>::cubic(2, 1.0);
    let diagonals = [
        [-1.0, -2.0, -3.0],
        [1.0, -2.0, -3.0],
        [1.0, 2.0, -3.0],
        [1.0, 2.0, 3.0],
        [0.5, 0.2, 0.1],
        [-0.5, 0.0, 0.0],
        [0.0, 0.0, 0.0],
        [4.0, 0.0, -4.0],
    ];
    let hessian = diagonal_hessian_3d(grid, &diagonals);
    let system = solve_eigensystem(&hessian, false).unwrap();

    let web = classify(&system.eigenvalues, 0.0).unwrap();
    let labels: Vec<_> = (0..grid.len()).map(|cell| web.label(cell)).collect();
    assert_eq!(
        labels,
        vec![
            WebType::Void,
            WebType::Sheet,
            WebType::Filament,
            WebType::Knot,
            WebType::Knot,
            WebType::Void,
            WebType::Void,
            WebType::Sheet,
        ]
    );

    let raised = classify(&system.eigenvalues, 0.3).unwrap();
    assert_eq!(raised.label(4), WebType::Sheet);
    assert_eq!(raised.threshold(), 0.3);
}

#[test]
fn fractions_sum_to_one() {
    let grid = Grid::<3>::cubic(2, 1.0);
    let diagonals: Vec<[f64; 3]> = (0..grid.len())
        .map(|cell| {
            let t = cell as f64;
            [t.sin(), (1.7 * t).cos(), -(0.3 * t).sin()]
        })
        .collect();
    let hessian = diagonal_hessian_3d(grid, &diagonals);
    let system = solve_eigensystem(&hessian, false).unwrap();
    let web = classify(&system.eigenvalues, 0.0).unwrap();
    let f = web.fractions();
    assert!((f.void + f.sheet + f.filament + f.knot - 1.0).abs() < 1e-12);
    let total: usize = WebType::ALL.iter().map(|&kind| web.count(kind)).sum();
    assert_eq!(total, web.labels().len());
}

#[test]
fn non_finite_threshold_is_rejected() {
    let grid = Grid::<3>::cubic(2, 1.0);
    let hessian = diagonal_hessian_3d(grid, &[[0.0; 3]; 8]);
    let system = solve_eigensystem(&hessian, false).unwrap();
    assert!(matches!(
        classify(&system.eigenvalues, f64::NAN),
        Err(TidalError::InvalidParameter(_))
    ));
}
