//! End-to-end tests for the evaluation passes: dispatch semantics, lock
//! discipline, cancellation and the values written to the grid.

use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{DMatrix, Vector3};

use cube::{compute_density, compute_orbital, Cube, CubeError};
use slater::{SlaterSet, SlaterType};

/// Single hydrogen atom, one 1s function, trivial 1x1 matrices.
fn hydrogen_1s() -> Arc<SlaterSet> {
    let mut set = SlaterSet::new();
    set.add_atoms(vec![Vector3::zeros()]);
    set.add_slater_indices(vec![0]);
    set.add_slater_types(vec![SlaterType::S]);
    set.add_zetas(vec![1.0]);
    set.add_pqns(vec![1]);
    set.set_num_electrons(1.0);
    set.add_overlap_matrix(DMatrix::from_element(1, 1, 1.0));
    set.add_eigen_vectors(DMatrix::from_element(1, 1, 1.0));
    set.add_density_matrix(DMatrix::from_element(1, 1, 1.0));
    Arc::new(set)
}

fn small_cube() -> Arc<Cube> {
    Arc::new(Cube::new(
        Vector3::new(-1.0, -1.0, -1.0),
        Vector3::new(1.0, 1.0, 1.0),
        [3, 2, 2],
    ))
}

#[test]
fn orbital_pass_fills_every_cell() {
    let set = hydrogen_1s();
    let cube = small_cube();

    let summary = compute_orbital(&set, &cube, 1).unwrap().wait();
    assert_eq!(summary.points, cube.len());
    assert_eq!(summary.written, cube.len());
    assert_eq!(summary.non_finite, 0);
    assert!(!summary.cancelled);

    let eval = set.evaluator().unwrap();
    let values = cube.values();
    for index in 0..cube.len() {
        assert_relative_eq!(
            values[index],
            eval.orbital(&cube.position(index), 0),
            epsilon = 1e-14
        );
    }
}

#[test]
fn density_pass_matches_squared_orbital() {
    let set = hydrogen_1s();
    let cube = small_cube();

    let summary = compute_density(&set, &cube).unwrap().wait();
    assert_eq!(summary.written, cube.len());

    // With a single diagonal density entry of 1, the density is the
    // squared orbital amplitude everywhere.
    let eval = set.evaluator().unwrap();
    let values = cube.values();
    for index in 0..cube.len() {
        let phi = eval.orbital(&cube.position(index), 0);
        assert_relative_eq!(values[index], phi * phi, epsilon = 1e-12);
    }
}

#[test]
fn rejected_orbital_index_leaves_grid_untouched() {
    let set = hydrogen_1s();
    let cube = small_cube();
    for index in 0..cube.len() {
        cube.set_value(index, 7.0);
    }

    for mo_index in [0, set.num_mos() + 1] {
        let err = compute_orbital(&set, &cube, mo_index).unwrap_err();
        match err {
            CubeError::OrbitalIndexOutOfRange { index, num_mos } => {
                assert_eq!(index, mo_index);
                assert_eq!(num_mos, 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    let values = cube.values();
    assert!(values.iter().all(|&v| v == 7.0));
}

#[test]
fn empty_basis_always_rejects_orbitals() {
    let set = Arc::new(SlaterSet::new());
    let cube = small_cube();
    assert_eq!(set.num_mos(), 0);
    assert!(matches!(
        compute_orbital(&set, &cube, 1).unwrap_err(),
        CubeError::OrbitalIndexOutOfRange { num_mos: 0, .. }
    ));
}

#[test]
fn bad_basis_shapes_reject_synchronously() {
    let mut set = SlaterSet::new();
    set.add_atoms(vec![Vector3::zeros()]);
    set.add_slater_indices(vec![0, 0]);
    set.add_slater_types(vec![SlaterType::S, SlaterType::S]);
    set.add_zetas(vec![1.0, 2.0]);
    set.add_pqns(vec![1]);
    set.add_overlap_matrix(DMatrix::identity(2, 2));
    set.add_eigen_vectors(DMatrix::identity(2, 2));
    let set = Arc::new(set);
    let cube = small_cube();

    assert!(matches!(
        compute_orbital(&set, &cube, 1).unwrap_err(),
        CubeError::Basis(_)
    ));
    assert!(matches!(
        compute_density(&set, &cube).unwrap_err(),
        CubeError::Basis(_)
    ));
}

#[test]
fn dispatch_does_not_block_and_pass_waits_for_readers() {
    let set = hydrogen_1s();
    let cube = small_cube();

    // A reader holding the grid keeps the pass from starting; dispatch
    // itself must still return immediately.
    let reader = cube.values();
    let handle = compute_orbital(&set, &cube, 1).unwrap();
    assert!(reader.iter().all(|&v| v == 0.0));

    drop(reader);
    let summary = handle.wait();
    assert_eq!(summary.written, cube.len());
    assert!(cube.values().iter().any(|&v| v != 0.0));
}

#[test]
fn cancellation_short_circuits_remaining_tasks() {
    let set = hydrogen_1s();
    let cube = small_cube();

    // Cancel while a reader still blocks the pass, so no task has run yet
    // by the time the worker gets the lock.
    let reader = cube.values();
    let handle = compute_orbital(&set, &cube, 1).unwrap();
    handle.cancel();
    drop(reader);

    let summary = handle.wait();
    assert!(summary.cancelled);
    assert_eq!(summary.written, 0);
    assert!(cube.values().iter().all(|&v| v == 0.0));
}

#[test]
fn same_cube_runs_passes_back_to_back() {
    let set = hydrogen_1s();
    let cube = small_cube();
    let eval = set.evaluator().unwrap();

    assert!(!compute_orbital(&set, &cube, 1).unwrap().wait().cancelled);
    {
        let values = cube.values();
        for index in 0..cube.len() {
            assert_relative_eq!(
                values[index],
                eval.orbital(&cube.position(index), 0),
                epsilon = 1e-14
            );
        }
    }

    assert!(!compute_density(&set, &cube).unwrap().wait().cancelled);
    let values = cube.values();
    for index in 0..cube.len() {
        assert_relative_eq!(
            values[index],
            eval.density(&cube.position(index)),
            epsilon = 1e-12
        );
    }
}

#[test]
fn concurrent_passes_over_the_same_cube_never_interleave() {
    let set = hydrogen_1s();
    let cube = small_cube();

    // Both workers queue at the write lock in whichever order the
    // scheduler picks; exclusivity means the final grid is entirely one
    // pass's field, never a mixture. The two fields differ in every cell
    // (0 < phi < 1 everywhere, so phi != phi^2).
    let orbital = compute_orbital(&set, &cube, 1).unwrap();
    let density = compute_density(&set, &cube).unwrap();
    assert!(!orbital.wait().cancelled);
    assert!(!density.wait().cancelled);

    let eval = set.evaluator().unwrap();
    let values = cube.values();
    let matches = |expected: &dyn Fn(usize) -> f64| {
        (0..cube.len()).all(|i| (values[i] - expected(i)).abs() < 1e-12)
    };
    let all_orbital = matches(&|i| eval.orbital(&cube.position(i), 0));
    let all_density = matches(&|i| eval.density(&cube.position(i)));
    assert!(all_orbital ^ all_density);
}

#[test]
fn passes_over_different_cubes_are_independent() {
    let set = hydrogen_1s();
    let a = small_cube();
    let b = small_cube();

    let pass_a = compute_orbital(&set, &a, 1).unwrap();
    let pass_b = compute_density(&set, &b).unwrap();
    assert_eq!(pass_a.wait().written, a.len());
    assert_eq!(pass_b.wait().written, b.len());
}

#[test]
fn non_finite_values_propagate_and_are_counted() {
    let mut set = SlaterSet::new();
    set.add_atoms(vec![Vector3::zeros()]);
    set.add_slater_indices(vec![0]);
    set.add_slater_types(vec![SlaterType::S]);
    set.add_zetas(vec![f64::NAN]);
    set.add_pqns(vec![1]);
    set.add_overlap_matrix(DMatrix::from_element(1, 1, 1.0));
    set.add_eigen_vectors(DMatrix::from_element(1, 1, 1.0));
    let set = Arc::new(set);
    let cube = small_cube();

    let summary = compute_orbital(&set, &cube, 1).unwrap().wait();
    assert_eq!(summary.written, cube.len());
    assert_eq!(summary.non_finite, cube.len());
    assert!(cube.values().iter().all(|v| v.is_nan()));
}
