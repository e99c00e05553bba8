// Electron density of H2 from a minimal two-function Slater basis,
// evaluated on a cube around the bond axis.

use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

use nalgebra::{DMatrix, Vector3};

use cube::{compute_density, compute_orbital, Cube};
use slater::{SlaterSet, SlaterType};

fn main() {
    tracing_subscriber::fmt::init();

    let bond = 0.74;
    let mut set = SlaterSet::new();
    set.add_atoms(vec![Vector3::zeros(), Vector3::new(0.0, 0.0, bond)]);
    set.add_slater_indices(vec![0, 1]);
    set.add_slater_types(vec![SlaterType::S, SlaterType::S]);
    set.add_zetas(vec![1.24, 1.24]);
    set.add_pqns(vec![1, 1]);
    set.set_num_electrons(2.0);

    set.add_overlap_matrix(DMatrix::from_row_slice(2, 2, &[1.0, 0.66, 0.66, 1.0]));
    // Bonding and antibonding combinations as coefficient columns.
    set.add_eigen_vectors(DMatrix::from_row_slice(
        2,
        2,
        &[
            FRAC_1_SQRT_2,
            FRAC_1_SQRT_2,
            FRAC_1_SQRT_2,
            -FRAC_1_SQRT_2,
        ],
    ));
    // Two electrons in the bonding orbital.
    set.add_density_matrix(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]));

    let set = Arc::new(set);
    let step = 0.1;
    let cube = Arc::new(Cube::new(
        Vector3::new(-2.0, -2.0, -2.0 + bond / 2.0),
        Vector3::new(step, step, step),
        [41, 41, 41],
    ));

    let summary = compute_orbital(&set, &cube, 1)
        .expect("orbital 1 exists")
        .wait();
    println!("orbital pass:  {:?}", summary);
    println!(
        "amplitude at the bond midpoint: {:.6}",
        cube.value(cube.len() / 2)
    );

    let summary = compute_density(&set, &cube).expect("basis accepted").wait();
    println!("density pass:  {:?}", summary);

    let values = cube.values();
    let integrated: f64 = values.iter().sum::<f64>() * step.powi(3);
    println!("density integrated over the box: {:.4}", integrated);
}
