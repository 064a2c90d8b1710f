//! Smooth toy descriptor used to check kernel derivatives against finite differences.
//!
//! For a center atom `c`, component `(s, m)` is `sum_k exp(-eta_m |r_k - r_c|^2)` over the
//! other atoms `k` of kind `s`. Every atom is a neighbor of every center.
use ndarray::{Array1, Array2};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use sgpkern_descriptors::{strain_derivatives, DescriptorValues, LocalDescriptor};

pub(crate) const ETAS: [f64; 3] = [0.4, 0.9, 1.7];
pub(crate) const N_KINDS: usize = 2;
pub(crate) const N_DESC: usize = N_KINDS * ETAS.len();

pub(crate) fn toy_structure(positions: &Array2<f64>, kinds: &[usize]) -> DescriptorValues<f64> {
    let n_atoms = positions.nrows();
    let envs = (0..n_atoms)
        .map(|c| {
            let mut values = Array1::zeros(N_DESC);
            let mut dervs = Array2::zeros((3 * n_atoms, N_DESC));
            for k in (0..n_atoms).filter(|&k| k != c) {
                let r = &positions.row(k) - &positions.row(c);
                let r2 = r.dot(&r);
                for (m, eta) in ETAS.iter().enumerate() {
                    let col = kinds[k] * ETAS.len() + m;
                    let e = f64::exp(-eta * r2);
                    values[col] += e;
                    for dim in 0..3 {
                        let g = -2. * eta * e * r[dim];
                        dervs[[3 * k + dim, col]] += g;
                        dervs[[3 * c + dim, col]] -= g;
                    }
                }
            }
            let strain = strain_derivatives(positions, &dervs, 1.).unwrap();
            LocalDescriptor::new(kinds[c], c, values, (0..n_atoms).collect(), dervs, strain)
                .unwrap()
        })
        .collect();
    DescriptorValues::new(n_atoms, N_DESC, N_KINDS, envs)
        .unwrap()
        .with_volume(1.)
        .unwrap()
}

pub(crate) fn random_positions(n_atoms: usize, seed: u64) -> Array2<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    Array2::random_using((n_atoms, 3), Uniform::new(0., 1.5), &mut rng)
}

/// Positions under the homogeneous deformation `r_a += eps * r_b`
pub(crate) fn strained(positions: &Array2<f64>, (a, b): (usize, usize), eps: f64) -> Array2<f64> {
    let mut res = positions.clone();
    for mut r in res.rows_mut() {
        let rb = r[b];
        r[a] += eps * rb;
    }
    res
}

pub(crate) fn from_flat(x: &[f64]) -> Array2<f64> {
    Array2::from_shape_vec((x.len() / 3, 3), x.to_vec()).unwrap()
}
