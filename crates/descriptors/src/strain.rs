use crate::errors::{DescriptorError, Result};
use crate::N_STRAIN;
use linfa::Float;
use ndarray::{s, Array2, ArrayBase, Data, Ix2};

/// Voigt order of the strain components as (row, column) pairs
pub const VOIGT_PAIRS: [(usize, usize); N_STRAIN] =
    [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)];

/// Computes descriptor derivatives with respect to strain from neighbor coordinates
/// using the virial sum
///
/// ```text
///   d(desc)/d(eps_ab) = 1/V sum_k r_k_b * d(desc)/d(r_k_a)
/// ```
///
/// where `coordinates` is the `(n_neighbors, 3)` matrix of neighbor positions and
/// `position_dervs` the matching `(3 * n_neighbors, n_descriptors)` derivatives.
/// Returns a `(6, n_descriptors)` matrix in Voigt order.
pub fn strain_derivatives<F: Float>(
    coordinates: &ArrayBase<impl Data<Elem = F>, Ix2>,
    position_dervs: &ArrayBase<impl Data<Elem = F>, Ix2>,
    volume: F,
) -> Result<Array2<F>> {
    if !(volume.is_finite() && volume > F::zero()) {
        return Err(DescriptorError::InvalidValue(format!(
            "volume should be strictly positive, got {volume}"
        )));
    }
    let n_neighbors = coordinates.nrows();
    if coordinates.ncols() != 3 || position_dervs.nrows() != 3 * n_neighbors {
        return Err(DescriptorError::DimensionMismatch(format!(
            "expected ({n_neighbors}, 3) coordinates and {} derivative rows, got {:?} and {}",
            3 * n_neighbors,
            coordinates.dim(),
            position_dervs.nrows()
        )));
    }

    let mut strain = Array2::zeros((N_STRAIN, position_dervs.ncols()));
    for (k, r) in coordinates.rows().into_iter().enumerate() {
        for (row, &(a, b)) in VOIGT_PAIRS.iter().enumerate() {
            strain
                .row_mut(row)
                .scaled_add(r[b], &position_dervs.slice(s![3 * k + a, ..]));
        }
    }
    Ok(strain / volume)
}
