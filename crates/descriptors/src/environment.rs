use crate::errors::{DescriptorError, Result};
use crate::N_STRAIN;
use linfa::Float;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Descriptor of one local atomic environment with its derivatives.
///
/// `position_dervs` is a `(3 * n_neighbors, n_descriptors)` matrix where row `3k + a`
/// holds the derivative of the descriptor with respect to the component `a` of the
/// position of the atom `neighbors[k]`.
/// `strain_dervs` is a `(6, n_descriptors)` matrix of derivatives with respect to the
/// strain components in Voigt order (xx, xy, xz, yy, yz, zz).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct LocalDescriptor<F: Float> {
    kind: usize,
    atom: usize,
    values: Array1<F>,
    norm: F,
    neighbors: Vec<usize>,
    position_dervs: Array2<F>,
    strain_dervs: Array2<F>,
}

impl<F: Float> LocalDescriptor<F> {
    /// Constructor, checks derivative shapes against the descriptor length and the
    /// number of neighbors.
    pub fn new(
        kind: usize,
        atom: usize,
        values: Array1<F>,
        neighbors: Vec<usize>,
        position_dervs: Array2<F>,
        strain_dervs: Array2<F>,
    ) -> Result<LocalDescriptor<F>> {
        let n_desc = values.len();
        if position_dervs.dim() != (3 * neighbors.len(), n_desc) {
            return Err(DescriptorError::DimensionMismatch(format!(
                "position derivatives of atom {atom} should be ({}, {n_desc}), got {:?}",
                3 * neighbors.len(),
                position_dervs.dim()
            )));
        }
        if strain_dervs.dim() != (N_STRAIN, n_desc) {
            return Err(DescriptorError::DimensionMismatch(format!(
                "strain derivatives of atom {atom} should be ({N_STRAIN}, {n_desc}), got {:?}",
                strain_dervs.dim()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DescriptorError::InvalidValue(format!(
                "descriptor of atom {atom} has non finite values"
            )));
        }
        let norm = values.dot(&values).sqrt();
        Ok(LocalDescriptor {
            kind,
            atom,
            values,
            norm,
            neighbors,
            position_dervs,
            strain_dervs,
        })
    }

    /// Environment without any position or strain dependency,
    /// only contributing to energy covariances.
    pub fn without_derivatives(
        kind: usize,
        atom: usize,
        values: Array1<F>,
    ) -> Result<LocalDescriptor<F>> {
        let n_desc = values.len();
        Self::new(
            kind,
            atom,
            values,
            vec![],
            Array2::zeros((0, n_desc)),
            Array2::zeros((N_STRAIN, n_desc)),
        )
    }

    /// Kind (species) of the central atom
    pub fn kind(&self) -> usize {
        self.kind
    }

    /// Index of the central atom in its structure
    pub fn atom(&self) -> usize {
        self.atom
    }

    /// Descriptor vector
    pub fn values(&self) -> ArrayView1<F> {
        self.values.view()
    }

    /// Euclidean norm of the descriptor vector
    pub fn norm(&self) -> F {
        self.norm
    }

    /// Descriptor length
    pub fn n_descriptors(&self) -> usize {
        self.values.len()
    }

    /// Indices of the atoms the descriptor depends on
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    /// Derivatives with respect to neighbor positions `(3 * n_neighbors, n_descriptors)`
    pub fn position_dervs(&self) -> ArrayView2<F> {
        self.position_dervs.view()
    }

    /// Derivatives with respect to strain `(6, n_descriptors)`
    pub fn strain_dervs(&self) -> ArrayView2<F> {
        self.strain_dervs.view()
    }

    /// A zero norm environment (eg. an isolated atom) carries no kernel signal
    pub fn is_degenerate(&self) -> bool {
        self.norm == F::zero()
    }
}
