use crate::errors::{DescriptorError, Result};
use crate::structure::{cumulative, DescriptorValues};
use linfa::Float;
use ndarray::{aview0, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Representative environments grouped by kind.
///
/// For each kind, descriptors are stored as a `(n_clusters_of_kind, n_descriptors)` matrix
/// along with their norms. The global ordering of clusters is kind-major:
/// the `i`-th cluster of kind `s` has the global index `offsets()[s] + i`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct ClusterDescriptor<F: Float> {
    n_descriptors: usize,
    descriptors: Vec<Array2<F>>,
    norms: Vec<Array1<F>>,
}

impl<F: Float> ClusterDescriptor<F> {
    /// Empty container for descriptors of length `n_descriptors` over `n_kinds` kinds
    pub fn new(n_descriptors: usize, n_kinds: usize) -> ClusterDescriptor<F> {
        ClusterDescriptor {
            n_descriptors,
            descriptors: vec![Array2::zeros((0, n_descriptors)); n_kinds],
            norms: vec![Array1::zeros(0); n_kinds],
        }
    }

    /// Add a representative environment, its norm is computed from `values`
    pub fn add_cluster(
        &mut self,
        kind: usize,
        values: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<()> {
        let norm = values.dot(values).sqrt();
        self.add_cluster_with_norm(kind, values, norm)
    }

    /// Add a representative environment with a precomputed norm
    pub fn add_cluster_with_norm(
        &mut self,
        kind: usize,
        values: &ArrayBase<impl Data<Elem = F>, Ix1>,
        norm: F,
    ) -> Result<()> {
        if kind >= self.n_kinds() {
            return Err(DescriptorError::InvalidValue(format!(
                "kind {kind} out of range (n_kinds = {})",
                self.n_kinds()
            )));
        }
        if values.len() != self.n_descriptors {
            return Err(DescriptorError::DimensionMismatch(format!(
                "cluster descriptor has length {}, expected {}",
                values.len(),
                self.n_descriptors
            )));
        }
        if !(norm.is_finite() && norm >= F::zero()) {
            return Err(DescriptorError::InvalidValue(format!(
                "cluster norm should be finite and positive, got {norm}"
            )));
        }
        self.descriptors[kind]
            .push_row(values.view())
            .map_err(|e| DescriptorError::DimensionMismatch(e.to_string()))?;
        self.norms[kind]
            .push(Axis(0), aview0(&norm))
            .map_err(|e| DescriptorError::DimensionMismatch(e.to_string()))?;
        Ok(())
    }

    /// Select environments of a structure as representatives.
    ///
    /// `indices_by_kind[s]` lists indices into
    /// [`DescriptorValues::environments_of_kind(s)`](DescriptorValues::environments_of_kind).
    pub fn add_clusters(
        &mut self,
        struc: &DescriptorValues<F>,
        indices_by_kind: &[Vec<usize>],
    ) -> Result<()> {
        if struc.n_descriptors() != self.n_descriptors {
            return Err(DescriptorError::DimensionMismatch(format!(
                "structure descriptors have length {}, expected {}",
                struc.n_descriptors(),
                self.n_descriptors
            )));
        }
        // Check every index before adding anything
        for (kind, indices) in indices_by_kind.iter().enumerate() {
            let n_envs = struc.environments_of_kind(kind).len();
            if let Some(i) = indices.iter().find(|&&i| i >= n_envs) {
                return Err(DescriptorError::InvalidValue(format!(
                    "environment {i} of kind {kind} out of range ({n_envs} available)"
                )));
            }
        }
        for (kind, indices) in indices_by_kind.iter().enumerate() {
            let envs = struc.environments_of_kind(kind);
            for &i in indices {
                self.add_cluster_with_norm(kind, &envs[i].values(), envs[i].norm())?;
            }
        }
        Ok(())
    }

    /// Select all environments of a structure as representatives
    pub fn add_all_clusters(&mut self, struc: &DescriptorValues<F>) -> Result<()> {
        let indices: Vec<Vec<usize>> = struc.counts().iter().map(|&c| (0..c).collect()).collect();
        self.add_clusters(struc, &indices)
    }

    /// Total number of representative environments
    pub fn n_clusters(&self) -> usize {
        self.norms.iter().map(|n| n.len()).sum()
    }

    /// Number of kinds
    pub fn n_kinds(&self) -> usize {
        self.descriptors.len()
    }

    /// Descriptor length
    pub fn n_descriptors(&self) -> usize {
        self.n_descriptors
    }

    /// Number of representative environments per kind
    pub fn counts(&self) -> Vec<usize> {
        self.norms.iter().map(|n| n.len()).collect()
    }

    /// Global index of the first representative environment of each kind
    pub fn offsets(&self) -> Vec<usize> {
        cumulative(&self.counts())
    }

    /// Descriptors of the given kind `(n_clusters_of_kind, n_descriptors)`,
    /// empty if kind is out of range
    pub fn descriptors(&self, kind: usize) -> ArrayView2<F> {
        match self.descriptors.get(kind) {
            Some(d) => d.view(),
            None => ArrayView2::from_shape((0, self.n_descriptors), &[])
                .unwrap_or_else(|_| ndarray::aview2::<F, [F; 0]>(&[])),
        }
    }

    /// Norms of the descriptors of the given kind, empty if kind is out of range
    pub fn norms(&self, kind: usize) -> ArrayView1<F> {
        match self.norms.get(kind) {
            Some(n) => n.view(),
            None => ArrayView1::from(&[] as &[F]),
        }
    }

    /// Number of zero norm representative environments
    pub fn n_degenerate(&self) -> usize {
        self.norms
            .iter()
            .map(|n| n.iter().filter(|&&v| v == F::zero()).count())
            .sum()
    }

    /// Kind, descriptor and norm of the representative environment at global index `i`.
    /// Returns `None` when out of range.
    pub fn entry(&self, i: usize) -> Option<(usize, ArrayView1<F>, F)> {
        let mut start = 0;
        for (kind, norms) in self.norms.iter().enumerate() {
            if i < start + norms.len() {
                let local = i - start;
                return Some((kind, self.descriptors[kind].row(local), norms[local]));
            }
            start += norms.len();
        }
        None
    }
}
