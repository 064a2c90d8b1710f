use crate::errors::Result;
use crate::squared_exponential::SquaredExponential;
use linfa::Float;
use ndarray::{Array1, Array2, Array3, ArrayBase, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use sgpkern_descriptors::{ClusterDescriptor, DescriptorValues};
use std::fmt;

/// A trait for a compact kernel between atomic environment descriptors used to build
/// the covariance blocks of a sparse GP over energies, forces and stresses.
///
/// Structure blocks follow the label layout of [DescriptorValues]
/// (energy, then 3 force components per atom, then 6 stress components).
///
/// Matrix builds only read the current hyperparameters; they can only be changed
/// through [CompactKernel::set_hyperparameters] which requires exclusive access.
pub trait CompactKernel<F: Float>: Clone + fmt::Display + Sync {
    /// Covariance between two sets of representative environments `(M1, M2)`.
    /// Environments of different kinds do not covary.
    fn envs_envs(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
    ) -> Result<Array2<F>>;

    /// Gradient of `kuu = envs_envs(envs1, envs2)` with respect to the hyperparameters
    /// as a `(n_hyperparameters, M1, M2)` array.
    ///
    /// `kuu` must have been computed with the current hyperparameters, otherwise the
    /// result is meaningless. See [CompactKernel::envs_envs_with_grad].
    fn envs_envs_grad(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
        kuu: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>>;

    /// Both `envs_envs` and its hyperparameters gradient computed from
    /// the same hyperparameters
    fn envs_envs_with_grad(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
    ) -> Result<(Array2<F>, Array3<F>)>;

    /// Covariance between representative environments and the energy, forces and
    /// stress labels of a structure `(M, 1 + 3 * n_atoms + 6)`
    fn envs_struc(
        &self,
        envs: &ClusterDescriptor<F>,
        struc: &DescriptorValues<F>,
    ) -> Result<Array2<F>>;

    /// Gradient of `envs_struc` with respect to the hyperparameters
    /// `(n_hyperparameters, M, 1 + 3 * n_atoms + 6)`
    fn envs_struc_grad(
        &self,
        envs: &ClusterDescriptor<F>,
        struc: &DescriptorValues<F>,
    ) -> Result<Array3<F>>;

    /// Variances of the labels of a structure, ie. the diagonal of `struc_struc(struc, struc)`
    fn self_kernel_struc(&self, struc: &DescriptorValues<F>) -> Array1<F>;

    /// Covariance between the labels of two structures
    /// `(1 + 3 * n_atoms1 + 6, 1 + 3 * n_atoms2 + 6)`
    fn struc_struc(
        &self,
        struc1: &DescriptorValues<F>,
        struc2: &DescriptorValues<F>,
    ) -> Result<Array2<F>>;

    /// Set hyperparameters, previous values are kept on error
    fn set_hyperparameters(&mut self, new_hyps: &[F]) -> Result<()>;

    /// Current hyperparameters
    fn hyperparameters(&self) -> Array1<F>;

    /// Number of hyperparameters
    fn n_hyperparameters(&self) -> usize;
}

/// Available compact kernels
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum Kernel<F: Float> {
    /// Squared exponential kernel over normalized descriptors
    SquaredExponential(SquaredExponential<F>),
}

impl<F: Float> Default for Kernel<F> {
    fn default() -> Kernel<F> {
        Kernel::SquaredExponential(SquaredExponential::default())
    }
}

impl<F: Float> From<SquaredExponential<F>> for Kernel<F> {
    fn from(kernel: SquaredExponential<F>) -> Kernel<F> {
        Kernel::SquaredExponential(kernel)
    }
}

impl<F: Float> fmt::Display for Kernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kernel::SquaredExponential(k) => k.fmt(f),
        }
    }
}

impl<F: Float> CompactKernel<F> for Kernel<F> {
    fn envs_envs(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
    ) -> Result<Array2<F>> {
        match self {
            Kernel::SquaredExponential(k) => k.envs_envs(envs1, envs2),
        }
    }

    fn envs_envs_grad(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
        kuu: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>> {
        match self {
            Kernel::SquaredExponential(k) => k.envs_envs_grad(envs1, envs2, kuu),
        }
    }

    fn envs_envs_with_grad(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
    ) -> Result<(Array2<F>, Array3<F>)> {
        match self {
            Kernel::SquaredExponential(k) => k.envs_envs_with_grad(envs1, envs2),
        }
    }

    fn envs_struc(
        &self,
        envs: &ClusterDescriptor<F>,
        struc: &DescriptorValues<F>,
    ) -> Result<Array2<F>> {
        match self {
            Kernel::SquaredExponential(k) => k.envs_struc(envs, struc),
        }
    }

    fn envs_struc_grad(
        &self,
        envs: &ClusterDescriptor<F>,
        struc: &DescriptorValues<F>,
    ) -> Result<Array3<F>> {
        match self {
            Kernel::SquaredExponential(k) => k.envs_struc_grad(envs, struc),
        }
    }

    fn self_kernel_struc(&self, struc: &DescriptorValues<F>) -> Array1<F> {
        match self {
            Kernel::SquaredExponential(k) => k.self_kernel_struc(struc),
        }
    }

    fn struc_struc(
        &self,
        struc1: &DescriptorValues<F>,
        struc2: &DescriptorValues<F>,
    ) -> Result<Array2<F>> {
        match self {
            Kernel::SquaredExponential(k) => k.struc_struc(struc1, struc2),
        }
    }

    fn set_hyperparameters(&mut self, new_hyps: &[F]) -> Result<()> {
        match self {
            Kernel::SquaredExponential(k) => k.set_hyperparameters(new_hyps),
        }
    }

    fn hyperparameters(&self) -> Array1<F> {
        match self {
            Kernel::SquaredExponential(k) => k.hyperparameters(),
        }
    }

    fn n_hyperparameters(&self) -> usize {
        match self {
            Kernel::SquaredExponential(k) => k.n_hyperparameters(),
        }
    }
}
