//! This library implements compact kernels between local atomic environment descriptors,
//! the building blocks of sparse Gaussian Process (SGP) models of interatomic potentials.
//!
//! A sparse GP over energies, forces and stresses needs three kinds of covariance blocks:
//!
//! * between representative environments (the inducing points): [CompactKernel::envs_envs],
//! * between representative environments and the labels of a training structure:
//!   [CompactKernel::envs_struc],
//! * between the labels of two structures: [CompactKernel::struc_struc] and its diagonal
//!   [CompactKernel::self_kernel_struc].
//!
//! Gradients with respect to the hyperparameters are available for the blocks entering the
//! likelihood optimization ([CompactKernel::envs_envs_grad], [CompactKernel::envs_struc_grad]).
//!
//! The only kernel implemented so far is the [SquaredExponential] kernel, configured
//! either directly or through [SquaredExponentialParams] checked with [linfa::ParamGuard].
//!
//! Descriptor containers come from the `sgpkern-descriptors` crate.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod hyperparameters;
mod kernel;
mod parameters;
pub mod squared_exponential;
mod utils;

#[cfg(test)]
mod test_utils;

pub use errors::*;
pub use hyperparameters::*;
pub use kernel::*;
pub use parameters::*;
pub use squared_exponential::SquaredExponential;
