//! Compact kernels between local atomic environment descriptors for sparse
//! Gaussian Process models of interatomic energies, forces and stresses.
//!
//! This crate gathers the sub-crates of the project:
//!
//! * [descriptors]: containers for the descriptors of structures ([DescriptorValues])
//!   and for representative environments ([ClusterDescriptor]),
//! * [kernels]: the [CompactKernel] trait and the [SquaredExponential] kernel building
//!   the covariance blocks needed by a sparse GP.
//!
//! # Example
//!
//! ```
//! use sgpkern::{ClusterDescriptor, CompactKernel, DescriptorValues, LocalDescriptor, SquaredExponential};
//! use ndarray::array;
//!
//! let struc = DescriptorValues::new(
//!     2,
//!     2,
//!     1,
//!     vec![
//!         LocalDescriptor::without_derivatives(0, 0, array![1., 0.]).unwrap(),
//!         LocalDescriptor::without_derivatives(0, 1, array![0., 1.]).unwrap(),
//!     ],
//! )
//! .unwrap();
//! let mut envs = ClusterDescriptor::new(2, 1);
//! envs.add_all_clusters(&struc).unwrap();
//!
//! let kernel = SquaredExponential::new(1., 1.).unwrap();
//! let kuu = kernel.envs_envs(&envs, &envs).unwrap();
//! let kuf = kernel.envs_struc(&envs, &struc).unwrap();
//! assert_eq!(kuu.dim(), (2, 2));
//! assert_eq!(kuf.dim(), (2, 1 + 3 * 2 + 6));
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub use sgpkern_descriptors as descriptors;
pub use sgpkern_kernels as kernels;

pub use sgpkern_descriptors::{ClusterDescriptor, DescriptorValues, LocalDescriptor};
pub use sgpkern_kernels::{
    CompactKernel, Hyperparameters, Kernel, KernelError, SquaredExponential,
    SquaredExponentialParams,
};
