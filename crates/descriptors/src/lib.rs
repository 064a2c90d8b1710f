//! Containers for the local atomic environment descriptors consumed by compact kernels.
//!
//! Descriptors themselves are computed elsewhere: this crate only holds them together
//! with their derivatives and checks that their shapes are consistent.
//!
//! * [LocalDescriptor] holds one environment: the descriptor vector, its norm, and its
//!   derivatives with respect to the positions of the neighbor atoms and the lattice strain.
//! * [DescriptorValues] holds all the environments of one structure, grouped by kind,
//!   together with optional energy, forces and stress labels.
//! * [ClusterDescriptor] holds representative (inducing) environments grouped by kind.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod cluster;
mod environment;
mod errors;
mod strain;
mod structure;

pub use cluster::*;
pub use environment::*;
pub use errors::*;
pub use strain::*;
pub use structure::*;

/// Number of independent strain components (Voigt order xx, xy, xz, yy, yz, zz)
pub const N_STRAIN: usize = 6;
