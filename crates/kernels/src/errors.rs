use sgpkern_descriptors::DescriptorError;
use thiserror::Error;

/// A result type for compact kernel computations
pub type Result<T> = std::result::Result<T, KernelError>;

/// An error when using a [`CompactKernel`](crate::CompactKernel)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// When a hyperparameter is non positive or non finite
    #[error("Invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),
    /// When paired inputs have inconsistent shapes
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When descriptor containers cannot be built
    #[error(transparent)]
    DescriptorError(#[from] DescriptorError),
}
