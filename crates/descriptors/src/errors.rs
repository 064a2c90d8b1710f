use thiserror::Error;

/// A result type for descriptor containers
pub type Result<T> = std::result::Result<T, DescriptorError>;

/// An error when building a [`LocalDescriptor`](crate::LocalDescriptor), a
/// [`DescriptorValues`](crate::DescriptorValues) or a [`ClusterDescriptor`](crate::ClusterDescriptor)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// When array shapes are inconsistent with the declared sizes
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValue(String),
}
