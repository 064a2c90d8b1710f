use crate::errors::{KernelError, Result};
use linfa::Float;
use ndarray::{array, Array1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyperparameters of the squared exponential kernel: signal amplitude `sigma`
/// and length scale `ls`, along with their cached squares.
///
/// Values are only set through validated constructors so that `sig2` and `ls2`
/// always match `sigma` and `ls`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Hyperparameters<F: Float> {
    sigma: F,
    ls: F,
    sig2: F,
    ls2: F,
}

impl<F: Float> Default for Hyperparameters<F> {
    fn default() -> Hyperparameters<F> {
        Hyperparameters {
            sigma: F::one(),
            ls: F::one(),
            sig2: F::one(),
            ls2: F::one(),
        }
    }
}

impl<F: Float> Hyperparameters<F> {
    /// Number of hyperparameters
    pub const N_HYPS: usize = 2;

    /// Constructor, fails if `sigma` or `ls` is not strictly positive and finite
    pub fn new(sigma: F, ls: F) -> Result<Hyperparameters<F>> {
        check_positive("sigma", sigma)?;
        check_positive("ls", ls)?;
        Ok(Hyperparameters {
            sigma,
            ls,
            sig2: sigma * sigma,
            ls2: ls * ls,
        })
    }

    /// Constructor from a `[sigma, ls]` slice
    pub fn from_slice(hyps: &[F]) -> Result<Hyperparameters<F>> {
        match hyps {
            [sigma, ls] => Self::new(*sigma, *ls),
            _ => Err(KernelError::DimensionMismatch(format!(
                "expected {} hyperparameters [sigma, ls], got {}",
                Self::N_HYPS,
                hyps.len()
            ))),
        }
    }

    /// Signal amplitude
    pub fn sigma(&self) -> F {
        self.sigma
    }

    /// Length scale
    pub fn ls(&self) -> F {
        self.ls
    }

    /// Signal variance `sigma^2`
    pub fn sig2(&self) -> F {
        self.sig2
    }

    /// Squared length scale `ls^2`
    pub fn ls2(&self) -> F {
        self.ls2
    }

    /// Hyperparameters as the `[sigma, ls]` vector
    pub fn to_array(&self) -> Array1<F> {
        array![self.sigma, self.ls]
    }
}

impl<F: Float> fmt::Display for Hyperparameters<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sigma={}, ls={}", self.sigma, self.ls)
    }
}

fn check_positive<F: Float>(name: &str, value: F) -> Result<()> {
    if value.is_finite() && value > F::zero() {
        Ok(())
    } else {
        Err(KernelError::InvalidHyperparameter(format!(
            "`{name}` should be strictly positive and finite, got {value}"
        )))
    }
}
