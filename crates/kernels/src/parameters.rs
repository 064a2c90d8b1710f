use crate::errors::{KernelError, Result};
use crate::hyperparameters::Hyperparameters;
use linfa::{Float, ParamGuard};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated squared exponential kernel parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponentialValidParams<F: Float> {
    /// Signal amplitude
    pub(crate) sigma: F,
    /// Length scale
    pub(crate) ls: F,
}

impl<F: Float> Default for SquaredExponentialValidParams<F> {
    fn default() -> SquaredExponentialValidParams<F> {
        SquaredExponentialValidParams {
            sigma: F::one(),
            ls: F::one(),
        }
    }
}

impl<F: Float> SquaredExponentialValidParams<F> {
    /// Get signal amplitude
    pub fn sigma(&self) -> F {
        self.sigma
    }

    /// Get length scale
    pub fn ls(&self) -> F {
        self.ls
    }

    pub(crate) fn hyperparameters(&self) -> Result<Hyperparameters<F>> {
        Hyperparameters::new(self.sigma, self.ls)
    }
}

#[derive(Clone, Debug, Default)]
/// The set of parameters that can be specified to build a
/// [squared exponential kernel](crate::SquaredExponential).
pub struct SquaredExponentialParams<F: Float>(SquaredExponentialValidParams<F>);

impl<F: Float> SquaredExponentialParams<F> {
    /// A constructor for squared exponential parameters with `sigma = 1` and `ls = 1`
    pub fn new() -> SquaredExponentialParams<F> {
        Self(SquaredExponentialValidParams::default())
    }

    /// Set signal amplitude `sigma`
    pub fn sigma(mut self, sigma: F) -> Self {
        self.0.sigma = sigma;
        self
    }

    /// Set length scale `ls`
    pub fn ls(mut self, ls: F) -> Self {
        self.0.ls = ls;
        self
    }

    /// Set both from a `[sigma, ls]` slice, extra values are ignored
    pub fn hyperparameters(mut self, hyps: &[F]) -> Self {
        if let [sigma, ls, ..] = hyps {
            self.0.sigma = *sigma;
            self.0.ls = *ls;
        }
        self
    }
}

impl<F: Float> From<SquaredExponentialValidParams<F>> for SquaredExponentialParams<F> {
    fn from(valid: SquaredExponentialValidParams<F>) -> Self {
        SquaredExponentialParams(valid)
    }
}

impl<F: Float> ParamGuard for SquaredExponentialParams<F> {
    type Checked = SquaredExponentialValidParams<F>;
    type Error = KernelError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        self.0.hyperparameters()?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
