use crate::environment::LocalDescriptor;
use crate::errors::{DescriptorError, Result};
use crate::N_STRAIN;
use linfa::Float;
use log::debug;
use ndarray::{Array1, ArrayView1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Full descriptor data of one structure.
///
/// Local descriptors are stored sorted by kind so that the environments of a given
/// kind form a contiguous slice (see [`DescriptorValues::environments_of_kind`]).
///
/// Covariance blocks built against a structure follow the label layout
///
/// ```text
/// [E, F_0x, F_0y, F_0z, ..., F_(A-1)z, S_xx, S_xy, S_xz, S_yy, S_yz, S_zz]
/// ```
///
/// of length `1 + 3 * n_atoms + 6`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct DescriptorValues<F: Float> {
    n_atoms: usize,
    n_descriptors: usize,
    n_kinds: usize,
    environments: Vec<LocalDescriptor<F>>,
    counts: Vec<usize>,
    offsets: Vec<usize>,
    volume: Option<F>,
    energy: Option<F>,
    forces: Option<Array1<F>>,
    stress: Option<Array1<F>>,
}

impl<F: Float> DescriptorValues<F> {
    /// Constructor given the local descriptors of a structure of `n_atoms` atoms.
    ///
    /// Every environment is checked against `n_descriptors`, `n_kinds` and `n_atoms`
    /// then environments are sorted (stable) by kind.
    pub fn new(
        n_atoms: usize,
        n_descriptors: usize,
        n_kinds: usize,
        mut environments: Vec<LocalDescriptor<F>>,
    ) -> Result<DescriptorValues<F>> {
        for env in environments.iter() {
            if env.n_descriptors() != n_descriptors {
                return Err(DescriptorError::DimensionMismatch(format!(
                    "descriptor of atom {} has length {}, expected {n_descriptors}",
                    env.atom(),
                    env.n_descriptors()
                )));
            }
            if env.kind() >= n_kinds {
                return Err(DescriptorError::InvalidValue(format!(
                    "kind {} of atom {} out of range (n_kinds = {n_kinds})",
                    env.kind(),
                    env.atom()
                )));
            }
            if let Some(nb) = env.neighbors().iter().find(|&&nb| nb >= n_atoms) {
                return Err(DescriptorError::DimensionMismatch(format!(
                    "neighbor {nb} of atom {} out of range (n_atoms = {n_atoms})",
                    env.atom()
                )));
            }
        }
        environments.sort_by_key(|env| env.kind());

        let mut counts = vec![0; n_kinds];
        environments.iter().for_each(|env| counts[env.kind()] += 1);
        let offsets = cumulative(&counts);

        let values = DescriptorValues {
            n_atoms,
            n_descriptors,
            n_kinds,
            environments,
            counts,
            offsets,
            volume: None,
            energy: None,
            forces: None,
            stress: None,
        };
        if values.n_degenerate() > 0 {
            debug!(
                "structure with {} degenerate environment(s) out of {}",
                values.n_degenerate(),
                values.n_environments()
            );
        }
        Ok(values)
    }

    /// Set cell volume.
    ///
    /// Kernels never read it: strain derivatives already carry the `1/V` factor (see
    /// [strain_derivatives](crate::strain_derivatives)). It is kept for the solver, eg. to
    /// convert stress labels.
    pub fn with_volume(mut self, volume: F) -> Result<Self> {
        if !(volume.is_finite() && volume > F::zero()) {
            return Err(DescriptorError::InvalidValue(format!(
                "volume should be strictly positive, got {volume}"
            )));
        }
        self.volume = Some(volume);
        Ok(self)
    }

    /// Set total energy label
    pub fn with_energy(mut self, energy: F) -> Self {
        self.energy = Some(energy);
        self
    }

    /// Set forces label as a `3 * n_atoms` vector (x, y, z per atom)
    pub fn with_forces(mut self, forces: Array1<F>) -> Result<Self> {
        if forces.len() != 3 * self.n_atoms {
            return Err(DescriptorError::DimensionMismatch(format!(
                "forces should have length {}, got {}",
                3 * self.n_atoms,
                forces.len()
            )));
        }
        self.forces = Some(forces);
        Ok(self)
    }

    /// Set stress label as a 6 vector in Voigt order
    pub fn with_stress(mut self, stress: Array1<F>) -> Result<Self> {
        if stress.len() != N_STRAIN {
            return Err(DescriptorError::DimensionMismatch(format!(
                "stress should have length {N_STRAIN}, got {}",
                stress.len()
            )));
        }
        self.stress = Some(stress);
        Ok(self)
    }

    /// Number of atoms
    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    /// Descriptor length
    pub fn n_descriptors(&self) -> usize {
        self.n_descriptors
    }

    /// Number of kinds
    pub fn n_kinds(&self) -> usize {
        self.n_kinds
    }

    /// Number of local descriptors
    pub fn n_environments(&self) -> usize {
        self.environments.len()
    }

    /// Local descriptors sorted by kind
    pub fn environments(&self) -> &[LocalDescriptor<F>] {
        &self.environments
    }

    /// Local descriptors of the given kind, empty if kind is out of range
    pub fn environments_of_kind(&self, kind: usize) -> &[LocalDescriptor<F>] {
        if kind >= self.n_kinds {
            return &[];
        }
        &self.environments[self.offsets[kind]..self.offsets[kind] + self.counts[kind]]
    }

    /// Number of local descriptors per kind
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Index of the first local descriptor of each kind
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of zero norm local descriptors
    pub fn n_degenerate(&self) -> usize {
        self.environments
            .iter()
            .filter(|env| env.is_degenerate())
            .count()
    }

    /// Cell volume if any, not used by kernel computations
    pub fn volume(&self) -> Option<F> {
        self.volume
    }

    /// Energy label if any
    pub fn energy(&self) -> Option<F> {
        self.energy
    }

    /// Forces label if any
    pub fn forces(&self) -> Option<ArrayView1<F>> {
        self.forces.as_ref().map(|f| f.view())
    }

    /// Stress label if any
    pub fn stress(&self) -> Option<ArrayView1<F>> {
        self.stress.as_ref().map(|s| s.view())
    }

    /// Size of the label layout: `1 + 3 * n_atoms + 6`
    pub fn n_labels(&self) -> usize {
        1 + 3 * self.n_atoms + N_STRAIN
    }

    /// Label index of the force component `dim` of `atom`
    pub fn force_index(&self, atom: usize, dim: usize) -> usize {
        1 + 3 * atom + dim
    }

    /// Label index of the strain component `s` (Voigt order)
    pub fn stress_index(&self, s: usize) -> usize {
        1 + 3 * self.n_atoms + s
    }

    /// Mask over the label layout telling which labels are available
    pub fn label_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.n_labels()];
        mask[0] = self.energy.is_some();
        if self.forces.is_some() {
            mask[1..1 + 3 * self.n_atoms].iter_mut().for_each(|m| *m = true);
        }
        if self.stress.is_some() {
            mask[1 + 3 * self.n_atoms..].iter_mut().for_each(|m| *m = true);
        }
        mask
    }

    /// Available labels following the label layout order, absent ones being skipped.
    /// See [`DescriptorValues::label_mask`].
    pub fn labels(&self) -> Array1<F> {
        let mut labels = Vec::with_capacity(self.n_labels());
        if let Some(e) = self.energy {
            labels.push(e);
        }
        if let Some(f) = &self.forces {
            labels.extend(f.iter().copied());
        }
        if let Some(s) = &self.stress {
            labels.extend(s.iter().copied());
        }
        Array1::from_vec(labels)
    }
}

pub(crate) fn cumulative(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |acc, &c| {
            let start = *acc;
            *acc += c;
            Some(start)
        })
        .collect()
}
