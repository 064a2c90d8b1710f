use linfa::Float;
use ndarray::{s, Array1, Array2, ArrayBase, Axis, Data, Ix1};
use rayon::prelude::*;
use sgpkern_descriptors::{DescriptorValues, LocalDescriptor, N_STRAIN};

/// Derivative rows of one local descriptor, position rows then strain rows, each one
/// tagged with its index in the structure label layout.
///
/// Borrows the descriptor for the duration of one kernel evaluation.
pub(crate) struct EnvDervs<'a, F: Float> {
    pub env: &'a LocalDescriptor<F>,
    /// normalized descriptor (zeros when degenerate)
    pub unit: Array1<F>,
    /// (n_rows, n_descriptors) stacked derivatives
    pub dervs: Array2<F>,
    /// label index of each derivative row
    pub labels: Vec<usize>,
    /// dervs . unit
    pub self_proj: Array1<F>,
}

impl<'a, F: Float> EnvDervs<'a, F> {
    pub fn new(env: &'a LocalDescriptor<F>, n_atoms: usize) -> EnvDervs<'a, F> {
        let n_pos = env.position_dervs().nrows();
        let mut dervs = Array2::zeros((n_pos + N_STRAIN, env.n_descriptors()));
        dervs.slice_mut(s![..n_pos, ..]).assign(&env.position_dervs());
        dervs.slice_mut(s![n_pos.., ..]).assign(&env.strain_dervs());

        let labels = env
            .neighbors()
            .iter()
            .flat_map(|&atom| (0..3).map(move |dim| 1 + 3 * atom + dim))
            .chain((0..N_STRAIN).map(|s| 1 + 3 * n_atoms + s))
            .collect();

        let unit = if env.is_degenerate() {
            Array1::zeros(env.n_descriptors())
        } else {
            env.values().mapv(|v| v / env.norm())
        };
        let self_proj = dervs.dot(&unit);
        EnvDervs {
            env,
            unit,
            dervs,
            labels,
            self_proj,
        }
    }

    pub fn norm(&self) -> F {
        self.env.norm()
    }

    pub fn is_degenerate(&self) -> bool {
        self.env.is_degenerate()
    }
}

/// Derivative rows of every local descriptor of a structure (in kind order)
pub(crate) fn structure_dervs<F: Float>(struc: &DescriptorValues<F>) -> Vec<EnvDervs<'_, F>> {
    struc
        .environments()
        .par_iter()
        .map(|env| EnvDervs::new(env, struc.n_atoms()))
        .collect()
}

/// Index ranges of the environments of each kind in a structure
pub(crate) fn kind_ranges<F: Float>(struc: &DescriptorValues<F>) -> Vec<std::ops::Range<usize>> {
    struc
        .offsets()
        .iter()
        .zip(struc.counts())
        .map(|(&start, &count)| start..start + count)
        .collect()
}

/// (n, m) outer product of vectors a (n,) and b (m,)
pub(crate) fn outer<F: Float>(
    a: &ArrayBase<impl Data<Elem = F>, Ix1>,
    b: &ArrayBase<impl Data<Elem = F>, Ix1>,
) -> Array2<F> {
    a.view()
        .insert_axis(Axis(1))
        .dot(&b.view().insert_axis(Axis(0)))
}
