//! Squared exponential kernel over normalized descriptors
//!
//! ```text
//!   k(u, v) = sigma^2 exp((c - 1) / ls^2)   with   c = u.v / (|u| |v|)
//! ```
//!
//! Structure covariances are sums of local kernels over pairs of environments of the same
//! kind; force and stress covariances are obtained by chain rule through the descriptor
//! derivatives with respect to atomic positions and strain.

use crate::errors::{KernelError, Result};
use crate::hyperparameters::Hyperparameters;
use crate::kernel::CompactKernel;
use crate::parameters::{SquaredExponentialParams, SquaredExponentialValidParams};
use crate::utils::{kind_ranges, outer, structure_dervs, EnvDervs};
use linfa::Float;
use log::debug;
use ndarray::{s, Array1, Array2, Array3, ArrayBase, Data, Ix2, Zip};
use rayon::prelude::*;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use sgpkern_descriptors::{ClusterDescriptor, DescriptorValues};
use std::fmt;
use std::time::Instant;

/// Squared exponential compact kernel
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SquaredExponential<F: Float> {
    hyps: Hyperparameters<F>,
}

impl<F: Float> SquaredExponential<F> {
    /// Kernel parameters constructor
    pub fn params() -> SquaredExponentialParams<F> {
        SquaredExponentialParams::new()
    }

    /// Constructor given signal amplitude and length scale
    pub fn new(sigma: F, ls: F) -> Result<SquaredExponential<F>> {
        Ok(SquaredExponential {
            hyps: Hyperparameters::new(sigma, ls)?,
        })
    }

    /// Current hyperparameters snapshot
    pub fn hyps(&self) -> Hyperparameters<F> {
        self.hyps
    }
}

impl<F: Float> TryFrom<SquaredExponentialValidParams<F>> for SquaredExponential<F> {
    type Error = KernelError;

    fn try_from(params: SquaredExponentialValidParams<F>) -> Result<Self> {
        Ok(SquaredExponential {
            hyps: params.hyperparameters()?,
        })
    }
}

impl<F: Float> fmt::Display for SquaredExponential<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential({})", self.hyps)
    }
}

impl<F: Float> CompactKernel<F> for SquaredExponential<F> {
    fn envs_envs(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
    ) -> Result<Array2<F>> {
        let now = Instant::now();
        debug_degenerate("envs_envs", envs1);
        debug_degenerate("envs_envs", envs2);
        let kuu = envs_envs(&self.hyps, envs1, envs2)?;
        debug!(
            "envs_envs {:?} in {:?} ms",
            kuu.dim(),
            now.elapsed().as_millis()
        );
        Ok(kuu)
    }

    fn envs_envs_grad(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
        kuu: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Array3<F>> {
        envs_envs_grad(&self.hyps, envs1, envs2, kuu)
    }

    fn envs_envs_with_grad(
        &self,
        envs1: &ClusterDescriptor<F>,
        envs2: &ClusterDescriptor<F>,
    ) -> Result<(Array2<F>, Array3<F>)> {
        let hyps = self.hyps;
        debug_degenerate("envs_envs_with_grad", envs1);
        debug_degenerate("envs_envs_with_grad", envs2);
        let kuu = envs_envs(&hyps, envs1, envs2)?;
        let grad = envs_envs_grad(&hyps, envs1, envs2, &kuu)?;
        Ok((kuu, grad))
    }

    fn envs_struc(
        &self,
        envs: &ClusterDescriptor<F>,
        struc: &DescriptorValues<F>,
    ) -> Result<Array2<F>> {
        let now = Instant::now();
        debug_degenerate("envs_struc", envs);
        let (kuf, _) = envs_struc(&self.hyps, envs, struc, false)?;
        debug!(
            "envs_struc {:?} in {:?} ms",
            kuf.dim(),
            now.elapsed().as_millis()
        );
        Ok(kuf)
    }

    fn envs_struc_grad(
        &self,
        envs: &ClusterDescriptor<F>,
        struc: &DescriptorValues<F>,
    ) -> Result<Array3<F>> {
        let hyps = self.hyps;
        debug_degenerate("envs_struc_grad", envs);
        let (kuf, dls) = envs_struc(&hyps, envs, struc, true)?;
        let mut grad = Array3::zeros((Hyperparameters::<F>::N_HYPS, kuf.nrows(), kuf.ncols()));
        grad.slice_mut(s![0, .., ..])
            .assign(&(kuf * (F::cast(2.) / hyps.sigma())));
        grad.slice_mut(s![1, .., ..]).assign(&dls);
        Ok(grad)
    }

    fn self_kernel_struc(&self, struc: &DescriptorValues<F>) -> Array1<F> {
        let now = Instant::now();
        let res = self_kernel_struc(&self.hyps, struc);
        debug!(
            "self_kernel_struc ({}) in {:?} ms",
            res.len(),
            now.elapsed().as_millis()
        );
        res
    }

    fn struc_struc(
        &self,
        struc1: &DescriptorValues<F>,
        struc2: &DescriptorValues<F>,
    ) -> Result<Array2<F>> {
        let now = Instant::now();
        let res = struc_struc(&self.hyps, struc1, struc2)?;
        debug!(
            "struc_struc {:?} in {:?} ms",
            res.dim(),
            now.elapsed().as_millis()
        );
        Ok(res)
    }

    fn set_hyperparameters(&mut self, new_hyps: &[F]) -> Result<()> {
        self.hyps = Hyperparameters::from_slice(new_hyps)?;
        debug!("SquaredExponential hyperparameters set to {}", self.hyps);
        Ok(())
    }

    fn hyperparameters(&self) -> Array1<F> {
        self.hyps.to_array()
    }

    fn n_hyperparameters(&self) -> usize {
        Hyperparameters::<F>::N_HYPS
    }
}

/// Kernel value given the cosine similarity `c`
fn value<F: Float>(hyps: &Hyperparameters<F>, c: F) -> F {
    hyps.sig2() * ((c - F::one()) / hyps.ls2()).exp()
}

/// `d(value)/d(ls) / value`
fn ls_factor<F: Float>(hyps: &Hyperparameters<F>, c: F) -> F {
    (F::one() - c) * F::cast(2.) / (hyps.ls() * hyps.ls2())
}

fn cosine<F: Float>(dot: F, norm1: F, norm2: F) -> Option<F> {
    if norm1 == F::zero() || norm2 == F::zero() {
        None
    } else {
        Some(dot / (norm1 * norm2))
    }
}

/// Zero norm representatives contribute nothing, report them
fn debug_degenerate<F: Float>(what: &str, envs: &ClusterDescriptor<F>) {
    let n_degenerate = envs.n_degenerate();
    if n_degenerate > 0 {
        debug!(
            "{what}: {n_degenerate} degenerate representative environment(s) out of {}",
            envs.n_clusters()
        );
    }
}

fn check_lengths(what: &str, n1: usize, n2: usize) -> Result<()> {
    if n1 != n2 {
        return Err(KernelError::DimensionMismatch(format!(
            "{what}: descriptor lengths differ ({n1} vs {n2})"
        )));
    }
    Ok(())
}

/// Applies `f(kind, o1, o2, dots)` on each same-kind block where `dots` holds the
/// dot products between the descriptors of that kind and `(o1, o2)` is the block offset.
fn for_each_kind_block<F: Float>(
    envs1: &ClusterDescriptor<F>,
    envs2: &ClusterDescriptor<F>,
    mut f: impl FnMut(usize, usize, usize, Array2<F>),
) {
    let (off1, off2) = (envs1.offsets(), envs2.offsets());
    for kind in 0..envs1.n_kinds().min(envs2.n_kinds()) {
        let dots = envs1.descriptors(kind).dot(&envs2.descriptors(kind).t());
        f(kind, off1[kind], off2[kind], dots);
    }
}

fn envs_envs<F: Float>(
    hyps: &Hyperparameters<F>,
    envs1: &ClusterDescriptor<F>,
    envs2: &ClusterDescriptor<F>,
) -> Result<Array2<F>> {
    check_lengths("envs_envs", envs1.n_descriptors(), envs2.n_descriptors())?;

    let mut kuu = Array2::zeros((envs1.n_clusters(), envs2.n_clusters()));
    for_each_kind_block(envs1, envs2, |kind, o1, o2, dots| {
        let (norms1, norms2) = (envs1.norms(kind), envs2.norms(kind));
        let mut block = kuu.slice_mut(s![o1..o1 + dots.nrows(), o2..o2 + dots.ncols()]);
        Zip::indexed(&mut block)
            .and(&dots)
            .par_for_each(|(i, j), k, &dot| {
                *k = cosine(dot, norms1[i], norms2[j])
                    .map(|c| value(hyps, c))
                    .unwrap_or_else(F::zero);
            });
    });
    Ok(kuu)
}

/// Gradients of `kuu` with respect to `[sigma, ls]` as a `(2, M1, M2)` array.
///
/// `kuu` has to be computed with the same hyperparameters.
fn envs_envs_grad<F: Float>(
    hyps: &Hyperparameters<F>,
    envs1: &ClusterDescriptor<F>,
    envs2: &ClusterDescriptor<F>,
    kuu: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array3<F>> {
    check_lengths("envs_envs_grad", envs1.n_descriptors(), envs2.n_descriptors())?;
    let (m1, m2) = (envs1.n_clusters(), envs2.n_clusters());
    if kuu.dim() != (m1, m2) {
        return Err(KernelError::DimensionMismatch(format!(
            "envs_envs_grad: expected ({m1}, {m2}) kuu matrix, got {:?}",
            kuu.dim()
        )));
    }

    let sigma_factor = F::cast(2.) / hyps.sigma();
    let mut grad = Array3::zeros((Hyperparameters::<F>::N_HYPS, m1, m2));
    for_each_kind_block(envs1, envs2, |kind, o1, o2, dots| {
        let (norms1, norms2) = (envs1.norms(kind), envs2.norms(kind));
        let rows = o1..o1 + dots.nrows();
        let cols = o2..o2 + dots.ncols();
        let (mut g_sigma, mut g_ls) = grad.multi_slice_mut((
            s![0, rows.clone(), cols.clone()],
            s![1, rows.clone(), cols.clone()],
        ));
        Zip::indexed(&mut g_sigma)
            .and(&mut g_ls)
            .and(kuu.slice(s![rows, cols]))
            .and(&dots)
            .par_for_each(|(i, j), gs, gl, &k, &dot| {
                if let Some(c) = cosine(dot, norms1[i], norms2[j]) {
                    *gs = k * sigma_factor;
                    *gl = k * ls_factor(hyps, c);
                }
            });
    });
    Ok(grad)
}

/// Kernel between representative environments and a structure, along with its
/// derivative with respect to `ls` when `with_grad` is set.
fn envs_struc<F: Float>(
    hyps: &Hyperparameters<F>,
    envs: &ClusterDescriptor<F>,
    struc: &DescriptorValues<F>,
    with_grad: bool,
) -> Result<(Array2<F>, Array2<F>)> {
    check_lengths("envs_struc", envs.n_descriptors(), struc.n_descriptors())?;

    let terms = structure_dervs(struc);
    let ranges = kind_ranges(struc);
    let n_clusters = envs.n_clusters();
    let n_labels = struc.n_labels();
    let two_over_ls = F::cast(2.) / hyps.ls();

    let mut kuf = Array2::zeros((n_clusters, n_labels));
    let mut dls = Array2::zeros((n_clusters, if with_grad { n_labels } else { 0 }));
    Zip::indexed(kuf.rows_mut())
        .and(dls.rows_mut())
        .par_for_each(|i, mut row, mut drow| {
            let (kind, u, norm_u) = match envs.entry(i) {
                Some(entry) if entry.2 != F::zero() && entry.0 < ranges.len() => entry,
                _ => return,
            };
            let u_hat = u.mapv(|v| v / norm_u);
            for b in terms[ranges[kind].clone()].iter() {
                let Some(c) = cosine(u_hat.dot(&b.env.values()), F::one(), b.norm()) else {
                    continue;
                };
                let k = value(hyps, c);
                // (d(desc)/d(r, eps)) . dc/d(desc)
                let b_g = (b.dervs.dot(&u_hat) - &b.self_proj * c) / b.norm();
                let scale = -k / hyps.ls2();
                row[0] += k;
                for (q, &label) in b.labels.iter().enumerate() {
                    row[label] += scale * b_g[q];
                }
                if with_grad {
                    let e = ls_factor(hyps, c);
                    drow[0] += k * e;
                    let dscale = scale * (e - two_over_ls);
                    for (q, &label) in b.labels.iter().enumerate() {
                        drow[label] += dscale * b_g[q];
                    }
                }
            }
        });
    Ok((kuf, dls))
}

/// Value and derivative blocks of the kernel between two local descriptors
struct PairBlock<F: Float> {
    value: F,
    /// energy(a) / derivative rows of b
    e_b: Array1<F>,
    /// derivative rows of a / energy(b)
    a_e: Array1<F>,
    /// derivative rows of a / derivative rows of b
    a_b: Array2<F>,
}

fn pair_block<F: Float>(
    hyps: &Hyperparameters<F>,
    a: &EnvDervs<F>,
    b: &EnvDervs<F>,
) -> Option<PairBlock<F>> {
    if a.is_degenerate() || b.is_degenerate() {
        return None;
    }
    let (n1, n2) = (a.norm(), b.norm());
    let c = a.unit.dot(&b.unit);
    let k = value(hyps, c);
    let k_ls2 = k / hyps.ls2();

    let a_cross = a.dervs.dot(&b.unit);
    let b_cross = b.dervs.dot(&a.unit);
    // projections of the cosine gradients on derivative rows
    let a_g = (&a_cross - &(&a.self_proj * c)) / n1;
    let b_g = (&b_cross - &(&b.self_proj * c)) / n2;

    // hessian of the cosine: (I - a^ a^T - b^ b^T + c a^ b^T) / (n1 n2)
    let mut a_b = a.dervs.dot(&b.dervs.t());
    a_b -= &outer(&a.self_proj, &b_cross);
    a_b -= &outer(&a_cross, &b.self_proj);
    a_b.scaled_add(c, &outer(&a.self_proj, &b.self_proj));
    a_b *= k_ls2 / (n1 * n2);
    a_b.scaled_add(k_ls2 / hyps.ls2(), &outer(&a_g, &b_g));

    Some(PairBlock {
        value: k,
        e_b: b_g * (-k_ls2),
        a_e: a_g * (-k_ls2),
        a_b,
    })
}

fn struc_struc<F: Float>(
    hyps: &Hyperparameters<F>,
    struc1: &DescriptorValues<F>,
    struc2: &DescriptorValues<F>,
) -> Result<Array2<F>> {
    check_lengths("struc_struc", struc1.n_descriptors(), struc2.n_descriptors())?;

    let terms1 = structure_dervs(struc1);
    let terms2 = structure_dervs(struc2);
    let ranges2 = kind_ranges(struc2);
    let shape = (struc1.n_labels(), struc2.n_labels());

    let kern = terms1
        .par_iter()
        .fold(
            || Array2::<F>::zeros(shape),
            |mut acc, a| {
                let Some(range) = ranges2.get(a.env.kind()) else {
                    return acc;
                };
                for b in terms2[range.clone()].iter() {
                    if let Some(block) = pair_block(hyps, a, b) {
                        acc[[0, 0]] += block.value;
                        for (q, &lq) in b.labels.iter().enumerate() {
                            acc[[0, lq]] += block.e_b[q];
                        }
                        for (p, &lp) in a.labels.iter().enumerate() {
                            acc[[lp, 0]] += block.a_e[p];
                            for (q, &lq) in b.labels.iter().enumerate() {
                                acc[[lp, lq]] += block.a_b[[p, q]];
                            }
                        }
                    }
                }
                acc
            },
        )
        .reduce(|| Array2::zeros(shape), |k1, k2| k1 + k2);
    Ok(kern)
}

fn self_kernel_struc<F: Float>(
    hyps: &Hyperparameters<F>,
    struc: &DescriptorValues<F>,
) -> Array1<F> {
    let terms = structure_dervs(struc);
    let ranges = kind_ranges(struc);
    let n_labels = struc.n_labels();

    terms
        .par_iter()
        .fold(
            || Array1::<F>::zeros(n_labels),
            |mut acc, a| {
                for b in terms[ranges[a.env.kind()].clone()].iter() {
                    if let Some(block) = pair_block(hyps, a, b) {
                        acc[0] += block.value;
                        for (p, &lp) in a.labels.iter().enumerate() {
                            for (q, &lq) in b.labels.iter().enumerate() {
                                if lp == lq {
                                    acc[lp] += block.a_b[[p, q]];
                                }
                            }
                        }
                    }
                }
                acc
            },
        )
        .reduce(|| Array1::zeros(n_labels), |v1, v2| v1 + v2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::{array, Axis};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;
    use sgpkern_descriptors::{LocalDescriptor, VOIGT_PAIRS};

    fn random_clusters(counts: &[usize], n_desc: usize, seed: u64) -> ClusterDescriptor<f64> {
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let mut envs = ClusterDescriptor::new(n_desc, counts.len());
        for (kind, &count) in counts.iter().enumerate() {
            let values = Array2::random_using((count, n_desc), Uniform::new(-1., 1.), &mut rng);
            for row in values.rows() {
                envs.add_cluster(kind, &row).unwrap();
            }
        }
        envs
    }

    fn struc1() -> (Array2<f64>, Vec<usize>) {
        (random_positions(4, 42), vec![0, 1, 0, 1])
    }

    fn struc2() -> (Array2<f64>, Vec<usize>) {
        (random_positions(3, 7), vec![1, 0, 0])
    }

    #[test]
    fn test_orthogonal_envs() {
        let mut envs = ClusterDescriptor::new(2, 1);
        envs.add_cluster(0, &array![1., 0.]).unwrap();
        envs.add_cluster(0, &array![0., 1.]).unwrap();
        let kernel = SquaredExponential::new(1., 1.).unwrap();
        let kuu = kernel.envs_envs(&envs, &envs).unwrap();
        let e = f64::exp(-1.);
        assert_abs_diff_eq!(kuu, array![[1., e], [e, 1.]], epsilon = 1e-15);
    }

    #[test]
    fn test_single_env() {
        let mut envs = ClusterDescriptor::new(3, 1);
        envs.add_cluster_with_norm(0, &array![0., 1., 0.], 1.).unwrap();
        let mut kernel = SquaredExponential::new(0.3, 2.).unwrap();
        kernel.set_hyperparameters(&[1., 1.]).unwrap();
        let kuu = kernel.envs_envs(&envs, &envs).unwrap();
        assert_eq!(kuu.dim(), (1, 1));
        assert_abs_diff_eq!(kuu[[0, 0]], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let mut kernel = SquaredExponential::new(1.5, 0.5).unwrap();
        for hyps in [[0., 1.], [1., -1.], [f64::NAN, 1.], [1., f64::INFINITY]] {
            assert!(matches!(
                kernel.set_hyperparameters(&hyps),
                Err(KernelError::InvalidHyperparameter(_))
            ));
        }
        assert!(matches!(
            kernel.set_hyperparameters(&[1.]),
            Err(KernelError::DimensionMismatch(_))
        ));
        // previous hyperparameters are kept on failure
        assert_abs_diff_eq!(kernel.hyperparameters(), array![1.5, 0.5]);
        assert_eq!(kernel.n_hyperparameters(), 2);
    }

    #[test]
    fn test_params_check() {
        use linfa::ParamGuard;
        let valid = SquaredExponential::<f64>::params()
            .sigma(2.)
            .ls(0.7)
            .check()
            .unwrap();
        let kernel = SquaredExponential::try_from(valid).unwrap();
        assert_abs_diff_eq!(kernel.hyps().sig2(), 4.);
        assert_eq!(kernel.to_string(), "SquaredExponential(sigma=2, ls=0.7)");
    }

    #[test]
    fn test_envs_envs_symmetry_and_kinds() {
        let envs = random_clusters(&[3, 4], 5, 0);
        let kernel = SquaredExponential::new(1.3, 0.8).unwrap();
        let kuu = kernel.envs_envs(&envs, &envs).unwrap();
        assert_abs_diff_eq!(kuu, kuu.t(), epsilon = 1e-14);
        // cross kind blocks are exactly zero
        assert!(kuu.slice(s![..3, 3..]).iter().all(|&v| v == 0.));
        assert!(kuu.slice(s![3.., ..3]).iter().all(|&v| v == 0.));
        // self similarity
        assert_abs_diff_eq!(kuu.diag(), Array1::from_elem(7, 1.3 * 1.3), epsilon = 1e-14);
    }

    #[test]
    fn test_envs_envs_scaling() {
        let envs1 = random_clusters(&[3, 2], 4, 1);
        let envs2 = random_clusters(&[2, 2], 4, 2);
        let mut kernel = SquaredExponential::new(0.7, 1.1).unwrap();
        let kuu = kernel.envs_envs(&envs1, &envs2).unwrap();
        kernel.set_hyperparameters(&[1.4, 1.1]).unwrap();
        let kuu2 = kernel.envs_envs(&envs1, &envs2).unwrap();
        assert_abs_diff_eq!(kuu2, kuu * 4., epsilon = 1e-14);
    }

    #[test]
    fn test_envs_envs_grad() {
        let envs1 = random_clusters(&[2, 3], 4, 3);
        let envs2 = random_clusters(&[3, 1], 4, 4);
        let hyps = vec![1.2, 0.6];
        let kernel = SquaredExponential::new(hyps[0], hyps[1]).unwrap();
        let kuu = kernel.envs_envs(&envs1, &envs2).unwrap();
        let grad = kernel.envs_envs_grad(&envs1, &envs2, &kuu).unwrap();
        assert_eq!(grad.dim(), (2, 5, 4));

        for i in 0..kuu.nrows() {
            for j in 0..kuu.ncols() {
                let f = |x: &Vec<f64>| -> f64 {
                    SquaredExponential::new(x[0], x[1])
                        .unwrap()
                        .envs_envs(&envs1, &envs2)
                        .unwrap()[[i, j]]
                };
                let fd = hyps.central_diff(&f);
                assert_abs_diff_eq!(grad[[0, i, j]], fd[0], epsilon = 1e-6);
                assert_abs_diff_eq!(grad[[1, i, j]], fd[1], epsilon = 1e-6);
            }
        }

        let (kuu2, grad2) = kernel.envs_envs_with_grad(&envs1, &envs2).unwrap();
        assert_abs_diff_eq!(kuu2, kuu);
        assert_abs_diff_eq!(grad2, grad);
    }

    #[test]
    fn test_envs_envs_grad_bad_kuu() {
        let envs = random_clusters(&[2], 3, 5);
        let kernel = SquaredExponential::<f64>::default();
        let res = kernel.envs_envs_grad(&envs, &envs, &Array2::zeros((2, 3)));
        assert!(matches!(res, Err(KernelError::DimensionMismatch(_))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let kernel = SquaredExponential::<f64>::default();
        let envs = random_clusters(&[2, 1], 3, 6);
        let other = random_clusters(&[2, 1], 4, 6);
        assert!(matches!(
            kernel.envs_envs(&envs, &other),
            Err(KernelError::DimensionMismatch(_))
        ));
        let (pos, kinds) = struc1();
        let struc = toy_structure(&pos, &kinds);
        assert!(matches!(
            kernel.envs_struc(&envs, &struc),
            Err(KernelError::DimensionMismatch(_))
        ));
        assert!(matches!(
            kernel.envs_struc_grad(&envs, &struc),
            Err(KernelError::DimensionMismatch(_))
        ));
        let short = DescriptorValues::new(
            1,
            2,
            1,
            vec![LocalDescriptor::without_derivatives(0, 0, array![1., 0.]).unwrap()],
        )
        .unwrap();
        assert!(matches!(
            kernel.struc_struc(&struc, &short),
            Err(KernelError::DimensionMismatch(_))
        ));
        assert!(matches!(
            kernel.struc_struc(&short, &struc),
            Err(KernelError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_kinds_missing_from_one_side() {
        let mut one = ClusterDescriptor::new(2, 1);
        one.add_cluster(0, &array![1., 0.]).unwrap();
        let mut three = ClusterDescriptor::new(2, 3);
        three.add_cluster(0, &array![1., 0.]).unwrap();
        three.add_cluster(2, &array![1., 0.]).unwrap();
        let kernel = SquaredExponential::<f64>::default();

        let kuu = kernel.envs_envs(&one, &three).unwrap();
        assert_abs_diff_eq!(kuu, array![[1., 0.]], epsilon = 1e-15);
        let kuu = kernel.envs_envs(&three, &one).unwrap();
        assert_abs_diff_eq!(kuu, array![[1.], [0.]], epsilon = 1e-15);

        let kind0 = DescriptorValues::new(
            1,
            2,
            1,
            vec![LocalDescriptor::without_derivatives(0, 0, array![2., 0.]).unwrap()],
        )
        .unwrap();
        let kuf = kernel.envs_struc(&three, &kind0).unwrap();
        assert_eq!(kuf.dim(), (2, 1 + 3 + 6));
        assert_abs_diff_eq!(kuf.column(0), array![1., 0.], epsilon = 1e-15);
        assert!(kuf.row(1).iter().all(|&v| v == 0.));
        let grad = kernel.envs_struc_grad(&three, &kind0).unwrap();
        assert!(grad.slice(s![.., 1, ..]).iter().all(|&v| v == 0.));

        // only atoms of kind 2
        let kind2 = DescriptorValues::new(
            1,
            2,
            3,
            vec![LocalDescriptor::without_derivatives(2, 0, array![1., 1.]).unwrap()],
        )
        .unwrap();
        let zeros = Array2::<f64>::zeros((10, 10));
        assert_abs_diff_eq!(kernel.struc_struc(&kind0, &kind2).unwrap(), zeros);
        assert_abs_diff_eq!(kernel.struc_struc(&kind2, &kind0).unwrap(), zeros);
        let kuf = kernel.envs_struc(&one, &kind2).unwrap();
        assert_abs_diff_eq!(kuf, Array2::<f64>::zeros((1, 10)));
    }

    #[test]
    fn test_degenerate_descriptors() {
        let mut envs = ClusterDescriptor::new(2, 1);
        envs.add_cluster(0, &array![0., 0.]).unwrap();
        envs.add_cluster(0, &array![1., 1.]).unwrap();
        let struc = DescriptorValues::new(
            2,
            2,
            1,
            vec![
                LocalDescriptor::without_derivatives(0, 0, array![0., 0.]).unwrap(),
                LocalDescriptor::without_derivatives(0, 1, array![2., 2.]).unwrap(),
            ],
        )
        .unwrap();
        let kernel = SquaredExponential::<f64>::new(2., 1.).unwrap();

        let kuu = kernel.envs_envs(&envs, &envs).unwrap();
        assert_abs_diff_eq!(kuu, array![[0., 0.], [0., 4.]], epsilon = 1e-14);

        let kuf = kernel.envs_struc(&envs, &struc).unwrap();
        assert!(kuf.row(0).iter().all(|&v| v == 0.));
        assert_abs_diff_eq!(kuf[[1, 0]], 4., epsilon = 1e-14);

        let kss = kernel.struc_struc(&struc, &struc).unwrap();
        assert_abs_diff_eq!(kss[[0, 0]], 4., epsilon = 1e-14);
        assert!(kss.iter().all(|v: &f64| v.is_finite()));
        assert_eq!(envs.n_degenerate(), 1);
    }

    #[test]
    fn test_energy_additivity() {
        let (pos, kinds) = struc1();
        let struc = toy_structure(&pos, &kinds);
        let envs = random_clusters(&[2, 2], N_DESC, 8);
        let hyps = Hyperparameters::new(0.9, 0.5).unwrap();
        let kernel = SquaredExponential::new(0.9, 0.5).unwrap();
        let kuf = kernel.envs_struc(&envs, &struc).unwrap();
        assert_eq!(kuf.dim(), (4, 1 + 3 * 4 + 6));

        for i in 0..envs.n_clusters() {
            let (kind, u, nu) = envs.entry(i).unwrap();
            let expected: f64 = struc
                .environments_of_kind(kind)
                .iter()
                .map(|d| value(&hyps, u.dot(&d.values()) / (nu * d.norm())))
                .sum();
            assert_abs_diff_eq!(kuf[[i, 0]], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_envs_struc_forces() {
        let (pos, kinds) = struc1();
        let struc = toy_structure(&pos, &kinds);
        let mut envs = ClusterDescriptor::new(N_DESC, N_KINDS);
        envs.add_all_clusters(&toy_structure(&struc2().0, &struc2().1))
            .unwrap();
        let kernel = SquaredExponential::new(1.1, 0.6).unwrap();
        let kuf = kernel.envs_struc(&envs, &struc).unwrap();

        let x = pos.iter().copied().collect::<Vec<f64>>();
        for i in 0..envs.n_clusters() {
            let f = |x: &Vec<f64>| -> f64 {
                let struc = toy_structure(&from_flat(x), &kinds);
                kernel.envs_struc(&envs, &struc).unwrap()[[i, 0]]
            };
            let fd = Array1::from_vec(x.central_diff(&f));
            assert_abs_diff_eq!(kuf.slice(s![i, 1..13]), fd.mapv(|v| -v), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_envs_struc_stress() {
        let (pos, kinds) = struc1();
        let struc = toy_structure(&pos, &kinds);
        let envs = random_clusters(&[1, 2], N_DESC, 9);
        let kernel = SquaredExponential::new(1.1, 0.6).unwrap();
        let kuf = kernel.envs_struc(&envs, &struc).unwrap();

        for i in 0..envs.n_clusters() {
            for (s, &pair) in VOIGT_PAIRS.iter().enumerate() {
                let f = |e: &Vec<f64>| -> f64 {
                    let struc = toy_structure(&strained(&pos, pair, e[0]), &kinds);
                    kernel.envs_struc(&envs, &struc).unwrap()[[i, 0]]
                };
                let fd = vec![0.].central_diff(&f);
                assert_abs_diff_eq!(kuf[[i, struc.stress_index(s)]], -fd[0], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_envs_struc_grad() {
        let (pos, kinds) = struc1();
        let struc = toy_structure(&pos, &kinds);
        let envs = random_clusters(&[2, 1], N_DESC, 10);
        let hyps = vec![0.8, 0.7];
        let kernel = SquaredExponential::new(hyps[0], hyps[1]).unwrap();
        let grad = kernel.envs_struc_grad(&envs, &struc).unwrap();
        assert_eq!(grad.dim(), (2, 3, struc.n_labels()));

        for i in 0..envs.n_clusters() {
            for j in [0, 1, 5, 12, 13, 18] {
                let f = |x: &Vec<f64>| -> f64 {
                    SquaredExponential::new(x[0], x[1])
                        .unwrap()
                        .envs_struc(&envs, &struc)
                        .unwrap()[[i, j]]
                };
                let fd = hyps.central_diff(&f);
                assert_abs_diff_eq!(grad[[0, i, j]], fd[0], epsilon = 1e-6);
                assert_abs_diff_eq!(grad[[1, i, j]], fd[1], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_struc_struc_energy_row() {
        let (pos1, kinds1) = struc1();
        let (pos2, kinds2) = struc2();
        let s1 = toy_structure(&pos1, &kinds1);
        let s2 = toy_structure(&pos2, &kinds2);
        let kernel = SquaredExponential::new(1.2, 0.9).unwrap();

        let mut envs = ClusterDescriptor::new(N_DESC, N_KINDS);
        envs.add_all_clusters(&s1).unwrap();
        let kuf = kernel.envs_struc(&envs, &s2).unwrap();
        let kss = kernel.struc_struc(&s1, &s2).unwrap();
        assert_eq!(kss.dim(), (s1.n_labels(), s2.n_labels()));
        assert_abs_diff_eq!(kss.row(0), kuf.sum_axis(Axis(0)), epsilon = 1e-12);
    }

    #[test]
    fn test_struc_struc_force_blocks() {
        let (pos1, kinds1) = struc1();
        let (pos2, kinds2) = struc2();
        let s1 = toy_structure(&pos1, &kinds1);
        let s2 = toy_structure(&pos2, &kinds2);
        let kernel = SquaredExponential::new(1.2, 0.9).unwrap();
        let kss = kernel.struc_struc(&s1, &s2).unwrap();

        // derivative of the structure 2 energy column with respect to its positions
        let x = pos2.iter().copied().collect::<Vec<f64>>();
        for p in [0, 1, 4, 8, 12, 13, 16, 18] {
            let f = |x: &Vec<f64>| -> f64 {
                let s2 = toy_structure(&from_flat(x), &kinds2);
                kernel.struc_struc(&s1, &s2).unwrap()[[p, 0]]
            };
            let fd = Array1::from_vec(x.central_diff(&f));
            assert_abs_diff_eq!(kss.slice(s![p, 1..10]), fd.mapv(|v| -v), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_struc_struc_stress_blocks() {
        let (pos1, kinds1) = struc1();
        let (pos2, kinds2) = struc2();
        let s1 = toy_structure(&pos1, &kinds1);
        let s2 = toy_structure(&pos2, &kinds2);
        let kernel = SquaredExponential::new(0.8, 0.6).unwrap();
        let kss = kernel.struc_struc(&s1, &s2).unwrap();

        for p in [0, 3, 13, 17] {
            for (s, &pair) in VOIGT_PAIRS.iter().enumerate() {
                let f = |e: &Vec<f64>| -> f64 {
                    let s2 = toy_structure(&strained(&pos2, pair, e[0]), &kinds2);
                    kernel.struc_struc(&s1, &s2).unwrap()[[p, 0]]
                };
                let fd = vec![0.].central_diff(&f);
                assert_abs_diff_eq!(kss[[p, s2.stress_index(s)]], -fd[0], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_struc_struc_symmetry_and_self_kernel() {
        let (pos, kinds) = struc1();
        let struc = toy_structure(&pos, &kinds);
        let kernel = SquaredExponential::new(1.5, 0.7).unwrap();
        let kss = kernel.struc_struc(&struc, &struc).unwrap();
        assert_abs_diff_eq!(kss, kss.t(), epsilon = 1e-12);

        let diag = kernel.self_kernel_struc(&struc);
        assert_eq!(diag.len(), struc.n_labels());
        assert_abs_diff_eq!(diag, kss.diag(), epsilon = 1e-12);
        assert!(diag.iter().all(|&v| v >= 0.));
    }

    #[test]
    fn test_self_kernel_identical_environments() {
        let env = || LocalDescriptor::without_derivatives(0, 0, array![0.5, 0.1, 0.2]).unwrap();
        let struc = DescriptorValues::new(1, 3, 1, vec![env(), env(), env()]).unwrap();
        let kernel = SquaredExponential::new(2., 0.4).unwrap();
        let diag = kernel.self_kernel_struc(&struc);
        assert_abs_diff_eq!(diag[0], 9. * 4., epsilon = 1e-12);
        assert!(diag.slice(s![1..]).iter().all(|&v| v == 0.));
    }
}
