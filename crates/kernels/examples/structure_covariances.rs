use ndarray::{array, Array1, Array2};
use sgpkern_descriptors::{strain_derivatives, ClusterDescriptor, DescriptorValues, LocalDescriptor};
use sgpkern_kernels::{CompactKernel, SquaredExponential};

const ETAS: [f64; 4] = [0.5, 1., 2., 4.];

/// Radial descriptor of each atom `sum_k exp(-eta |r_k - r_c|^2)`, single kind
fn radial_structure(positions: &Array2<f64>) -> DescriptorValues<f64> {
    let n_atoms = positions.nrows();
    let envs = (0..n_atoms)
        .map(|c| {
            let mut values = Array1::zeros(ETAS.len());
            let mut dervs = Array2::zeros((3 * n_atoms, ETAS.len()));
            for k in (0..n_atoms).filter(|&k| k != c) {
                let r = &positions.row(k) - &positions.row(c);
                let r2 = r.dot(&r);
                for (m, eta) in ETAS.iter().enumerate() {
                    let e = f64::exp(-eta * r2);
                    values[m] += e;
                    for dim in 0..3 {
                        dervs[[3 * k + dim, m]] += -2. * eta * e * r[dim];
                        dervs[[3 * c + dim, m]] -= -2. * eta * e * r[dim];
                    }
                }
            }
            let strain = strain_derivatives(positions, &dervs, 10.).expect("strain derivatives");
            LocalDescriptor::new(0, c, values, (0..n_atoms).collect(), dervs, strain)
                .expect("local descriptor")
        })
        .collect();
    DescriptorValues::new(n_atoms, ETAS.len(), 1, envs)
        .and_then(|s| s.with_volume(10.))
        .expect("structure descriptors")
}

fn main() {
    let env = env_logger::Env::new().filter_or("SGPKERN_LOG", "debug");
    env_logger::init_from_env(env);

    let trimer = radial_structure(&array![[0., 0., 0.], [1., 0., 0.], [0., 1.2, 0.]]);
    let dimer = radial_structure(&array![[0., 0., 0.], [0., 0., 0.9]]);

    let mut sparse_envs = ClusterDescriptor::new(ETAS.len(), 1);
    sparse_envs
        .add_all_clusters(&trimer)
        .expect("trimer environments");
    sparse_envs
        .add_clusters(&dimer, &[vec![0]])
        .expect("dimer environment");

    let mut kernel = SquaredExponential::new(1., 0.5).expect("valid hyperparameters");
    let kuu = kernel
        .envs_envs(&sparse_envs, &sparse_envs)
        .expect("kuu");
    let kuf = kernel.envs_struc(&sparse_envs, &dimer).expect("kuf");
    let kss = kernel.struc_struc(&dimer, &trimer).expect("kss");
    println!("{kernel}");
    println!("kuu =\n{kuu:.4}");
    println!("kuf (energy, forces and stress of the dimer) =\n{kuf:.4}");
    println!("dimer/trimer energy covariance = {:.4}", kss[[0, 0]]);

    kernel.set_hyperparameters(&[2., 0.8]).expect("valid hyperparameters");
    let (_, grad) = kernel
        .envs_envs_with_grad(&sparse_envs, &sparse_envs)
        .expect("kuu gradient");
    println!("{kernel}");
    println!("dkuu/dls =\n{:.4}", grad.index_axis(ndarray::Axis(0), 1));
    println!("dimer variances = {:.4}", kernel.self_kernel_struc(&dimer));
}
