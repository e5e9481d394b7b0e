//! Preconditioned conjugate gradients driven by the Schwarz preconditioners.

mod common;

use approx::assert_abs_diff_eq;
use common::{direct_solve, energy_error, p1_helmholtz, p2_helmholtz};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schwarz_pc::config::{
    CoarseConfig, CoarseOperatorKind, PatchConfig, PatchPartition, PcConfig, SubSolverKind, SubspaceConfig,
};
use schwarz_pc::matrix::CsrMatrix;
use schwarz_pc::mesh::{DofLayout, MeshTopology, p1_in_p2_interval_prolongation};
use schwarz_pc::partition::PatchSet;
use schwarz_pc::preconditioner::{
    CoarseSpacePreconditioner, CompositePreconditioner, Discretization, PatchPreconditioner, Preconditioner,
    constant_prolongation,
};
use schwarz_pc::solver::{LinearSolver, PcgSolver};

fn random_rhs(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn energy_error_never_increases() {
    let (_, _, a) = p1_helmholtz(5, true);
    let patches = PatchSet::from_index_sets(5, vec![vec![0, 1, 2], vec![2, 3, 4]]).unwrap();
    let mut pc = PatchPreconditioner::new(patches, SubSolverKind::Direct);
    pc.setup_with(&a).unwrap();
    let pc: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &pc;

    let b = vec![1.0, -2.0, 0.5, 3.0, -1.0];
    let x_star = direct_solve(&a, &b);
    let mut previous = energy_error(&a, &vec![0.0; 5], &x_star);
    for k in 1..=5 {
        let mut x = vec![0.0; 5];
        PcgSolver::new(1e-12, k).solve(&a, Some(pc), &b, &mut x).unwrap();
        let err = energy_error(&a, &x, &x_star);
        assert!(err <= previous + 1e-12, "iteration {k}: {err} > {previous}");
        previous = err;
    }
    assert!(previous < 1e-8);
}

#[test]
fn two_level_pcg_on_p1() {
    let (mesh, layout, a) = p1_helmholtz(32, true);
    let p = constant_prolongation(32, 1.0 / 32.0).unwrap();
    let disc = Discretization { mesh: Some(&mesh), layout: Some(&layout), prolongation: Some(&p), ..Default::default() };
    let mut pc = CompositePreconditioner::<CsrMatrix<f64>>::from_config(&PcConfig::two_level(), &disc).unwrap();
    pc.setup(&a).unwrap();
    let pc: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &pc;

    let b = random_rhs(32, 3);
    let mut x = vec![0.0; 32];
    let mut solver = PcgSolver::new(1e-10, 100);
    let stats = solver.solve(&a, Some(pc), &b, &mut x).unwrap();
    assert!(stats.converged, "{stats:?}");
    for (xi, ei) in x.iter().zip(direct_solve(&a, &b)) {
        assert_abs_diff_eq!(*xi, ei, epsilon = 1e-7);
    }
}

#[test]
fn p1_coarse_space_for_p2_problem() {
    let (mesh, layout, a) = p2_helmholtz(16, true);
    let p = p1_in_p2_interval_prolongation(&mesh).unwrap();
    let disc = Discretization { mesh: Some(&mesh), layout: Some(&layout), prolongation: Some(&p), ..Default::default() };
    let mut pc = CompositePreconditioner::<CsrMatrix<f64>>::from_config(&PcConfig::two_level(), &disc).unwrap();
    pc.setup(&a).unwrap();
    let pc: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &pc;

    let b = random_rhs(layout.num_dofs(), 5);
    let mut x = vec![0.0; layout.num_dofs()];
    let stats = PcgSolver::new(1e-12, 200).solve(&a, Some(pc), &b, &mut x).unwrap();
    assert!(stats.converged, "{stats:?}");
    let x_star = direct_solve(&a, &b);
    let scale = x_star.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    for (xi, ei) in x.iter().zip(&x_star) {
        assert!((xi - ei).abs() <= 1e-6 * scale.max(1.0));
    }
}

#[test]
fn galerkin_p1_in_p2_matches_assembled_p1() {
    // P1 is a subspace of P2, so the Galerkin product reproduces the P1 matrix.
    let (mesh, _, a2) = p2_helmholtz(6, true);
    let (_, _, a1) = p1_helmholtz(6, true);
    let p = p1_in_p2_interval_prolongation(&mesh).unwrap();
    let galerkin = CoarseSpacePreconditioner::galerkin(p.clone(), SubSolverKind::Direct).unwrap();
    let assembled = CoarseSpacePreconditioner::assembled(p, a1, SubSolverKind::Direct).unwrap();
    let g = galerkin.coarse_matrix(&a2).unwrap();
    let h = assembled.coarse_matrix(&a2).unwrap();
    for i in 0..6 {
        for j in 0..6 {
            assert_abs_diff_eq!(g[(i, j)], h[(i, j)], epsilon = 1e-11);
        }
    }
}

#[test]
fn jacobi_and_algebraic_variants_converge() {
    let (mesh, layout, a) = p1_helmholtz(24, true);
    let p = constant_prolongation(24, 1.0 / 24.0).unwrap();
    let disc = Discretization {
        mesh: Some(&mesh),
        layout: Some(&layout),
        prolongation: Some(&p),
        coarse_operator: None,
        patches: None,
    };
    let variants = [
        PatchConfig { sub_solver: SubSolverKind::Jacobi, ..PatchConfig::default() },
        PatchConfig { partition: PatchPartition::Algebraic { blocks: 4, overlap: 2 }, ..PatchConfig::default() },
    ];
    let b = random_rhs(24, 9);
    let x_star = direct_solve(&a, &b);
    for patch in variants {
        let config = PcConfig {
            subspaces: vec![
                SubspaceConfig::patch("patch", patch),
                SubspaceConfig::coarse(
                    "coarse",
                    CoarseConfig { sub_solver: SubSolverKind::Direct, operator: CoarseOperatorKind::Galerkin },
                ),
            ],
            ..PcConfig::default()
        };
        let mut pc = CompositePreconditioner::<CsrMatrix<f64>>::from_config(&config, &disc).unwrap();
        pc.setup(&a).unwrap();
        let pc: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &pc;
        let mut x = vec![0.0; 24];
        let stats = PcgSolver::new(1e-12, 200).solve(&a, Some(pc), &b, &mut x).unwrap();
        assert!(stats.converged, "{patch:?}: {stats:?}");
        for (xi, ei) in x.iter().zip(&x_star) {
            assert_abs_diff_eq!(*xi, *ei, epsilon = 1e-8);
        }
    }
}

#[test]
fn csr_and_dense_operators_agree() {
    let (mesh, layout, a) = p1_helmholtz(10, true);
    let dense = a.to_dense();
    let b = random_rhs(10, 13);

    let mut sparse_pc = PatchPreconditioner::from_mesh(&mesh, &layout, &PatchConfig::default()).unwrap();
    sparse_pc.setup_with(&a).unwrap();
    let mut dense_pc = PatchPreconditioner::from_mesh(&mesh, &layout, &PatchConfig::default()).unwrap();
    dense_pc.setup_with(&dense).unwrap();

    let mut z_sparse = vec![0.0; 10];
    Preconditioner::<CsrMatrix<f64>, _>::apply(&sparse_pc, &b, &mut z_sparse).unwrap();
    let mut z_dense = vec![0.0; 10];
    Preconditioner::<faer::Mat<f64>, _>::apply(&dense_pc, &b, &mut z_dense).unwrap();
    for (s, d) in z_sparse.iter().zip(&z_dense) {
        assert_abs_diff_eq!(*s, *d, epsilon = 1e-12);
    }
}

#[test]
fn dirichlet_rows_with_boundary_dofs_excluded() {
    // Laplacian on four cells with the end DoFs eliminated to identity rows.
    let h = 0.25;
    let mut triplets = vec![(0, 0, 1.0), (4, 4, 1.0)];
    for i in 1..4 {
        triplets.push((i, i, 2.0 / h));
        for j in [i - 1, i + 1] {
            if (1..4).contains(&j) {
                triplets.push((i, j, -1.0 / h));
            }
        }
    }
    let a = CsrMatrix::from_triplets(5, 5, &triplets).unwrap();
    let mesh = MeshTopology::interval(4, false);
    let layout = DofLayout::lagrange_p1(&mesh).with_constrained(&[0, 4]).unwrap();
    let config = PatchConfig { include_boundary_dofs: false, ..PatchConfig::default() };
    let mut pc = PatchPreconditioner::from_mesh(&mesh, &layout, &config).unwrap();
    pc.setup_with(&a).unwrap();

    let mut z = vec![0.0; 5];
    Preconditioner::<CsrMatrix<f64>, _>::apply(&pc, &vec![1.0, 0.0, 0.0, 0.0, 0.0], &mut z).unwrap();
    assert_eq!(z, vec![1.0, 0.0, 0.0, 0.0, 0.0]);

    let pc: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &pc;
    let b = vec![1.0, 0.0, 0.0, 0.0, 2.0];
    let mut x = vec![0.0; 5];
    let stats = PcgSolver::new(1e-12, 50).solve(&a, Some(pc), &b, &mut x).unwrap();
    assert!(stats.converged, "{stats:?}");
    for (xi, ei) in x.iter().zip(direct_solve(&a, &b)) {
        assert_abs_diff_eq!(*xi, ei, epsilon = 1e-10);
    }
}
