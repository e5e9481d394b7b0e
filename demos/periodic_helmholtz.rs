//! Solve a periodic 1-D Helmholtz problem `(-u'' + u = f)` discretized with quadratic
//! elements, using PCG with vertex patches and a linear coarse space.

use rand::Rng;
use schwarz_pc::config::PcConfig;
use schwarz_pc::matrix::CsrMatrix;
use schwarz_pc::mesh::{DofLayout, MeshTopology, p1_in_p2_interval_prolongation};
use schwarz_pc::preconditioner::{CompositePreconditioner, Discretization, Preconditioner};
use schwarz_pc::solver::{CgNormType, LinearSolver, PcgSolver};

fn assemble_p2(mesh: &MeshTopology, layout: &DofLayout) -> CsrMatrix<f64> {
    let h = 1.0 / mesh.num_cells() as f64;
    let k = [[7.0, 1.0, -8.0], [1.0, 7.0, -8.0], [-8.0, -8.0, 16.0]];
    let m = [[4.0, -1.0, 2.0], [-1.0, 4.0, 2.0], [2.0, 2.0, 16.0]];
    let mut triplets = Vec::new();
    for c in 0..layout.num_cells() {
        let dofs = layout.cell_dofs(c);
        for a in 0..3 {
            for b in 0..3 {
                triplets.push((dofs[a], dofs[b], k[a][b] / (3.0 * h) + m[a][b] * h / 30.0));
            }
        }
    }
    CsrMatrix::from_triplets(layout.num_dofs(), layout.num_dofs(), &triplets)
        .expect("element DoFs are in range")
}

fn main() {
    let ncells = 64;
    let mesh = MeshTopology::interval(ncells, true);
    let layout = DofLayout::lagrange_p2_interval(&mesh);
    let a = assemble_p2(&mesh, &layout);
    let p = p1_in_p2_interval_prolongation(&mesh).unwrap();

    let disc = Discretization { mesh: Some(&mesh), layout: Some(&layout), prolongation: Some(&p), ..Default::default() };
    let mut pc = CompositePreconditioner::<CsrMatrix<f64>>::from_config(&PcConfig::two_level(), &disc).unwrap();
    pc.setup(&a).unwrap();
    println!("subspaces: {:?}", pc.component_names());

    let mut rng = rand::thread_rng();
    let b: Vec<f64> = (0..layout.num_dofs()).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let pc_ref: &dyn Preconditioner<CsrMatrix<f64>, Vec<f64>> = &pc;
    for (label, precond) in [("unpreconditioned", None), ("two-level Schwarz", Some(pc_ref))] {
        let mut x = vec![0.0; layout.num_dofs()];
        let mut solver = PcgSolver::new(1e-10, 500).with_norm(CgNormType::Unpreconditioned);
        let stats = solver.solve(&a, precond, &b, &mut x).unwrap();
        println!(
            "{label:>18}: {} iterations, converged = {}, final residual = {:.3e}",
            stats.iterations, stats.converged, stats.final_residual
        );
    }
}
