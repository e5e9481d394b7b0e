//! Shared finite-element fixtures for the integration tests.
#![allow(dead_code)]

use schwarz_pc::matrix::CsrMatrix;
use schwarz_pc::mesh::{DofLayout, MeshTopology};
use schwarz_pc::solver::LuSolver;

/// Assemble a global matrix from one element matrix shared by every cell.
pub fn assemble(layout: &DofLayout, element: &[Vec<f64>]) -> CsrMatrix<f64> {
    let mut triplets = Vec::new();
    for c in 0..layout.num_cells() {
        let dofs = layout.cell_dofs(c);
        for (a, &i) in dofs.iter().enumerate() {
            for (b, &j) in dofs.iter().enumerate() {
                triplets.push((i, j, element[a][b]));
            }
        }
    }
    CsrMatrix::from_triplets(layout.num_dofs(), layout.num_dofs(), &triplets).unwrap()
}

/// `K + M` for piecewise-linear elements on a uniform mesh of the unit interval.
pub fn p1_helmholtz(ncells: usize, periodic: bool) -> (MeshTopology, DofLayout, CsrMatrix<f64>) {
    let h = 1.0 / ncells as f64;
    let element = vec![
        vec![1.0 / h + 2.0 * h / 6.0, -1.0 / h + h / 6.0],
        vec![-1.0 / h + h / 6.0, 1.0 / h + 2.0 * h / 6.0],
    ];
    let mesh = MeshTopology::interval(ncells, periodic);
    let layout = DofLayout::lagrange_p1(&mesh);
    let a = assemble(&layout, &element);
    (mesh, layout, a)
}

/// Pure stiffness (Neumann or periodic Laplacian) for piecewise-linear elements.
pub fn p1_laplacian(ncells: usize, periodic: bool) -> CsrMatrix<f64> {
    let h = 1.0 / ncells as f64;
    let element = vec![vec![1.0 / h, -1.0 / h], vec![-1.0 / h, 1.0 / h]];
    let mesh = MeshTopology::interval(ncells, periodic);
    assemble(&DofLayout::lagrange_p1(&mesh), &element)
}

/// `K + M` for piecewise-quadratic elements; local DoF order is `[v0, v1, midpoint]`.
pub fn p2_helmholtz(ncells: usize, periodic: bool) -> (MeshTopology, DofLayout, CsrMatrix<f64>) {
    let h = 1.0 / ncells as f64;
    let k = [[7.0, 1.0, -8.0], [1.0, 7.0, -8.0], [-8.0, -8.0, 16.0]];
    let m = [[4.0, -1.0, 2.0], [-1.0, 4.0, 2.0], [2.0, 2.0, 16.0]];
    let element: Vec<Vec<f64>> = (0..3)
        .map(|a| (0..3).map(|b| k[a][b] / (3.0 * h) + m[a][b] * h / 30.0).collect())
        .collect();
    let mesh = MeshTopology::interval(ncells, periodic);
    let layout = DofLayout::lagrange_p2_interval(&mesh);
    let a = assemble(&layout, &element);
    (mesh, layout, a)
}

/// Exact solution of `a x = b` through a dense LU factorization.
pub fn direct_solve(a: &CsrMatrix<f64>, b: &[f64]) -> Vec<f64> {
    let mut lu = LuSolver::new();
    lu.factor(&a.to_dense()).unwrap();
    let mut x = vec![0.0; b.len()];
    lu.solve_cached(b, &mut x).unwrap();
    x
}

/// ‖x - y‖_A
pub fn energy_error(a: &CsrMatrix<f64>, x: &[f64], y: &[f64]) -> f64 {
    let e: Vec<f64> = x.iter().zip(y).map(|(xi, yi)| xi - yi).collect();
    let mut ae = vec![0.0; e.len()];
    a.spmv(&e, &mut ae);
    e.iter().zip(&ae).map(|(ei, aei)| ei * aei).sum::<f64>().max(0.0).sqrt()
}
