//! Dirichlet boundary seeding.

use crate::config::SolverConfig;

use super::partition::SlabPartition;
use super::slab::Slab;

/// Exact solution, also the boundary condition: `x² + y² + z²`.
pub fn phi(x: f64, y: f64, z: f64) -> f64 {
    x * x + y * y + z * z
}

/// Right-hand side `rho = 6 - a·phi` for penalty `a`.
pub fn rho(penalty: f64, x: f64, y: f64, z: f64) -> f64 {
    6.0 - penalty * phi(x, y, z)
}

/// Whether global point `(z, i, j)` lies on a domain face.
pub fn on_boundary(n: usize, z: isize, i: usize, j: usize) -> bool {
    let last = n - 1;
    i == 0 || i == last || j == 0 || j == last || z == 0 || z == last as isize
}

/// Build this rank's slab: exact `phi` on domain faces, zero elsewhere.
/// Ghost layers are filled by the same rule.
pub fn init_slab(config: &SolverConfig, partition: &SlabPartition) -> Slab {
    let shape = partition.shape();
    let n = config.n;
    let mut slab = Slab::zeros(shape);

    for layer in 0..shape.layers {
        let gz = partition.global_z(layer);
        let z = config.z(gz);
        for i in 0..n {
            let x = config.x(i);
            for j in 0..n {
                if on_boundary(n, gz, i, j) {
                    slab.set(layer, i, j, phi(x, config.y(j), z));
                }
            }
        }
    }
    slab
}
