//! Distributed slab solver for the 3D Poisson problem with a reaction term.

pub mod boundary;
pub mod collect;
pub mod comm;
#[cfg(feature = "distributed")]
pub mod comm_mpi;
pub mod comm_thread;
pub mod convergence;
pub mod halo;
pub mod jacobi;
pub mod partition;
pub mod slab;
pub mod stencil;

pub use jacobi::{solve, SolveOutcome};
