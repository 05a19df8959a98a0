//! Distributed Jacobi solver for `Δφ − aφ = ρ` on a cube, decomposed into Z
//! slabs that exchange ghost layers by message passing.

pub mod config;
pub mod error;
pub mod output;
pub mod solver;
pub mod stats;
