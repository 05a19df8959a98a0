//! Slab storage and 3D-to-linear indexing.
//!
//! Layout is Z-major: `index(layer, i, j) = layer * n² + i * n + j`, where
//! `i` runs along X and `j` along Y. Every component addresses grid data
//! through `SlabShape`.

use std::ops::Range;

/// Dimensions of a block of `layers` planes of `n × n` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabShape {
    pub n: usize,
    pub layers: usize,
}

impl SlabShape {
    pub fn new(n: usize, layers: usize) -> Self {
        Self { n, layers }
    }

    pub fn plane_len(&self) -> usize {
        self.n * self.n
    }

    pub fn len(&self) -> usize {
        self.layers * self.plane_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset of `(i, j)` within one plane.
    #[inline]
    pub fn plane_index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.n && j < self.n, "({i}, {j}) outside {0}x{0} plane", self.n);
        i * self.n + j
    }

    #[inline]
    pub fn index(&self, layer: usize, i: usize, j: usize) -> usize {
        debug_assert!(layer < self.layers, "layer {layer} outside {} layers", self.layers);
        layer * self.plane_len() + self.plane_index(i, j)
    }

    /// Linear range of plane `layer`.
    pub fn plane_range(&self, layer: usize) -> Range<usize> {
        let start = layer * self.plane_len();
        start..start + self.plane_len()
    }
}

/// A rank's local block: owned layers `1..=layers-2` framed by two ghost
/// layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Slab {
    shape: SlabShape,
    data: Vec<f64>,
}

impl Slab {
    pub fn zeros(shape: SlabShape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn shape(&self) -> SlabShape {
        self.shape
    }

    /// Number of owned (non-ghost) layers.
    pub fn local_height(&self) -> usize {
        self.shape.layers - 2
    }

    pub fn get(&self, layer: usize, i: usize, j: usize) -> f64 {
        self.data[self.shape.index(layer, i, j)]
    }

    pub fn set(&mut self, layer: usize, i: usize, j: usize, value: f64) {
        let idx = self.shape.index(layer, i, j);
        self.data[idx] = value;
    }

    pub fn plane(&self, layer: usize) -> &[f64] {
        &self.data[self.shape.plane_range(layer)]
    }

    pub fn plane_mut(&mut self, layer: usize) -> &mut [f64] {
        let range = self.shape.plane_range(layer);
        &mut self.data[range]
    }

    /// Owned layers only, contiguous.
    pub fn owned(&self) -> &[f64] {
        let plane = self.shape.plane_len();
        &self.data[plane..plane * (self.shape.layers - 1)]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Split into `(lower ghost, owned layers, upper ghost)` disjoint borrows.
    pub fn split_ghosts_mut(&mut self) -> (&mut [f64], &mut [f64], &mut [f64]) {
        let plane = self.shape.plane_len();
        let owned_len = plane * self.local_height();
        let (lower, rest) = self.data.split_at_mut(plane);
        let (owned, upper) = rest.split_at_mut(owned_len);
        (lower, owned, upper)
    }
}
