// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jerry Snitselaar and contributors

// ABOUTME: Generic dense 3D grid with flat memory layout, the volumetric sibling of PhysicsGrid
// ABOUTME: Backs the velocity arrays (u, v, w, un, vn, wn) and the solver's lambda/coefficient fields

/// Dense 3D grid over `(nx, ny, nz)` stored as one contiguous `Vec<T>`.
///
/// Index order is x-fastest, then y, then z (`idx = (k * ny + j) * nx + i`),
/// matching the `[i, j, k]` indexing used throughout the solver formulas.
#[derive(Clone, Debug)]
pub struct Grid3<T> {
    data: Vec<T>,
    nx: usize,
    ny: usize,
    nz: usize,
}

impl<T: Clone> Grid3<T> {
    pub fn new(nx: usize, ny: usize, nz: usize, default: T) -> Self {
        Self {
            data: vec![default; nx * ny * nz],
            nx,
            ny,
            nz,
        }
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(
            i < self.nx && j < self.ny && k < self.nz,
            "Grid3 index out of bounds: ({}, {}, {}) for {}x{}x{}",
            i,
            j,
            k,
            self.nx,
            self.ny,
            self.nz
        );
        (k * self.ny + j) * self.nx + i
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> &T {
        unsafe { self.data.get_unchecked(self.index(i, j, k)) }
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: T) {
        let idx = self.index(i, j, k);
        unsafe {
            *self.data.get_unchecked_mut(idx) = value;
        }
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize, j: usize, k: usize) -> &mut T {
        let idx = self.index(i, j, k);
        unsafe { self.data.get_unchecked_mut(idx) }
    }

    pub fn fill(&mut self, value: T) {
        for item in &mut self.data {
            *item = value.clone();
        }
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate all `(i, j, k, value)` tuples in storage order.
    pub fn iter_coords(&self) -> impl Iterator<Item = (usize, usize, usize, &T)> + '_ {
        let (nx, ny) = (self.nx, self.ny);
        (0..self.nz).flat_map(move |k| {
            (0..ny).flat_map(move |j| (0..nx).map(move |i| (i, j, k, self.get(i, j, k))))
        })
    }
}

impl Grid3<f32> {
    pub fn sum_abs(&self) -> f64 {
        self.data.iter().map(|v| v.abs() as f64).sum()
    }

    pub fn is_all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
