//! Seam-free noise sampling for planet surface maps.
//!
//! Two mappings, both built on the same trick: feed trigonometric loops into
//! a higher-dimensional noise function so that coordinates which must meet
//! (texture edges) resolve to the identical lattice point.
//!
//! - [`CylindricalNoise`]: equirectangular planet maps. Longitude (`u`) wraps,
//!   latitude (`v`) does not — `u=0` and `u=1` trace the same meridian.
//! - [`ToroidalNoise`]: detail surfaces (biome, lava, ice) that tile in both
//!   directions: UV mapped onto a 4-D torus.
//!
//! `frequency` is the loop radius in noise-space; larger values cross more
//! lattice cells per revolution and give higher-frequency patterns.

use std::f64::consts::TAU;

use noise::NoiseFn;

/// Horizontal-wrapping sampler for equirectangular maps.
pub struct CylindricalNoise<N> {
    noise: N,
    /// Loop radius in noise-space; also scales the latitude axis.
    pub frequency: f64,
}

impl<N: NoiseFn<f64, 3>> CylindricalNoise<N> {
    pub fn new(noise: N, frequency: f64) -> Self {
        Self { noise, frequency }
    }

    /// Sample at `(u, v)` with `u` = longitude fraction (wraps), `v` =
    /// latitude fraction (clamps naturally; poles are `v = 0` and `v = 1`).
    pub fn get(&self, u: f64, v: f64) -> f64 {
        let nx = (TAU * u).cos() * self.frequency;
        let ny = (TAU * u).sin() * self.frequency;
        let nz = v * self.frequency;
        self.noise.get([nx, ny, nz])
    }
}

/// Fully tileable sampler: UV on a 4-D torus.
pub struct ToroidalNoise<N> {
    noise: N,
    pub frequency: f64,
}

impl<N: NoiseFn<f64, 4>> ToroidalNoise<N> {
    pub fn new(noise: N, frequency: f64) -> Self {
        Self { noise, frequency }
    }

    /// Sample at normalized UV; both axes wrap with no seam.
    pub fn get(&self, u: f64, v: f64) -> f64 {
        let nx = (TAU * u).cos() * self.frequency;
        let ny = (TAU * u).sin() * self.frequency;
        let nz = (TAU * v).cos() * self.frequency;
        let nw = (TAU * v).sin() * self.frequency;
        self.noise.get([nx, ny, nz, nw])
    }
}

/// Map a raw noise sample from `[-1, 1]` to `[0, 1]`.
#[inline]
pub fn normalize(v: f64) -> f64 {
    (v * 0.5 + 0.5).clamp(0.0, 1.0)
}
