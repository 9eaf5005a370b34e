//! Matrices filled from the uniform and Gaussian distributions.
//!
//! Each constructor validates its parameters, allocates, optionally reseeds
//! the sampler and only then draws, one value per element in row-major
//! order. Reseeding a shared sampler is visible to every later draw from it.

use serde::{Deserialize, Serialize};

use crate::construct::Dims;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::sampler::{self, Sampler};
use crate::storage::{alloc_buffer, Storage};

/// Parameters of a Gaussian fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussParams {
    pub mu: f64,
    pub sigma: f64,
    pub dims: Dims,
    /// Reseeds the sampler before drawing.
    pub seed: Option<u64>,
}

impl Default for GaussParams {
    fn default() -> Self {
        Self {
            mu: 0.0,
            sigma: 1.0,
            dims: Dims::default(),
            seed: None,
        }
    }
}

/// Parameters of a uniform fill over `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformParams {
    pub lower: f64,
    pub upper: f64,
    pub dims: Dims,
    /// Reseeds the sampler before drawing.
    pub seed: Option<u64>,
}

impl Default for UniformParams {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
            dims: Dims::default(),
            seed: None,
        }
    }
}

impl Matrix {
    /// A Gaussian matrix drawn from the process-wide sampler.
    pub fn gauss(params: GaussParams) -> Result<Matrix> {
        sampler::with_global(|sampler| Matrix::gauss_with(sampler, params))
    }

    /// A Gaussian matrix drawn from `sampler`.
    pub fn gauss_with(sampler: &mut Sampler, params: GaussParams) -> Result<Matrix> {
        let GaussParams {
            mu,
            sigma,
            dims,
            seed,
        } = params;
        fill(sampler, dims, seed, |s| s.gauss(mu, sigma))
    }

    /// A uniform matrix drawn from the process-wide sampler.
    pub fn uniform(params: UniformParams) -> Result<Matrix> {
        sampler::with_global(|sampler| Matrix::uniform_with(sampler, params))
    }

    /// A uniform matrix drawn from `sampler`; `lower > upper` is rejected
    /// before anything is allocated.
    pub fn uniform_with(sampler: &mut Sampler, params: UniformParams) -> Result<Matrix> {
        let UniformParams {
            lower,
            upper,
            dims,
            seed,
        } = params;
        if lower > upper {
            return Err(Error::invalid_value(format!(
                "lower bound cannot be greater than upper bound: ({lower:.3}, {upper:.3})"
            )));
        }
        fill(sampler, dims, seed, |s| s.uniform(lower, upper))
    }
}

fn fill(
    sampler: &mut Sampler,
    dims: Dims,
    seed: Option<u64>,
    mut draw: impl FnMut(&mut Sampler) -> f64,
) -> Result<Matrix> {
    let mut data = alloc_buffer(dims.size())?;
    if let Some(seed) = seed {
        sampler.seed(seed);
    }
    data.extend((0..dims.size()).map(|_| draw(sampler)));
    Ok(Matrix::from_storage(
        dims.rows(),
        dims.cols(),
        Storage::from_vec(data),
    ))
}
