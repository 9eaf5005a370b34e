//! Pseudo-random draws for random matrix fills.
//!
//! A [`Sampler`] owns one generator stream and hands out uniform and Gaussian
//! draws from it. Gaussian draws use the Box-Muller transform, which yields
//! two values per pair of uniforms; the second one is cached for the next call.
//!
//! The process-wide sampler behind [`with_global`] is what the `gauss` and
//! `uniform` constructors use when no sampler is passed in explicitly.

use std::f64::consts::TAU;
use std::sync::LazyLock;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

static GLOBAL_SAMPLER: LazyLock<Mutex<Sampler>> =
    LazyLock::new(|| Mutex::new(Sampler::from_entropy()));

/// A seedable source of uniform and Gaussian draws.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
    cached_gauss: Option<f64>,
}

impl Sampler {
    /// Creates a sampler seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            cached_gauss: None,
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            cached_gauss: None,
        }
    }

    /// Restarts the stream from `seed` and drops any cached Gaussian draw.
    pub fn seed(&mut self, seed: u64) {
        debug!(seed, "reseeding sampler");
        self.rng = StdRng::seed_from_u64(seed);
        self.cached_gauss = None;
    }

    /// Restarts the stream from OS entropy.
    pub fn reseed_from_entropy(&mut self) {
        debug!("reseeding sampler from entropy");
        self.rng = StdRng::from_entropy();
        self.cached_gauss = None;
    }

    pub fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// A draw from the standard normal distribution.
    pub fn next_gauss(&mut self) -> f64 {
        if let Some(cached) = self.cached_gauss.take() {
            return cached;
        }
        let angle = self.next_uniform() * TAU;
        // 1 - u lies in (0, 1], keeping ln finite
        let radius = (-2.0 * (1.0 - self.next_uniform()).ln()).sqrt();
        self.cached_gauss = Some(angle.sin() * radius);
        angle.cos() * radius
    }

    /// A draw from `[lower, upper)`. Bounds are not checked here.
    pub fn uniform(&mut self, lower: f64, upper: f64) -> f64 {
        self.next_uniform() * (upper - lower) + lower
    }

    /// A draw from the normal distribution with mean `mu` and deviation `sigma`.
    pub fn gauss(&mut self, mu: f64, sigma: f64) -> f64 {
        self.next_gauss() * sigma + mu
    }
}

/// Runs `f` with exclusive access to the process-wide sampler.
///
/// Everything `f` does with the sampler is one serial unit with respect to
/// other callers, so a reseed followed by draws cannot be interleaved.
pub fn with_global<R>(f: impl FnOnce(&mut Sampler) -> R) -> R {
    let mut sampler = GLOBAL_SAMPLER.lock();
    f(&mut sampler)
}

/// Reseeds the process-wide sampler; `None` reseeds from OS entropy.
pub fn seed(seed: Option<u64>) {
    with_global(|sampler| match seed {
        Some(seed) => sampler.seed(seed),
        None => sampler.reseed_from_entropy(),
    });
}
