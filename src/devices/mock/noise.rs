//! Seeded noise source for the simulated driver

use crate::types::Vector3;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, StandardNormal, Uniform};

#[derive(Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    /// Seed 0 draws from entropy; any other seed is reproducible.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Add independent Gaussian noise to each axis
    pub fn jitter(&mut self, v: Vector3, stddev: f64) -> Vector3 {
        Vector3::new(
            v.x + self.gaussian(stddev),
            v.y + self.gaussian(stddev),
            v.z + self.gaussian(stddev),
        )
    }

    /// True with the given probability
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        Uniform::new(0.0f64, 1.0).sample(&mut self.rng) < probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_jitter() {
        let mut a = NoiseGenerator::new(7);
        let mut b = NoiseGenerator::new(7);
        for _ in 0..50 {
            assert_eq!(a.jitter(Vector3::ZERO, 1.0), b.jitter(Vector3::ZERO, 1.0));
        }
    }

    #[test]
    fn test_zero_stddev_is_exact() {
        let mut noise = NoiseGenerator::new(7);
        let v = Vector3::new(1.0, -2.0, 3.0);
        assert_eq!(noise.jitter(v, 0.0), v);
    }

    #[test]
    fn test_chance_bounds() {
        let mut noise = NoiseGenerator::new(7);
        assert!((0..1000).all(|_| !noise.chance(0.0)));
        assert!((0..1000).all(|_| noise.chance(1.0)));
    }
}
