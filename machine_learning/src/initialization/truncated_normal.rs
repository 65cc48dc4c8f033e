use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// How many standard deviations away from the mean a sample may land.
const CUTOFF: f32 = 2.;

/// A zero mean normal distribution whose samples farther than two standard deviations
/// from the mean are drawn again.
#[derive(Clone, Copy, Debug)]
pub struct TruncatedNormal {
    std_dev: f32,
}

impl TruncatedNormal {
    /// Creates a new `TruncatedNormal` distribution.
    ///
    /// # Arguments
    /// * `std_dev` - The standard deviation of the underlying normal.
    pub fn new(std_dev: f32) -> Self {
        Self { std_dev }
    }
}

impl Distribution<f32> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        loop {
            let z: f32 = StandardNormal.sample(rng);
            if z.abs() <= CUTOFF {
                return z * self.std_dev;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn samples_stay_within_the_cutoff() {
        let dist = TruncatedNormal::new(0.5);
        let mut rng = StdRng::seed_from_u64(7);

        let samples: Vec<f32> = (&dist).sample_iter(&mut rng).take(10_000).collect();
        assert!(samples.iter().all(|v| v.abs() <= 1.));

        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.02, "mean = {mean}");
    }
}
