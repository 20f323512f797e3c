//! Noise mechanisms
//!
//! Every sampler is generic over `R: Rng + CryptoRng`: predictable noise voids
//! the privacy guarantee, so a non-cryptographic generator does not type-check.
//! Production callers pass [`rand::rngs::OsRng`].

use super::settings::{DifferentialPrivacySetting, NoiseMechanism};
use rand::{CryptoRng, Rng};
use std::f64::consts::PI;

/// Laplace scale `b = sensitivity / epsilon`
pub fn laplace_scale(sensitivity: f64, epsilon: f64) -> f64 {
    sensitivity / epsilon
}

/// Gaussian standard deviation `sensitivity * sqrt(2 ln(1.25 / delta)) / epsilon`
pub fn gaussian_sigma(sensitivity: f64, epsilon: f64, delta: f64) -> f64 {
    sensitivity * (2.0 * (1.25 / delta).ln()).sqrt() / epsilon
}

/// Draw Laplace(0, scale) noise by inverse transform
///
/// `u` is uniform on the open interval (-0.5, 0.5); the closed end is
/// redrawn so `ln(1 - 2|u|)` stays finite.
pub fn sample_laplace<R: Rng + CryptoRng>(rng: &mut R, scale: f64) -> f64 {
    let u = loop {
        let candidate: f64 = rng.gen::<f64>() - 0.5;
        if candidate > -0.5 {
            break candidate;
        }
    };
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

/// Draw N(0, sigma^2) noise with the Box-Muller transform
pub fn sample_gaussian<R: Rng + CryptoRng>(rng: &mut R, sigma: f64) -> f64 {
    // Keep u1 away from zero so ln(u1) is finite
    let u1 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    z * sigma
}

/// Draw noise for a validated setting
///
/// The exponential mechanism selects among categories; for a numeric field
/// it degrades to the Laplace formula.
pub fn sample_noise<R: Rng + CryptoRng>(rng: &mut R, setting: &DifferentialPrivacySetting) -> f64 {
    match setting.mechanism() {
        NoiseMechanism::Laplace | NoiseMechanism::Exponential => {
            sample_laplace(rng, laplace_scale(setting.sensitivity(), setting.epsilon()))
        }
        NoiseMechanism::Gaussian => sample_gaussian(
            rng,
            gaussian_sigma(setting.sensitivity(), setting.epsilon(), setting.delta()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::privacy::PrivacyPolicy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const SAMPLES: usize = 20_000;

    fn mean_and_std(samples: &[f64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_laplace_is_centered_with_expected_spread() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let scale = 2.0;
        let samples: Vec<f64> = (0..SAMPLES).map(|_| sample_laplace(&mut rng, scale)).collect();
        let (mean, std) = mean_and_std(&samples);
        let expected = scale * 2f64.sqrt();
        assert!(mean.abs() < 0.15, "mean {mean}");
        assert!((std - expected).abs() / expected < 0.2, "std {std} vs {expected}");
        assert!(samples.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_gaussian_is_centered_with_expected_spread() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let sigma = 3.0;
        let samples: Vec<f64> = (0..SAMPLES).map(|_| sample_gaussian(&mut rng, sigma)).collect();
        let (mean, std) = mean_and_std(&samples);
        assert!(mean.abs() < 0.15, "mean {mean}");
        assert!((std - sigma).abs() / sigma < 0.2, "std {std} vs {sigma}");
    }

    #[test]
    fn test_calibration_formulas() {
        assert_eq!(laplace_scale(1.0, 0.5), 2.0);
        let sigma = gaussian_sigma(1.0, 1.0, 1e-5);
        assert!((sigma - (2.0 * (1.25e5f64).ln()).sqrt()).abs() < 1e-12);
    }

    fn setting(mechanism: NoiseMechanism, delta: f64) -> DifferentialPrivacySetting {
        let policy = PrivacyPolicy::default();
        DifferentialPrivacySetting::new(0.5, delta, 2.0, mechanism, "ds:vitals", &policy).unwrap()
    }

    #[test]
    fn test_exponential_draws_match_laplace() {
        let laplace = setting(NoiseMechanism::Laplace, 0.0);
        let exponential = setting(NoiseMechanism::Exponential, 0.0);
        let mut a = ChaCha20Rng::seed_from_u64(42);
        let mut b = ChaCha20Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(sample_noise(&mut a, &laplace), sample_noise(&mut b, &exponential));
        }
    }

    #[test]
    fn test_sample_noise_dispatches_by_mechanism() {
        let laplace = setting(NoiseMechanism::Laplace, 0.0);
        let mut a = ChaCha20Rng::seed_from_u64(5);
        let mut b = ChaCha20Rng::seed_from_u64(5);
        assert_eq!(sample_noise(&mut a, &laplace), sample_laplace(&mut b, 4.0));

        let gaussian = setting(NoiseMechanism::Gaussian, 1e-5);
        let sigma = gaussian_sigma(2.0, 0.5, 1e-5);
        let mut a = ChaCha20Rng::seed_from_u64(9);
        let mut b = ChaCha20Rng::seed_from_u64(9);
        assert_eq!(sample_noise(&mut a, &gaussian), sample_gaussian(&mut b, sigma));
    }

    #[test]
    fn test_os_rng_is_accepted() {
        let noise = sample_laplace(&mut rand::rngs::OsRng, 1.0);
        assert!(noise.is_finite());
    }
}
