//! Signal sources and the surrogate model estimating the field they create.

use nalgebra as na;
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::error::SimError;
use crate::Point;

/// A stationary transmitter: a fixed position and the signal strength
/// measured there.
#[derive(Clone, Copy, Debug)]
pub struct SignalSource {
    pub position: Point,
    pub strength: f64,
}

/// Draws `count` sources uniformly over the map, with strengths uniform
/// in `strength_range`.
pub fn random_sources<R: Rng + ?Sized>(
    count: usize,
    size: (f64, f64),
    strength_range: (f64, f64),
    rng: &mut R,
) -> Vec<SignalSource> {
    (0..count)
        .map(|_| SignalSource {
            position: Point::new(rng.gen_range(0.0..size.0), rng.gen_range(0.0..size.1)),
            strength: rng.gen_range(strength_range.0..strength_range.1),
        })
        .collect()
}

/// Point-wise access to a fitted estimate of the signal field.
///
/// `predict_sample` is a stochastic draw from the model's posterior at the
/// given point, so repeated draws carry the model's uncertainty and the
/// Monte-Carlo estimate in [`Surrogate::predict_with_uncertainty`] is
/// meaningful for any implementation.
pub trait Surrogate {
    /// Posterior mean estimate at a point.
    fn predict_mean(&self, at: &Point) -> f64;

    /// One posterior draw at a point.
    fn predict_sample(&self, at: &Point, rng: &mut dyn RngCore) -> f64;

    /// Mean and spread of `draws` independent posterior draws at a point.
    ///
    /// The spread is the population standard deviation of the draws; a
    /// single draw therefore yields a spread of exactly `0.0`.
    fn predict_with_uncertainty(
        &self,
        at: &Point,
        draws: usize,
        rng: &mut dyn RngCore,
    ) -> (f64, f64) {
        let samples: Vec<f64> = (0..draws.max(1))
            .map(|_| self.predict_sample(at, rng))
            .collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        (mean, variance.sqrt())
    }
}

/// Kernel and fitting hyperparameters for [`GpSurrogate`].
#[derive(Clone, Copy, Debug)]
pub struct GpHyperParams {
    /// Length scale of the squared-exponential kernel, in map units.
    pub length_scale: f64,
    /// Output scale of the kernel.
    pub signal_variance: f64,
    /// Observation noise added to the kernel diagonal.
    pub noise_variance: f64,
    /// Random restarts tried on top of the base parameters at fit time.
    pub restarts: usize,
}

impl Default for GpHyperParams {
    fn default() -> Self {
        GpHyperParams {
            length_scale: 10.0,
            signal_variance: 1.0,
            noise_variance: 1e-6,
            restarts: 5,
        }
    }
}

/// Constant-scaled squared-exponential covariance.
fn kernel(a: &Point, b: &Point, params: &GpHyperParams) -> f64 {
    let d2 = na::distance_squared(a, b);
    params.signal_variance * (-d2 / (2.0 * params.length_scale * params.length_scale)).exp()
}

/// An exact Gaussian-process regressor over the source strengths.
///
/// A value of this type is always fitted; construction happens through
/// [`GpSurrogate::fit`]. Strengths are centered by their mean before the
/// solve, so predictions far from every source regress to that mean.
pub struct GpSurrogate {
    train: Vec<Point>,
    alpha: na::DVector<f64>,
    chol: na::Cholesky<f64, na::Dynamic>,
    prior_mean: f64,
    params: GpHyperParams,
}

impl GpSurrogate {
    /// Trains the surrogate on the given labeled points.
    ///
    /// Tries the base hyperparameters plus `params.restarts` randomly
    /// perturbed candidates and keeps the fit with the highest log
    /// marginal likelihood.
    pub fn fit<R: Rng + ?Sized>(
        sources: &[SignalSource],
        params: GpHyperParams,
        rng: &mut R,
    ) -> Result<Self, SimError> {
        if sources.is_empty() {
            return Err(SimError::EmptySources);
        }
        let train: Vec<Point> = sources.iter().map(|s| s.position).collect();
        let strengths: Vec<f64> = sources.iter().map(|s| s.strength).collect();
        let prior_mean = strengths.iter().sum::<f64>() / strengths.len() as f64;
        let centered =
            na::DVector::from_iterator(strengths.len(), strengths.iter().map(|s| s - prior_mean));

        let mut candidates = vec![params];
        for _ in 0..params.restarts {
            let mut candidate = params;
            candidate.length_scale *= rng.gen_range(0.25f64.ln()..4.0f64.ln()).exp();
            candidate.signal_variance *= rng.gen_range(0.25f64.ln()..4.0f64.ln()).exp();
            candidates.push(candidate);
        }

        let mut best: Option<(f64, Self)> = None;
        for candidate in candidates {
            let fitted = match Self::solve(&train, &centered, prior_mean, candidate) {
                Some(f) => f,
                None => continue,
            };
            let score = fitted.log_marginal(&centered);
            if best.as_ref().map_or(true, |(incumbent, _)| score > *incumbent) {
                best = Some((score, fitted));
            }
        }
        let (score, fitted) = best.ok_or(SimError::NotPositiveDefinite)?;
        log::debug!(
            "fitted signal model on {} sources (length scale {:.3}, log marginal likelihood {:.3})",
            sources.len(),
            fitted.params.length_scale,
            score
        );
        Ok(fitted)
    }

    /// Factorizes the kernel matrix for one hyperparameter candidate.
    ///
    /// Steps up the diagonal jitter when the factorization fails; `None`
    /// means the matrix stayed non-positive-definite at every level.
    fn solve(
        train: &[Point],
        centered: &na::DVector<f64>,
        prior_mean: f64,
        params: GpHyperParams,
    ) -> Option<Self> {
        let n = train.len();
        for boost in &[1.0, 1e2, 1e4] {
            let noise = params.noise_variance * boost;
            let gram = na::DMatrix::from_fn(n, n, |i, j| {
                let k = kernel(&train[i], &train[j], &params);
                if i == j {
                    k + noise
                } else {
                    k
                }
            });
            if let Some(chol) = na::Cholesky::new(gram) {
                let alpha = chol.solve(centered);
                return Some(GpSurrogate {
                    train: train.to_vec(),
                    alpha,
                    chol,
                    prior_mean,
                    params: GpHyperParams {
                        noise_variance: noise,
                        ..params
                    },
                });
            }
        }
        None
    }

    /// Log marginal likelihood of the training strengths under this fit.
    fn log_marginal(&self, centered: &na::DVector<f64>) -> f64 {
        let n = centered.len() as f64;
        let log_det: f64 = self.chol.l().diagonal().iter().map(|d| d.ln()).sum();
        -0.5 * centered.dot(&self.alpha) - log_det - 0.5 * n * (2.0 * std::f64::consts::PI).ln()
    }

    /// Kernel column between the training points and a query point.
    fn cross(&self, at: &Point) -> na::DVector<f64> {
        na::DVector::from_iterator(
            self.train.len(),
            self.train.iter().map(|t| kernel(t, at, &self.params)),
        )
    }

    /// Posterior variance at a point, clamped at zero.
    fn predict_variance(&self, at: &Point) -> f64 {
        let k_star = self.cross(at);
        let solved = self.chol.solve(&k_star);
        let variance =
            self.params.signal_variance + self.params.noise_variance - k_star.dot(&solved);
        variance.max(0.0)
    }
}

impl Surrogate for GpSurrogate {
    fn predict_mean(&self, at: &Point) -> f64 {
        self.prior_mean + self.cross(at).dot(&self.alpha)
    }

    fn predict_sample(&self, at: &Point, rng: &mut dyn RngCore) -> f64 {
        let std_dev = self.predict_variance(at).sqrt();
        let z: f64 = rng.sample(StandardNormal);
        self.predict_mean(at) + std_dev * z
    }
}
