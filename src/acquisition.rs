//! Acquisition strategies scoring candidate positions from the surrogate.

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::field::Surrogate;
use crate::Point;

/// Default exploration weight for [`Acquisition::Ucb`].
pub const DEFAULT_KAPPA: f64 = 0.5;
/// Default noise level for [`Acquisition::Thompson`].
pub const DEFAULT_THOMPSON_SIGMA: f64 = 5.0;

/// How a candidate position is scored.
///
/// Scores are minimized by the move optimizer, so every variant negates
/// the quantity it wants to maximize. The variant is chosen once at
/// environment construction; there is no switching mid-episode.
#[derive(Clone, Copy, Debug)]
pub enum Acquisition {
    /// Upper confidence bound: maximize `mean + kappa * std`.
    Ucb { kappa: f64 },
    /// Noisy-greedy stand-in for Thompson sampling: maximize the mean plus
    /// zero-mean Gaussian noise drawn fresh on every evaluation. The noise
    /// is independent per call, not a coherent posterior function draw.
    Thompson { sigma: f64 },
    /// Pure uncertainty seeking: maximize `std`, ignoring the mean.
    Entropy,
}

impl Default for Acquisition {
    fn default() -> Self {
        Acquisition::Ucb {
            kappa: DEFAULT_KAPPA,
        }
    }
}

impl Acquisition {
    /// Scores a candidate position; lower is better.
    ///
    /// All variants share the repeated-draw uncertainty estimate, so
    /// switching strategies never changes the surrogate call pattern.
    pub fn score(
        &self,
        model: &dyn Surrogate,
        at: &Point,
        draws: usize,
        rng: &mut dyn RngCore,
    ) -> f64 {
        let (mean, std_dev) = model.predict_with_uncertainty(at, draws, rng);
        match *self {
            Acquisition::Ucb { kappa } => -(mean + kappa * std_dev),
            Acquisition::Thompson { sigma } => {
                let noise: f64 = rng.sample(StandardNormal);
                -mean + sigma * noise
            }
            Acquisition::Entropy => -std_dev,
        }
    }
}
