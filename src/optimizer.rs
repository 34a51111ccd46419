//! Bounded local search converting acquisition scores into movement.

use nalgebra as na;
use rand::RngCore;

use crate::acquisition::Acquisition;
use crate::field::Surrogate;
use crate::{Point, Vector};

/// Maximum displacement per axis per tick, in map units.
pub const MAX_STEP: f64 = 1.0;

/// A bounded continuous minimizer.
///
/// The contract is deliberately lenient: given an objective, a starting
/// point, and the map rectangle, return a local optimum within the
/// rectangle. No global optimality is guaranteed, and the seed point is a
/// valid result when no improving point is found within the internal
/// budget. Non-convergence is not an error.
pub trait Minimizer {
    /// Returns an in-bounds local minimizer of `objective`, seeded at `start`.
    fn minimize(
        &self,
        objective: &mut dyn FnMut(&Point) -> f64,
        start: Point,
        size: (f64, f64),
    ) -> Point;
}

/// Derivative-free Nelder-Mead simplex search with every candidate
/// clipped into the map rectangle.
pub struct NelderMead {
    /// Iteration budget.
    pub max_iters: usize,
    /// Stop once the simplex scores are this close.
    pub tolerance: f64,
    /// Edge length of the initial simplex.
    pub init_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        NelderMead {
            max_iters: 80,
            tolerance: 1e-6,
            init_step: 1.0,
        }
    }
}

impl Minimizer for NelderMead {
    fn minimize(
        &self,
        objective: &mut dyn FnMut(&Point) -> f64,
        start: Point,
        size: (f64, f64),
    ) -> Point {
        let clip = |p: Point| crate::clip_to_map(p, size);
        let start = clip(start);
        let mut simplex = vec![
            start,
            clip(start + Vector::new(self.init_step, 0.0)),
            clip(start + Vector::new(0.0, self.init_step)),
        ];
        let mut scores: Vec<f64> = simplex.iter().map(|p| objective(p)).collect();

        for _ in 0..self.max_iters {
            let mut order = [0, 1, 2];
            order.sort_by(|&a, &b| {
                scores[a]
                    .partial_cmp(&scores[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let [best, mid, worst] = order;
            if (scores[worst] - scores[best]).abs() < self.tolerance {
                break;
            }
            let centroid = na::center(&simplex[best], &simplex[mid]);

            // Reflection.
            let reflected = clip(centroid + (centroid - simplex[worst]));
            let reflected_score = objective(&reflected);
            if reflected_score < scores[best] {
                // Expansion.
                let expanded = clip(centroid + 2.0 * (centroid - simplex[worst]));
                let expanded_score = objective(&expanded);
                if expanded_score < reflected_score {
                    simplex[worst] = expanded;
                    scores[worst] = expanded_score;
                } else {
                    simplex[worst] = reflected;
                    scores[worst] = reflected_score;
                }
            } else if reflected_score < scores[mid] {
                simplex[worst] = reflected;
                scores[worst] = reflected_score;
            } else {
                // Contraction.
                let contracted = clip(centroid + 0.5 * (simplex[worst] - centroid));
                let contracted_score = objective(&contracted);
                if contracted_score < scores[worst] {
                    simplex[worst] = contracted;
                    scores[worst] = contracted_score;
                } else {
                    // Shrink toward the best vertex.
                    for &i in &[mid, worst] {
                        simplex[i] = na::center(&simplex[best], &simplex[i]);
                        scores[i] = objective(&simplex[i]);
                    }
                }
            }
        }

        let mut best = 0;
        for i in 1..simplex.len() {
            if scores[i] < scores[best] {
                best = i;
            }
        }
        simplex[best]
    }
}

/// Converts a bounded optimum of the acquisition score into a clipped
/// per-tick displacement.
pub struct MoveOptimizer<M: Minimizer = NelderMead> {
    minimizer: M,
    draws: usize,
}

impl MoveOptimizer<NelderMead> {
    /// A move optimizer backed by the default simplex search, estimating
    /// uncertainty from `draws` posterior draws per evaluation.
    pub fn new(draws: usize) -> Self {
        MoveOptimizer {
            minimizer: NelderMead::default(),
            draws,
        }
    }
}

impl<M: Minimizer> MoveOptimizer<M> {
    /// A move optimizer over a custom minimizer.
    pub fn with_minimizer(minimizer: M, draws: usize) -> Self {
        MoveOptimizer { minimizer, draws }
    }

    /// Finds the in-bounds optimum of `acquisition` seeded at `from` and
    /// returns the displacement toward it, each axis clipped to
    /// [`MAX_STEP`] map units. However far the optimum lies, the agent
    /// moves at most one unit per axis per tick.
    pub fn compute_move(
        &self,
        model: &dyn Surrogate,
        acquisition: &Acquisition,
        from: Point,
        size: (f64, f64),
        rng: &mut dyn RngCore,
    ) -> Vector {
        let draws = self.draws;
        let mut objective = |p: &Point| acquisition.score(model, p, draws, rng);
        let target = self.minimizer.minimize(&mut objective, from, size);
        let step = target - from;
        Vector::new(
            na::clamp(step.x, -MAX_STEP, MAX_STEP),
            na::clamp(step.y, -MAX_STEP, MAX_STEP),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn finds_interior_minimum() {
        let nm = NelderMead::default();
        let target = Point::new(3.0, 7.0);
        let mut bowl = |p: &Point| (*p - target).norm_squared();
        let found = nm.minimize(&mut bowl, Point::new(5.0, 5.0), (10.0, 10.0));
        assert!((found - target).norm() < 0.5, "found {:?}", found);
    }

    #[test]
    fn clamps_to_the_map_rectangle() {
        let nm = NelderMead::default();
        let target = Point::new(20.0, 5.0);
        let mut bowl = |p: &Point| (*p - target).norm_squared();
        let found = nm.minimize(&mut bowl, Point::new(5.0, 5.0), (10.0, 10.0));
        assert!(found.x > 9.0 && found.x <= 10.0, "found {:?}", found);
        assert!((found.y - 5.0).abs() < 1.0, "found {:?}", found);
    }

    #[test]
    fn returns_the_seed_when_nothing_improves() {
        let nm = NelderMead::default();
        let start = Point::new(4.0, 4.0);
        let found = nm.minimize(&mut |_: &Point| 1.0, start, (10.0, 10.0));
        assert_eq!(found, start);
    }

    /// Mean rises eastward while uncertainty rises westward.
    struct PlaneField;

    impl Surrogate for PlaneField {
        fn predict_mean(&self, at: &Point) -> f64 {
            at.x
        }

        fn predict_sample(&self, at: &Point, _rng: &mut dyn RngCore) -> f64 {
            at.x
        }

        fn predict_with_uncertainty(
            &self,
            at: &Point,
            _draws: usize,
            _rng: &mut dyn RngCore,
        ) -> (f64, f64) {
            (at.x, (10.0 - at.x).max(0.0))
        }
    }

    #[test]
    fn moves_are_clipped_per_axis() {
        let optimizer = MoveOptimizer::new(4);
        let mut rng = StdRng::seed_from_u64(0);
        let mv = optimizer.compute_move(
            &PlaneField,
            &Acquisition::Ucb { kappa: 0.5 },
            Point::new(5.0, 5.0),
            (10.0, 10.0),
            &mut rng,
        );
        assert!(mv.x.abs() <= MAX_STEP + 1e-9);
        assert!(mv.y.abs() <= MAX_STEP + 1e-9);
    }

    #[test]
    fn strategies_pull_in_different_directions() {
        let optimizer = MoveOptimizer::new(4);
        let from = Point::new(5.0, 5.0);
        let size = (10.0, 10.0);
        let mut rng = StdRng::seed_from_u64(0);

        // UCB with a mild kappa chases the rising mean eastward.
        let ucb = optimizer.compute_move(
            &PlaneField,
            &Acquisition::Ucb { kappa: 0.5 },
            from,
            size,
            &mut rng,
        );
        assert!(ucb.x > 0.5, "ucb move {:?}", ucb);

        // Entropy chases the rising uncertainty westward.
        let entropy =
            optimizer.compute_move(&PlaneField, &Acquisition::Entropy, from, size, &mut rng);
        assert!(entropy.x < -0.5, "entropy move {:?}", entropy);
    }
}
