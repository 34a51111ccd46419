//! The drone fleet: per-agent state advanced one synchronized tick at a time.

use rand::Rng;

use crate::{clip_to_map, Point, Vector};

/// One drone: a position and the trail of positions it has visited.
pub struct Drone {
    position: Point,
    trajectory: Vec<Point>,
}

impl Drone {
    fn new(position: Point) -> Self {
        Drone {
            position,
            trajectory: Vec::new(),
        }
    }

    /// Current position.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Positions after each completed tick, oldest first.
    ///
    /// The reset position is not recorded, so the length equals the
    /// number of ticks completed since the last reset.
    pub fn trajectory(&self) -> &[Point] {
        &self.trajectory
    }
}

/// All drones plus the episode tick counter.
///
/// Positions are owned and mutated here exclusively; every update clips
/// back into the map rectangle.
pub struct FleetState {
    drones: Vec<Drone>,
    size: (f64, f64),
    episode_limit: u32,
    tick: u32,
}

impl FleetState {
    /// An empty fleet; populate with [`FleetState::reset`].
    pub fn new(size: (f64, f64), episode_limit: u32) -> Self {
        FleetState {
            drones: Vec::new(),
            size,
            episode_limit,
            tick: 0,
        }
    }

    /// Scatters `n_agents` drones uniformly over the map and zeroes the
    /// tick counter. Previous trajectories are discarded.
    pub fn reset<R: Rng + ?Sized>(&mut self, n_agents: usize, rng: &mut R) {
        self.drones = (0..n_agents)
            .map(|_| {
                Drone::new(Point::new(
                    rng.gen_range(0.0..self.size.0),
                    rng.gen_range(0.0..self.size.1),
                ))
            })
            .collect();
        self.tick = 0;
    }

    /// Applies one displacement per drone, clips the results to the map,
    /// extends trajectories, and advances the tick counter.
    ///
    /// Returns whether the episode limit has been reached.
    pub fn advance(&mut self, moves: &[Vector]) -> bool {
        debug_assert_eq!(moves.len(), self.drones.len());
        for (drone, mv) in self.drones.iter_mut().zip(moves) {
            let moved = clip_to_map(drone.position + *mv, self.size);
            drone.position = moved;
            drone.trajectory.push(moved);
        }
        self.tick += 1;
        self.tick >= self.episode_limit
    }

    /// Ticks completed since the last reset.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// The drones, in agent-index order.
    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reset_scatters_in_bounds() {
        let mut fleet = FleetState::new((50.0, 30.0), 100);
        let mut rng = StdRng::seed_from_u64(17);
        fleet.reset(20, &mut rng);
        assert_eq!(fleet.drones().len(), 20);
        for drone in fleet.drones() {
            let p = drone.position();
            assert!(p.x >= 0.0 && p.x <= 50.0);
            assert!(p.y >= 0.0 && p.y <= 30.0);
        }
    }

    #[test]
    fn advance_clips_and_records() {
        let mut fleet = FleetState::new((10.0, 10.0), 100);
        let mut rng = StdRng::seed_from_u64(1);
        fleet.reset(1, &mut rng);

        fleet.advance(&[Vector::new(-100.0, -100.0)]);
        assert_eq!(fleet.drones()[0].position(), Point::new(0.0, 0.0));

        fleet.advance(&[Vector::new(0.25, 100.0)]);
        assert_eq!(fleet.drones()[0].position(), Point::new(0.25, 10.0));

        assert_eq!(fleet.drones()[0].trajectory().len(), 2);
    }

    #[test]
    fn trajectory_length_tracks_ticks() {
        let mut fleet = FleetState::new((10.0, 10.0), 100);
        let mut rng = StdRng::seed_from_u64(2);
        fleet.reset(3, &mut rng);
        for k in 1..=7 {
            fleet.advance(&[Vector::new(0.1, 0.1); 3]);
            assert_eq!(fleet.tick(), k);
            for drone in fleet.drones() {
                assert_eq!(drone.trajectory().len(), k as usize);
            }
        }
    }

    #[test]
    fn reports_termination_at_the_limit() {
        let mut fleet = FleetState::new((10.0, 10.0), 3);
        let mut rng = StdRng::seed_from_u64(3);
        fleet.reset(2, &mut rng);
        let moves = [Vector::new(0.5, 0.0); 2];
        assert!(!fleet.advance(&moves));
        assert!(!fleet.advance(&moves));
        assert!(fleet.advance(&moves));
    }

    #[test]
    fn reset_discards_trajectories() {
        let mut fleet = FleetState::new((10.0, 10.0), 100);
        let mut rng = StdRng::seed_from_u64(4);
        fleet.reset(2, &mut rng);
        fleet.advance(&[Vector::new(0.5, 0.5); 2]);
        fleet.reset(2, &mut rng);
        assert_eq!(fleet.tick(), 0);
        for drone in fleet.drones() {
            assert!(drone.trajectory().is_empty());
        }
    }
}
