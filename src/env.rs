//! The environment facade consumed by an external multi-agent controller.

use std::collections::HashMap;
use std::path::PathBuf;

use nalgebra as na;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::acquisition::Acquisition;
use crate::error::SimError;
use crate::field::{random_sources, GpHyperParams, GpSurrogate, SignalSource, Surrogate};
use crate::fleet::{Drone, FleetState};
use crate::optimizer::MoveOptimizer;
use crate::render;

/// Number of discrete actions advertised to the controller.
pub const N_ACTIONS: usize = 5;
/// Length of one per-agent observation: x, y, predicted gain.
pub const OBS_DIM: usize = 3;

/// A per-agent observation: position plus the predicted signal gain there.
pub type Obs = na::Vector3<f64>;
/// Per-step auxiliary info; always empty.
pub type StepInfo = HashMap<String, f64>;

/// Where the episode-end artifacts are written.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub trajectory_path: PathBuf,
    pub heatmap_path: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            trajectory_path: "trajectories.png".into(),
            heatmap_path: "signal_heatmap.png".into(),
        }
    }
}

/// Environment construction parameters.
///
/// `Default` gives the standard setup: ten drones on a 100x100 map, ten
/// sources, 100-tick episodes, UCB acquisition, headless.
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// Fleet size.
    pub n_agents: usize,
    /// Map rectangle, as (width, height) with the origin at a corner.
    pub size: (f64, f64),
    /// Ticks per episode.
    pub episode_limit: u32,
    /// Signal sources drawn per episode.
    pub n_sources: usize,
    /// Uniform range the source strengths are drawn from.
    pub strength_range: (f64, f64),
    /// How candidate positions are scored.
    pub acquisition: Acquisition,
    /// Posterior draws behind each uncertainty estimate.
    pub draws: usize,
    /// Surrogate kernel and fitting parameters.
    pub gp: GpHyperParams,
    /// Fixed seed for reproducible episodes; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Episode-end rendering; `None` runs headless.
    pub render: Option<RenderConfig>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            n_agents: 10,
            size: (100.0, 100.0),
            episode_limit: 100,
            n_sources: 10,
            strength_range: (0.0, 100.0),
            acquisition: Acquisition::default(),
            draws: 10,
            gp: GpHyperParams::default(),
            seed: None,
            render: None,
        }
    }
}

/// Static descriptor of the observation/action contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvInfo {
    pub n_actions: usize,
    pub n_agents: usize,
    pub state_shape: usize,
    pub obs_shape: usize,
    pub episode_limit: u32,
}

/// The simulation core behind the reset/step contract.
///
/// An environment is idle until the first [`Environment::reset`], which
/// draws a source set, fits the surrogate on it, and scatters the fleet.
/// Each [`Environment::step`] then advances every drone one synchronized
/// tick. The caller drives reset/step serially; nothing here is shared.
pub struct Environment {
    config: EnvConfig,
    fleet: FleetState,
    sources: Vec<SignalSource>,
    model: Option<GpSurrogate>,
    optimizer: MoveOptimizer,
    rng: StdRng,
}

impl Environment {
    /// Builds an idle environment; call [`Environment::reset`] to start
    /// the first episode.
    pub fn new(config: EnvConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fleet = FleetState::new(config.size, config.episode_limit);
        let optimizer = MoveOptimizer::new(config.draws);
        Environment {
            config,
            fleet,
            sources: Vec::new(),
            model: None,
            optimizer,
            rng,
        }
    }

    /// Starts a fresh episode: draws a new source set, refits the
    /// surrogate on it, and scatters the fleet.
    ///
    /// Returns the initial observations and flat global state.
    pub fn reset(&mut self) -> Result<(Vec<Obs>, na::DVector<f64>), SimError> {
        self.sources = random_sources(
            self.config.n_sources,
            self.config.size,
            self.config.strength_range,
            &mut self.rng,
        );
        self.model = Some(GpSurrogate::fit(
            &self.sources,
            self.config.gp,
            &mut self.rng,
        )?);
        self.fleet.reset(self.config.n_agents, &mut self.rng);
        log::info!(
            "episode reset: {} drones, {} sources",
            self.config.n_agents,
            self.sources.len()
        );
        Ok((self.observations()?, self.state()))
    }

    /// Advances every drone one tick and rewards it with the surrogate's
    /// repeated-draw mean at its new position.
    ///
    /// One action per agent is required and validated, but the supplied
    /// values do not influence movement: displacement comes entirely from
    /// the acquisition optimizer, so the controller observes the
    /// exploration heuristic rather than steering it.
    ///
    /// The tick that reaches the episode limit returns `terminated =
    /// true` and, when rendering is configured, writes the trajectory
    /// plot and field heatmap as a side effect. Render failures are
    /// logged, never returned.
    pub fn step(&mut self, actions: &[usize]) -> Result<(Vec<f64>, bool, StepInfo), SimError> {
        if actions.len() != self.config.n_agents {
            return Err(SimError::ActionCount {
                expected: self.config.n_agents,
                got: actions.len(),
            });
        }
        let model = self.model.as_ref().ok_or(SimError::NotFitted)?;

        let mut moves = Vec::with_capacity(self.config.n_agents);
        for drone in self.fleet.drones() {
            moves.push(self.optimizer.compute_move(
                model,
                &self.config.acquisition,
                drone.position(),
                self.config.size,
                &mut self.rng,
            ));
        }
        let terminated = self.fleet.advance(&moves);

        let mut rewards = Vec::with_capacity(self.config.n_agents);
        for drone in self.fleet.drones() {
            let (mean, _) =
                model.predict_with_uncertainty(&drone.position(), self.config.draws, &mut self.rng);
            rewards.push(mean);
        }

        if terminated {
            log::info!("episode finished after {} ticks", self.fleet.tick());
            if let Some(paths) = &self.config.render {
                if let Err(err) = render::save_heatmap(model, self.config.size, &paths.heatmap_path)
                {
                    log::warn!("failed to write heatmap: {}", err);
                }
                if let Err(err) = render::save_trajectories(
                    self.fleet.drones(),
                    &self.sources,
                    self.config.size,
                    &paths.trajectory_path,
                ) {
                    log::warn!("failed to write trajectory plot: {}", err);
                }
            }
        }

        Ok((rewards, terminated, StepInfo::new()))
    }

    /// Per-agent observations: position and the predicted gain there.
    pub fn observations(&self) -> Result<Vec<Obs>, SimError> {
        let model = self.model.as_ref().ok_or(SimError::NotFitted)?;
        Ok(self
            .fleet
            .drones()
            .iter()
            .map(|drone| {
                let p = drone.position();
                Obs::new(p.x, p.y, model.predict_mean(&p))
            })
            .collect())
    }

    /// Flat global state: every drone's `(x, y)`, length `2 * n_agents`.
    pub fn state(&self) -> na::DVector<f64> {
        let coords: Vec<f64> = self
            .fleet
            .drones()
            .iter()
            .flat_map(|drone| {
                let p = drone.position();
                std::iter::once(p.x).chain(std::iter::once(p.y))
            })
            .collect();
        na::DVector::from_vec(coords)
    }

    /// Static descriptor of the observation/action contract.
    pub fn env_info(&self) -> EnvInfo {
        EnvInfo {
            n_actions: N_ACTIONS,
            n_agents: self.config.n_agents,
            state_shape: 2 * self.config.n_agents,
            obs_shape: OBS_DIM,
            episode_limit: self.config.episode_limit,
        }
    }

    /// Length of one per-agent observation.
    pub fn obs_size(&self) -> usize {
        OBS_DIM
    }

    /// Length of the flat global state.
    pub fn state_size(&self) -> usize {
        2 * self.config.n_agents
    }

    /// Number of discrete actions advertised to the controller.
    pub fn total_actions(&self) -> usize {
        N_ACTIONS
    }

    /// Per-agent action masks. Every action is always available; masking
    /// is a no-op in this environment.
    pub fn avail_actions(&self) -> Vec<[u8; N_ACTIONS]> {
        vec![[1; N_ACTIONS]; self.config.n_agents]
    }

    /// Refits the surrogate on the current source set without resetting
    /// the episode. The core loop never calls this; it exists for worlds
    /// whose sources change mid-episode.
    pub fn refit(&mut self) -> Result<(), SimError> {
        if self.model.is_none() {
            return Err(SimError::NotFitted);
        }
        self.model = Some(GpSurrogate::fit(
            &self.sources,
            self.config.gp,
            &mut self.rng,
        )?);
        Ok(())
    }

    /// The episode's signal sources, the ground truth the surrogate
    /// estimates.
    pub fn sources(&self) -> &[SignalSource] {
        &self.sources
    }

    /// Fleet state in agent-index order; feeds the trajectory plot.
    pub fn drones(&self) -> &[Drone] {
        self.fleet.drones()
    }

    /// Ticks completed in the current episode.
    pub fn tick(&self) -> u32 {
        self.fleet.tick()
    }

    /// The configuration this environment was built with.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }
}
