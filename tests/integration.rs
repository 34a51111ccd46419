//! Facade-level tests of the reset/step contract.

use drones::acquisition::Acquisition;
use drones::env::{EnvConfig, Environment, N_ACTIONS};
use drones::error::SimError;

fn small_config() -> EnvConfig {
    EnvConfig {
        n_agents: 1,
        size: (10.0, 10.0),
        episode_limit: 1,
        n_sources: 1,
        draws: 4,
        seed: Some(99),
        ..EnvConfig::default()
    }
}

#[test]
fn single_agent_single_tick_episode() {
    let mut env = Environment::new(small_config());
    let (obs, state) = env.reset().unwrap();
    assert_eq!(obs.len(), 1);
    assert_eq!(state.len(), 2);

    let (rewards, terminated, info) = env.step(&[0]).unwrap();
    assert_eq!(rewards.len(), 1);
    assert!(terminated);
    assert!(info.is_empty());

    let drone = &env.drones()[0];
    let p = drone.position();
    assert!(p.x >= 0.0 && p.x <= 10.0);
    assert!(p.y >= 0.0 && p.y <= 10.0);
    assert_eq!(drone.trajectory().len(), 1);
}

#[test]
fn positions_stay_in_bounds_and_moves_are_clipped() {
    let mut env = Environment::new(EnvConfig {
        n_agents: 3,
        episode_limit: 5,
        n_sources: 2,
        seed: Some(7),
        ..small_config()
    });
    env.reset().unwrap();
    let mut previous: Vec<_> = env.drones().iter().map(|d| d.position()).collect();

    for tick in 1..=5 {
        env.step(&[0, 0, 0]).unwrap();
        for (drone, before) in env.drones().iter().zip(&previous) {
            let p = drone.position();
            assert!(p.x >= 0.0 && p.x <= 10.0);
            assert!(p.y >= 0.0 && p.y <= 10.0);
            assert!((p.x - before.x).abs() <= 1.0 + 1e-9);
            assert!((p.y - before.y).abs() <= 1.0 + 1e-9);
            assert_eq!(drone.trajectory().len(), tick);
        }
        previous = env.drones().iter().map(|d| d.position()).collect();
    }
}

#[test]
fn terminates_exactly_at_the_episode_limit() {
    let mut env = Environment::new(EnvConfig {
        n_agents: 2,
        episode_limit: 4,
        ..small_config()
    });
    env.reset().unwrap();
    for tick in 1..=4 {
        let (_, terminated, _) = env.step(&[0, 0]).unwrap();
        assert_eq!(terminated, tick == 4, "wrong termination at tick {}", tick);
    }
}

#[test]
fn env_info_matches_the_configuration() {
    let env = Environment::new(EnvConfig {
        n_agents: 7,
        episode_limit: 25,
        ..small_config()
    });
    let info = env.env_info();
    assert_eq!(info.n_actions, 5);
    assert_eq!(info.n_agents, 7);
    assert_eq!(info.state_shape, 14);
    assert_eq!(info.obs_shape, 3);
    assert_eq!(info.episode_limit, 25);
    assert_eq!(env.obs_size(), 3);
    assert_eq!(env.state_size(), 14);
    assert_eq!(env.total_actions(), 5);
}

#[test]
fn action_count_mismatch_fails_fast() {
    let mut env = Environment::new(EnvConfig {
        n_agents: 2,
        ..small_config()
    });
    env.reset().unwrap();
    assert!(matches!(
        env.step(&[0]),
        Err(SimError::ActionCount {
            expected: 2,
            got: 1
        })
    ));
}

#[test]
fn stepping_before_reset_fails() {
    let mut env = Environment::new(small_config());
    assert!(matches!(env.step(&[0]), Err(SimError::NotFitted)));
    assert!(matches!(env.observations(), Err(SimError::NotFitted)));
    assert!(matches!(env.refit(), Err(SimError::NotFitted)));
}

#[test]
fn avail_actions_are_all_ones() {
    let env = Environment::new(EnvConfig {
        n_agents: 4,
        ..small_config()
    });
    let masks = env.avail_actions();
    assert_eq!(masks.len(), 4);
    for mask in masks {
        assert_eq!(mask, [1; N_ACTIONS]);
    }
}

#[test]
fn seeded_resets_reproduce() {
    let mut first = Environment::new(EnvConfig {
        n_agents: 5,
        seed: Some(123),
        ..small_config()
    });
    let mut second = Environment::new(EnvConfig {
        n_agents: 5,
        seed: Some(123),
        ..small_config()
    });
    let (obs_a, state_a) = first.reset().unwrap();
    let (obs_b, state_b) = second.reset().unwrap();
    assert_eq!(state_a, state_b);
    assert_eq!(obs_a, obs_b);
}

#[test]
fn observations_report_position_and_gain() {
    let mut env = Environment::new(EnvConfig {
        n_agents: 3,
        ..small_config()
    });
    env.reset().unwrap();
    let obs = env.observations().unwrap();
    let state = env.state();
    for (i, ob) in obs.iter().enumerate() {
        assert_eq!(ob[0], state[2 * i]);
        assert_eq!(ob[1], state[2 * i + 1]);
        assert!(ob[2].is_finite());
    }
}

#[test]
fn every_strategy_drives_an_episode() {
    let strategies = vec![
        Acquisition::Ucb { kappa: 0.5 },
        Acquisition::Thompson { sigma: 5.0 },
        Acquisition::Entropy,
    ];
    for acquisition in strategies {
        let mut env = Environment::new(EnvConfig {
            acquisition,
            ..small_config()
        });
        env.reset().unwrap();
        let (rewards, terminated, _) = env.step(&[0]).unwrap();
        assert_eq!(rewards.len(), 1);
        assert!(terminated);
    }
}

#[test]
fn refit_keeps_the_episode_running() {
    let mut env = Environment::new(EnvConfig {
        n_agents: 2,
        episode_limit: 3,
        ..small_config()
    });
    env.reset().unwrap();
    env.step(&[0, 0]).unwrap();
    env.refit().unwrap();
    assert_eq!(env.tick(), 1);
    let (_, terminated, _) = env.step(&[0, 0]).unwrap();
    assert!(!terminated);
}
