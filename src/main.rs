use drones::env::{EnvConfig, Environment, RenderConfig};
use drones::error::SimError;

fn main() -> Result<(), SimError> {
    env_logger::init();

    let config = EnvConfig {
        seed: Some(42),
        render: Some(RenderConfig::default()),
        ..EnvConfig::default()
    };
    let n_agents = config.n_agents;
    let mut env = Environment::new(config);

    let (obs, _state) = env.reset()?;
    println!("Initial observations (x, y, predicted gain):");
    for ob in &obs {
        println!("  [{:8.3} {:8.3} {:8.3}]", ob[0], ob[1], ob[2]);
    }

    // Placeholder actions; movement is driven by the acquisition optimizer.
    let actions = vec![0; n_agents];
    let mut episode_return = 0.0;
    loop {
        let (rewards, terminated, _info) = env.step(&actions)?;
        episode_return += rewards.iter().sum::<f64>();
        if terminated {
            break;
        }
    }

    println!(
        "Episode finished after {} ticks; fleet return {:.3}",
        env.tick(),
        episode_return
    );
    Ok(())
}
