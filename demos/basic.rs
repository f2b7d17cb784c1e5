//! Basic usage of the stateful LSTM layer
//!
//! Walks through the acting loop (one timestep per call, state carried by the
//! layer) and a training-style replay over a multi-sample sequence.

use burn::backend::NdArray;
use burn::tensor::{Distribution, Tensor, TensorData};
use episodic_lstm::prelude::*;

fn main() -> Result<(), StateError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    println!("=== episodic-lstm Basic Example ===\n");

    type Backend = NdArray<f32>;
    let device = Default::default();

    let num_envs = 4;
    let mut lstm = LstmConfig::new(vec![3, 4], 16, MergeMode::Inner).init::<Backend>(&device)?;

    println!("Created stateful LSTM:");
    println!("  Input size:  {}", lstm.input_size());
    println!("  Hidden size: {}", lstm.num_units());
    println!("  Merge mode:  {}", lstm.merge_mode());
    println!();

    // Example 1: acting loop, environment 2 finishes its episode after step 2
    println!("Example 1: Acting loop");
    let mut snapshots = Vec::new();
    let mut episode_starts = vec![true; num_envs];
    for step in 0..4 {
        let snapshot = lstm.get_state(&episode_starts)?;
        let obs = Tensor::<Backend, 3>::random([num_envs, 3, 4], Distribution::Uniform(-1.0, 1.0), &device);
        let out = lstm.forward_snapshot(obs, &snapshot)?;
        println!("  step {}: output {:?}, initials {:?}", step, out.dims(), snapshot.initials.to_vec());

        snapshots.push(snapshot);
        episode_starts = vec![false; num_envs];
        if step == 2 {
            episode_starts[2] = true;
        }
    }
    println!();

    // Example 2: replay the collected states over the whole sequence, with
    // 8 samples per environment (as an IQN head would produce)
    println!("Example 2: Multi-sample replay");
    let timesteps = snapshots.len();
    let multi_sample = 8;

    let hx: Vec<f32> = snapshots.iter().flat_map(|s| s.hx.iter().copied()).collect();
    let cx: Vec<f32> = snapshots.iter().flat_map(|s| s.cx.iter().copied()).collect();
    let initials: Vec<f32> = snapshots.iter().flat_map(|s| s.initials.iter().copied()).collect();

    let hx = Tensor::<Backend, 2>::from_data(TensorData::new(hx, [timesteps * num_envs, 16]), &device);
    let cx = Tensor::<Backend, 2>::from_data(TensorData::new(cx, [timesteps * num_envs, 16]), &device);
    let initials = Tensor::<Backend, 1>::from_data(TensorData::new(initials, [timesteps * num_envs]), &device);
    let x = Tensor::<Backend, 2>::random(
        [timesteps * num_envs * multi_sample, 12],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    );

    let mut trainer = LstmConfig::new(vec![3, 4], 16, MergeMode::Outer).init::<Backend>(&device)?;
    let out = trainer.forward(x, hx, cx, initials, timesteps)?;

    println!("  Output shape:      {:?}", out.dims());
    if let Some(state) = trainer.last_state() {
        println!("  Final state shape: {:?}", state.h.dims());
    }
    println!();

    println!("=== Examples completed successfully! ===");
    Ok(())
}
