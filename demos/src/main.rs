//! Asynchronous one-step Q-learning on a chain walk.
//!
//! Run with:
//!   cargo run -p demos --release -- train [config.json]
//!   cargo run -p demos --release -- evaluate [config.json]
//!
//! Without a config file a small run is used: 4 workers, 200K frames,
//! checkpoints under `logs/chain_walk`.

mod chain;

use async_qlearn::{
    evaluate_checkpoint, shared_model, CheckpointError, ConsoleSink, Coordinator, CsvSink,
    FileCheckpointStore, LinearQ, LinearWeights, MultiSink, SharedModel, TrainError,
    TrainerConfig,
};
use chain::ChainWalk;

// ============================================================================
// Configuration
// ============================================================================

const CHAIN_LENGTH: usize = 12;
const MAX_EPISODE_STEPS: usize = 200;
const LEARNING_RATE: f32 = 0.05;

fn default_config() -> TrainerConfig {
    TrainerConfig::new()
        .with_threads(4)
        .with_total_frames(200_000)
        .with_update_interval(2_000)
        .with_eps_steps(50_000)
        .with_log_interval(20_000)
        .with_eval_max_steps(MAX_EPISODE_STEPS as u64)
        .with_checkpoint_dir("logs/chain_walk")
        .with_allow_cold_start(true)
}

fn load_config(path: Option<&String>) -> Result<TrainerConfig, TrainError> {
    let config = match path {
        Some(path) => TrainerConfig::from_json_file(path)?,
        None => default_config().build()?,
    };
    Ok(config)
}

fn new_model(config: &TrainerConfig) -> LinearQ {
    let weights = LinearWeights::random(CHAIN_LENGTH, ChainWalk::N_ACTIONS, 0.01, config.seed);
    LinearQ::with_weights(weights, LEARNING_RATE)
}

// ============================================================================
// Commands
// ============================================================================

fn train(config: TrainerConfig) -> Result<(), TrainError> {
    println!("=== Async One-Step Q-Learning: Chain Walk ===");
    println!("Threads: {}", config.threads);
    println!("Total frames: {}", config.total_frames);
    println!("Target sync every {} frames", config.update_interval);
    println!("Checkpoints: {}", config.checkpoint_dir.display());
    println!();

    let seed = config.seed;
    let metrics_path = config.checkpoint_dir.join("metrics.csv");
    let model = shared_model(new_model(&config));

    // The coordinator creates the checkpoint directory, so open the CSV after it.
    let coordinator = Coordinator::new(config)?;
    let metrics = CsvSink::open(&metrics_path).map_err(CheckpointError::from)?;
    let sink = MultiSink::new().add(ConsoleSink).add(metrics);

    let summary = coordinator
        .with_sink(sink)
        .run(model.clone(), |id| {
            Ok(ChainWalk::new(CHAIN_LENGTH, MAX_EPISODE_STEPS, seed.wrapping_add(id as u64)))
        })?;

    println!();
    println!("=== Training Complete ===");
    println!("Frames: {} (resumed from {})", summary.final_frames, summary.start_frame);
    println!("Training steps: {} ({} rejected)", summary.train_steps, summary.failed_train_steps);
    println!("Target syncs: {}", summary.target_syncs);
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    for report in &summary.workers {
        println!(
            "  worker {}: {} steps, {} episodes, eps floor {:.2}, {:?}",
            report.worker_id, report.steps, report.episodes, report.eps_min, report.reason
        );
    }
    Ok(())
}

fn evaluate(config: TrainerConfig) -> Result<(), TrainError> {
    let store = FileCheckpointStore::open(&config.checkpoint_dir)?;
    let model = SharedModel::new(new_model(&config));
    let mut env = ChainWalk::new(CHAIN_LENGTH, MAX_EPISODE_STEPS, config.seed);

    let result = evaluate_checkpoint(&config, &model, &mut env, &store)?;
    println!("Episodes: {}", result.episodes());
    println!("Mean reward: {:.4}", result.mean_reward());
    println!("Mean max Q: {:.4}", result.mean_max_q());
    Ok(())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("train");

    let outcome = load_config(args.get(2)).and_then(|config| match command {
        "train" => train(config),
        "evaluate" | "eval" => evaluate(config),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: chain_walk [train|evaluate] [config.json]");
            std::process::exit(2);
        }
    });

    if let Err(e) = outcome {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
