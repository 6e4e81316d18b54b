//! End-to-end coordinator tests with real threads.
//!
//! # Notes
//!
//! - Stub environment and model (`CountdownEnv`, `FixedQ`) keep runs to a
//!   few hundred frames
//! - Focus is on lifecycle and fault policy, not on learning

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use crate::checkpoint::{Checkpoint, CheckpointInfo, CheckpointStore, FileCheckpointStore};
use crate::environment::{Environment, StepMode, StepOutcome};
use crate::error::{CheckpointError, EnvError, ModelError, TrainError};
use crate::messages::FinishReason;
use crate::metrics::MemorySink;
use crate::model::{shared_model, QFunction, SharedModel};
use crate::runners::config::TrainerConfig;
use crate::runners::coordinator::{evaluate_checkpoint, Coordinator};
use crate::testing::{CountdownEnv, FixedQ};

fn small_config(dir: &Path) -> TrainerConfig {
    TrainerConfig::new()
        .with_threads(2)
        .with_total_frames(100)
        .with_tmax(5)
        .with_update_interval(50)
        .with_eps_steps(10)
        .with_log_interval(1_000_000)
        .with_checkpoint_dir(dir)
        .with_render_poll_ms(1)
}

fn countdown(_id: usize) -> Result<CountdownEnv, EnvError> {
    Ok(CountdownEnv::new(20, 2))
}

/// Store whose saves always fail.
struct ReadOnlyStore;

impl CheckpointStore for ReadOnlyStore {
    fn save(&mut self, _frame: u64, _blob: &[u8]) -> Result<CheckpointInfo, CheckpointError> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
    }

    fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        Ok(Vec::new())
    }

    fn load(&self, info: &CheckpointInfo) -> Result<Checkpoint, CheckpointError> {
        Err(CheckpointError::NotFound(info.frame))
    }

    fn remove(&mut self, _info: &CheckpointInfo) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// Environment that sleeps on every step and counts renders.
struct SlowEnv {
    inner: CountdownEnv,
    renders: Arc<AtomicUsize>,
}

impl Environment for SlowEnv {
    fn n_actions(&self) -> usize {
        self.inner.n_actions()
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.inner.reset()
    }

    fn step(&mut self, action: usize, mode: StepMode) -> Result<StepOutcome, EnvError> {
        thread::sleep(Duration::from_millis(1));
        self.inner.step(action, mode)
    }

    fn render(&mut self) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Budget and completion
// ============================================================================

/// INTENT: the canonical two-worker scenario reaches the budget, trains at
/// least once per tmax frames and stops both workers.
#[test]
fn test_two_workers_reach_budget() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));

    let summary = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model.clone(), countdown)
        .unwrap();

    assert!(summary.final_frames >= 100);
    assert!(summary.final_frames < 100 + 2 * 5, "overshoot bounded by threads * tmax");
    assert!(summary.train_steps >= 20);
    assert_eq!(summary.train_steps as usize, model.inner().train_calls());
    assert_eq!(summary.workers.len(), 2);
    assert!(summary.failed_workers().next().is_none());

    let steps: u64 = summary.workers.iter().map(|w| w.steps).sum();
    assert_eq!(steps, summary.final_frames, "every frame counted exactly once");
    assert!(summary
        .workers
        .iter()
        .any(|w| w.reason == FinishReason::Completed));
}

#[test]
fn test_segments_never_exceed_tmax() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    Coordinator::new(small_config(dir.path()).with_total_frames(300))
        .unwrap()
        .run(model.clone(), |_| Ok(CountdownEnv::new(7, 2)))
        .unwrap();

    let lens = model.inner().batch_lens();
    assert!(!lens.is_empty());
    assert!(lens.iter().all(|&n| (1..=5).contains(&n)));
    // Episodes of 7 flush a short terminal segment.
    assert!(lens.contains(&2));
}

#[test]
fn test_training_failures_do_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]).failing_train());

    let summary = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model, countdown)
        .unwrap();

    assert!(summary.final_frames >= 100);
    assert_eq!(summary.train_steps, 0);
    assert!(summary.failed_train_steps >= 20);
}

// ============================================================================
// Worker faults
// ============================================================================

/// INTENT: one broken environment does not stop the other workers.
#[test]
fn test_env_failure_is_isolated() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));

    let summary = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model, |id| {
            let env = CountdownEnv::new(20, 2);
            Ok(if id == 1 { env.failing_after(3) } else { env })
        })
        .unwrap();

    assert!(summary.final_frames >= 100);
    let failed: Vec<usize> = summary.failed_workers().map(|w| w.worker_id).collect();
    assert_eq!(failed, vec![1]);
    assert!(matches!(
        summary.workers[1].reason,
        FinishReason::EnvironmentFailed(_)
    ));
}

#[test]
fn test_abort_on_worker_failure() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let config = small_config(dir.path())
        .with_total_frames(u64::MAX)
        .with_abort_on_worker_failure(true);

    let result = Coordinator::new(config).unwrap().run(model, |id| {
        let env = CountdownEnv::new(20, 2);
        Ok(if id == 1 { env.failing_after(3) } else { env })
    });

    assert!(matches!(
        result,
        Err(TrainError::WorkerFailed { worker_id: 1, .. })
    ));
}

/// INTENT: losing the designated worker hands its duties to a survivor, so
/// target syncs and checkpoints keep firing for the rest of the run.
#[test]
fn test_duties_survive_designated_worker_failure() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let renders = Arc::new(AtomicUsize::new(0));
    let config = small_config(dir.path())
        .with_total_frames(400)
        .with_update_interval(50)
        .with_log_interval(20)
        .with_test_iter(1);

    // Steps sleep, so worker 0 fails long before worker 1 reaches the budget.
    let summary = Coordinator::new(config)
        .unwrap()
        .run(model.clone(), move |id| {
            let env = CountdownEnv::new(20, 2);
            Ok(SlowEnv {
                inner: if id == 0 { env.failing_after(3) } else { env },
                renders: renders.clone(),
            })
        })
        .unwrap();

    assert!(matches!(
        summary.workers[0].reason,
        FinishReason::EnvironmentFailed(_)
    ));
    assert_eq!(summary.workers[1].reason, FinishReason::Completed);
    assert!(summary.workers[1].took_over_duties);
    assert!(summary.final_frames >= 400);

    assert!(summary.target_syncs >= 5, "syncs: {}", summary.target_syncs);
    assert_eq!(summary.target_syncs as usize, model.inner().sync_calls());
    let store = FileCheckpointStore::open(dir.path()).unwrap();
    assert!(!store.list().unwrap().is_empty(), "checkpoints kept being written");
}

#[test]
fn test_all_workers_failing_is_an_error() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));

    let result = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model, |_| Ok(CountdownEnv::new(20, 2).failing_after(0)));

    assert!(matches!(result, Err(TrainError::WorkerFailed { .. })));
}

#[test]
fn test_env_factory_failure_is_returned() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));

    let result = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model, |id| -> Result<CountdownEnv, EnvError> {
            Err(EnvError::Reset(format!("no display for env {}", id)))
        });
    assert!(matches!(result, Err(TrainError::Env(EnvError::Reset(_)))));
}

#[test]
fn test_action_space_mismatch_rejected() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0, 2.0]));

    let result = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model, countdown);
    assert!(matches!(
        result,
        Err(TrainError::Model(ModelError::Shape {
            expected: 2,
            actual: 3
        }))
    ));
}

// ============================================================================
// Checkpoints
// ============================================================================

/// INTENT: a resumed run continues the frame count (and so the epsilon
/// anneal) from the checkpoint instead of restarting at zero.
#[test]
fn test_restore_resumes_frame_count() {
    let dir = tempdir().unwrap();
    let blob = FixedQ::new(vec![2.0, 5.0]).serialize().unwrap();
    FileCheckpointStore::open(dir.path()).unwrap().save(60, &blob).unwrap();

    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let summary = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model.clone(), countdown)
        .unwrap();

    assert_eq!(summary.start_frame, 60);
    assert!(summary.final_frames >= 100);
    assert!(summary.frames_this_run() < 50);
    assert_eq!(model.predict(&[0.0]).unwrap(), vec![2.0, 5.0]);
    // Target synced to the restored weights before the workers started.
    assert_eq!(model.predict_target(&[0.0]).unwrap(), vec![2.0, 5.0]);
    assert!(model.inner().sync_calls() >= 1);
}

#[test]
fn test_corrupt_checkpoint_is_fatal() {
    let dir = tempdir().unwrap();
    FileCheckpointStore::open(dir.path()).unwrap().save(60, b"garbage").unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));

    let result = Coordinator::new(small_config(dir.path()))
        .unwrap()
        .run(model.clone(), countdown);

    assert!(matches!(result, Err(TrainError::Checkpoint(_))));
    assert_eq!(model.inner().train_calls(), 0, "no worker may start");
}

#[test]
fn test_corrupt_checkpoint_with_cold_start() {
    let dir = tempdir().unwrap();
    FileCheckpointStore::open(dir.path()).unwrap().save(60, b"garbage").unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));

    let summary = Coordinator::new(small_config(dir.path()).with_allow_cold_start(true))
        .unwrap()
        .run(model, countdown)
        .unwrap();

    assert_eq!(summary.start_frame, 0);
    assert!(summary.final_frames >= 100);
}

#[test]
fn test_checkpoints_written_and_pruned() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let config = small_config(dir.path())
        .with_threads(1)
        .with_total_frames(200)
        .with_log_interval(20)
        .with_test_iter(1)
        .with_keep_checkpoints(2);

    Coordinator::new(config)
        .unwrap()
        .with_sink(MemorySink::new())
        .run(model, |_| Ok(CountdownEnv::new(10, 2)))
        .unwrap();

    let store = FileCheckpointStore::open(dir.path()).unwrap();
    let frames: Vec<u64> = store.list().unwrap().iter().map(|c| c.frame).collect();
    assert_eq!(frames.len(), 2);
    assert!(frames[0] < frames[1]);
}

/// INTENT: a persistently failing store is survived by the designated worker.
#[test]
fn test_save_failures_are_survived() {
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let sink = MemorySink::new();
    let config = TrainerConfig::new()
        .with_threads(2)
        .with_total_frames(200)
        .with_eps_steps(10)
        .with_log_interval(10)
        .with_test_iter(1);

    let summary = Coordinator::with_store(config, ReadOnlyStore)
        .unwrap()
        .with_sink(sink.clone())
        .run(model, countdown)
        .unwrap();

    assert!(summary.final_frames >= 200);
    assert!(summary.failed_workers().next().is_none());
    assert!(!sink.is_empty(), "evaluations continue despite failed saves");
}

// ============================================================================
// Evaluation and rendering
// ============================================================================

/// INTENT: test episodes never advance the training frame counter.
#[test]
fn test_evaluation_does_not_count_frames() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let sink = MemorySink::new();
    let config = small_config(dir.path())
        .with_threads(1)
        .with_log_interval(20)
        .with_test_iter(2);

    let summary = Coordinator::new(config)
        .unwrap()
        .with_sink(sink.clone())
        .run(model, |_| Ok(CountdownEnv::new(10, 2).with_reward(3.0)))
        .unwrap();

    assert_eq!(summary.final_frames, 100);
    assert_eq!(summary.workers[0].steps, 100);

    let records = sink.records();
    assert!(!records.is_empty());
    for record in &records {
        // Raw rewards: 10 steps of 3.0.
        assert_eq!(record.avg_reward, 30.0);
        assert_eq!(record.avg_max_q, 1.0);
        assert!(record.frame <= 100);
    }
}

#[test]
fn test_render_polls_environments() {
    let dir = tempdir().unwrap();
    let model = shared_model(FixedQ::new(vec![0.0, 1.0]));
    let renders = Arc::new(AtomicUsize::new(0));
    let config = small_config(dir.path()).with_total_frames(60).with_render(true);

    let counter = renders.clone();
    Coordinator::new(config)
        .unwrap()
        .run(model, move |_| {
            Ok(SlowEnv {
                inner: CountdownEnv::new(20, 2),
                renders: counter.clone(),
            })
        })
        .unwrap();

    assert!(renders.load(Ordering::SeqCst) > 0);
}

#[test]
fn test_evaluate_checkpoint() {
    let dir = tempdir().unwrap();
    let mut store = FileCheckpointStore::open(dir.path()).unwrap();
    let config = TrainerConfig::new().with_eval_iter(2);
    let model = SharedModel::new(FixedQ::new(vec![0.0, 0.0]));
    let mut env = CountdownEnv::new(4, 2).with_reward(1.0);

    assert!(matches!(
        evaluate_checkpoint(&config, &model, &mut env, &store),
        Err(TrainError::Checkpoint(CheckpointError::NoCheckpoints))
    ));

    let blob = FixedQ::new(vec![0.5, 4.0]).serialize().unwrap();
    store.save(1_000, &blob).unwrap();
    let result = evaluate_checkpoint(&config, &model, &mut env, &store).unwrap();

    assert_eq!(result.rewards, vec![4.0, 4.0]);
    assert_eq!(result.mean_max_q(), 4.0);
    assert_eq!(env.test_steps(), 8);
    assert_eq!(model.predict_target(&[0.0]).unwrap(), vec![0.5, 4.0]);
}
