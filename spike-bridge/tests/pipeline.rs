//! End-to-end runs against shell-script stand-ins for the simulator.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use spike_bridge::codec;
use spike_bridge::{BatchLoader, BridgeConfig, BridgeError, ImageSample, InMemoryDataset, Pipeline, SimulationInvoker};
use spike_core::{DecodeRule, ImageBatch};

// Writing an executable while another test thread forks can make exec fail
// with ETXTBSY; every test here creates and runs its scripts under this lock.
static SERIAL: Mutex<()> = Mutex::new(());

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(dir: &Path, simulator: PathBuf, batch_size: usize) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.batch_size = batch_size;
    config.encoder.num_steps = 4;
    config.artifacts.work_dir = dir.to_path_buf();
    config.simulator.executable = simulator;
    config
}

fn three_images() -> ImageBatch {
    ImageBatch::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]]).unwrap()
}

#[test]
fn argmax_scoring_two_of_three() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let sim = script(dir.path(), "sim.sh", "printf '0,1\\n1,0\\n0,1\\n' > output.txt");

    let mut cfg = config(dir.path(), sim, 3);
    cfg.scoring.decode = DecodeRule::ArgMax;
    let mut pipeline = Pipeline::new(cfg).unwrap();

    let accuracy = pipeline.run_batch(&three_images(), &[1, 0, 0]).unwrap();
    assert_eq!((accuracy.correct, accuracy.total), (2, 3));
    assert!((accuracy.value() - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn simulator_sees_artifacts_in_work_dir() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    // echo the targets back: a single-column result decoded directly
    let sim = script(
        dir.path(),
        "sim.sh",
        "test -f inputSpikes.txt || exit 9\ncp targets.txt output.txt",
    );

    let mut pipeline = Pipeline::new(config(dir.path(), sim, 3)).unwrap();
    let accuracy = pipeline.run_batch(&three_images(), &[7, 2, 9]).unwrap();
    assert_eq!(accuracy.correct, 3);

    let spikes = fs::read_to_string(dir.path().join("inputSpikes.txt")).unwrap();
    assert!(spikes.starts_with("# Array shape: (4, 3, 2)\n"));
}

#[test]
fn non_zero_exit_never_reads_output() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let sim = script(dir.path(), "sim.sh", "printf '1\\n0\\n1\\n' > output.txt\nexit 3");

    let mut pipeline = Pipeline::new(config(dir.path(), sim, 3)).unwrap();
    match pipeline.run_batch(&three_images(), &[1, 0, 1]) {
        Err(BridgeError::SimulationFailed { code, .. }) => assert_eq!(code, Some(3)),
        other => panic!("expected simulation failure, got {:?}", other),
    }
}

#[test]
fn missing_output_is_io_failure_not_stale_score() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("output.txt"), "1\n0\n1\n").unwrap();
    let sim = script(dir.path(), "sim.sh", "exit 0");

    let mut pipeline = Pipeline::new(config(dir.path(), sim, 3)).unwrap();
    match pipeline.run_batch(&three_images(), &[1, 0, 1]) {
        Err(BridgeError::Io { path, .. }) => assert_eq!(path, dir.path().join("output.txt")),
        other => panic!("expected I/O failure, got {:?}", other),
    }
}

#[test]
fn result_row_count_must_match_batch() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let sim = script(dir.path(), "sim.sh", "printf '0,1\\n1,0\\n' > output.txt");

    let mut pipeline = Pipeline::new(config(dir.path(), sim, 3)).unwrap();
    let err = pipeline.run_batch(&three_images(), &[1, 0, 1]).unwrap_err();
    assert!(
        matches!(err, BridgeError::Core(spike_core::CoreError::ShapeMismatch { expected: 3, actual: 2, .. })),
        "got {:?}",
        err
    );
}

#[test]
fn malformed_result_is_format_error() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let sim = script(dir.path(), "sim.sh", "printf '0,1\\n1\\n0,1\\n' > output.txt");

    let mut pipeline = Pipeline::new(config(dir.path(), sim, 3)).unwrap();
    assert!(matches!(
        pipeline.run_batch(&three_images(), &[1, 0, 1]),
        Err(BridgeError::Format { line: 2, .. })
    ));
}

#[test]
fn multi_batch_run_respects_max_batches() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let sim = script(dir.path(), "sim.sh", "cp targets.txt output.txt");

    let samples = (0..7)
        .map(|i| ImageSample { pixels: vec![i as f32 / 7.0; 4], label: i % 3 })
        .collect();
    let dataset = InMemoryDataset::new(samples);
    let loader = BatchLoader::new(&dataset, 2).unwrap();

    let mut pipeline = Pipeline::new(config(dir.path(), sim.clone(), 2)).unwrap();
    let summary = pipeline.run(&loader).unwrap();
    assert_eq!(summary.batches.len(), 3);
    assert_eq!(summary.mean_accuracy(), Some(1.0));

    let mut cfg = config(dir.path(), sim, 2);
    cfg.max_batches = 1;
    let summary = Pipeline::new(cfg).unwrap().run(&loader).unwrap();
    assert_eq!(summary.batches.len(), 1);
    assert_eq!(codec::load_labels(&dir.path().join("targets.txt")).unwrap(), vec![0, 1]);
}

#[test]
fn hung_simulator_is_killed_after_timeout() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let sim = script(dir.path(), "sim.sh", "exec sleep 30");

    let invoker = SimulationInvoker::new(&sim, dir.path()).with_timeout(Some(Duration::from_millis(200)));
    assert!(matches!(invoker.run(), Err(BridgeError::SimulationTimeout { .. })));
}
