//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use seqgen_core::{Config, SequenceEngine};
use tempfile::TempDir;

/// Starts an engine on a fresh temporary directory.
///
/// The directory must outlive the engine.
pub fn temp_engine(config: impl FnOnce(Config) -> Config) -> (TempDir, SequenceEngine) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let engine = SequenceEngine::start(config(Config::new(dir.path(), dir.path())))
        .expect("start engine");
    (dir, engine)
}

/// Generates `count` random keys of `len` alphanumeric characters.
pub fn random_keys(count: usize, len: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect()
        })
        .collect()
}
