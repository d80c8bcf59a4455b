#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use treelens::{Engine, EngineConfig, Flags, InMemoryFileProvider};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An engine with an empty tree and no files behind it.
pub fn empty_engine() -> Engine {
    init_logger();
    let config = EngineConfig::new("/").with_flags(Flags::NO_LOAD | Flags::NO_STDINC);
    Engine::open_with_provider(config, Box::new(InMemoryFileProvider::new()))
        .expect("in-memory engine opens")
}

/// A temporary root directory holding `files`, given as root-relative paths.
pub fn fixture_root(files: &[(&str, &str)]) -> std::io::Result<TempDir> {
    init_logger();
    let dir = tempfile::tempdir()?;
    for (path, contents) in files {
        let full = dir.path().join(path.trim_start_matches('/'));
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, contents)?;
    }
    Ok(dir)
}

pub fn open_root(root: &Path, flags: Flags) -> Result<Engine, treelens::EngineError> {
    Engine::open(EngineConfig::new(root).with_flags(flags | Flags::NO_STDINC))
}

pub fn read(root: &Path, path: &str) -> Option<String> {
    fs::read_to_string(root.join(path.trim_start_matches('/'))).ok()
}
