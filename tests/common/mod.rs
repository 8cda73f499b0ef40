#![allow(dead_code)]

pub mod config_test_utils;
pub mod mock_service;

use std::time::Duration;
use streamer_upload::common::config::AppConfig;
use streamer_upload::common::{Credentials, StructureSelection};
use tempfile::TempDir;

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

pub fn structure() -> StructureSelection {
    StructureSelection::new("3010000.01", "S01", "01", "eeg").expect("valid structure")
}

pub fn credentials() -> Credentials {
    Credentials::new("jdoe", "secret")
}

/// Config aimed at a mock service, with budgets short enough for tests.
pub fn test_config(server_url: &str) -> AppConfig {
    let mut config = AppConfig {
        server_url: server_url.to_string(),
        ..AppConfig::default()
    };
    config.timeouts.short_ms = 300;
    config.timeouts.long_ms = 5_000;
    config.retry.backoff_ms = 10;
    config
}

/// Write `size` bytes of patterned content and return the path.
pub fn write_file(dir: &TempDir, name: &str, size: usize) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).expect("write test file");
    path
}

pub const SLOW: Duration = Duration::from_millis(1_000);
