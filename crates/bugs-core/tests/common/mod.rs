use std::fs;
use std::path::Path;

use bugs_core::WorldConfig;

pub fn read_file(path: &str) -> String {
    let full = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
    fs::read_to_string(full).expect("Failed to read file")
}

/// World settings for tests: no delay between rounds.
#[allow(dead_code)]
pub fn quick_config() -> WorldConfig {
    WorldConfig {
        round_delay_ms: 0,
        ..WorldConfig::default()
    }
}
