//! Liveness probe over the backing file.
//!
//! A deliberately minimal, side-effect-free check: does the file exist, can
//! it be read, does it parse as JSON. No locking, no schema completion, no
//! fallback — this is the probe an external monitor calls to decide whether
//! the store is serviceable, not a load path.

use std::path::Path;

use serde_json::Value;

/// Outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    /// The backing file exists.
    pub exists: bool,
    /// Its contents could be read.
    pub readable: bool,
    /// The contents parse as a JSON object.
    pub valid_json: bool,
}

impl HealthReport {
    /// All checks passed.
    pub fn ok(&self) -> bool {
        self.exists && self.readable && self.valid_json
    }
}

/// Probe the backing file at `path`.
pub fn check(path: &Path) -> HealthReport {
    if !path.exists() {
        return HealthReport {
            exists: false,
            readable: false,
            valid_json: false,
        };
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            return HealthReport {
                exists: true,
                readable: false,
                valid_json: false,
            }
        }
    };
    let valid_json = matches!(serde_json::from_str::<Value>(&contents), Ok(Value::Object(_)));
    HealthReport {
        exists: true,
        readable: true,
        valid_json,
    }
}
