//! Shared update status: written by the orchestrator, snapshot by readers.

use std::sync::{Arc, Mutex};

use serde::Serialize;

/// Process-wide update state. `current_version` is fixed at startup;
/// `latest_known_version` and `update_available` are rewritten together by
/// the orchestrator after a successful fetch+parse+compare cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub current_version: String,
    pub latest_known_version: String,
    pub update_available: bool,
}

impl UpdateStatus {
    pub fn new(current_version: &str) -> Self {
        Self {
            current_version: current_version.to_string(),
            latest_known_version: String::new(),
            update_available: false,
        }
    }
}

/// Single-writer, many-reader handle. Readers take whole-struct snapshots so
/// no reader ever observes a half-updated version/availability pair.
pub type SharedStatus = Arc<Mutex<UpdateStatus>>;

pub fn shared(current_version: &str) -> SharedStatus {
    Arc::new(Mutex::new(UpdateStatus::new(current_version)))
}

pub fn snapshot(status: &SharedStatus) -> UpdateStatus {
    status.lock().unwrap().clone()
}
