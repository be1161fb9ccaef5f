pub mod run;
pub mod status;

use crate::error::RolloverError;
use crate::rollover::config::{RolloverConfig, load_config};
use crate::store::{self, RemoteStore};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

pub fn load_validated_config() -> Result<RolloverConfig, RolloverError> {
    load_config().map_err(RolloverError::InvalidConfig)
}

/// Resolve the database target from the environment and open it.
pub fn connect_store(config: &RolloverConfig) -> Result<Box<dyn RemoteStore>, RolloverError> {
    let target = store::resolve_target().map_err(RolloverError::InvalidConfig)?;
    store::connect(
        &target,
        Duration::from_secs(config.remote.request_timeout_secs),
    )
    .map_err(RolloverError::InvalidConfig)
}
