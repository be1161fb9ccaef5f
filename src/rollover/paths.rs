use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct RolloverPaths {
    pub rollover_home: PathBuf,
    pub history_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl RolloverPaths {
    pub fn audit_log(&self) -> PathBuf {
        self.logs_dir.join("audit.log")
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<RolloverPaths> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    let rollover_home = env_or_default_path("ROLLOVER_HOME", cwd);
    let history_dir = env_or_default_path("ROLLOVER_HISTORY_DIR", rollover_home.join("history"));
    let logs_dir = env_or_default_path("ROLLOVER_LOGS_DIR", rollover_home.join("logs"));

    Ok(RolloverPaths {
        rollover_home,
        history_dir,
        logs_dir,
    })
}
