use crate::rollover::clock::ClockContext;
use crate::rollover::gate::EligibilityWindow;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const ENV_TIME_ZONE: &str = "ROLLOVER_TIME_ZONE";
pub const ENV_WINDOW_START: &str = "ROLLOVER_WINDOW_START";
pub const ENV_WINDOW_END: &str = "ROLLOVER_WINDOW_END";
pub const ENV_RETENTION_QUARTERS: &str = "ROLLOVER_RETENTION_QUARTERS";
pub const ENV_REMOTE_ROOT: &str = "ROLLOVER_REMOTE_ROOT";
pub const ENV_HISTORY_ROOT: &str = "ROLLOVER_HISTORY_ROOT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ROLLOVER_REQUEST_TIMEOUT_SECS";

/// Every variable that overrides a file or default setting.
pub const ENV_OVERRIDES: &[&str] = &[
    ENV_TIME_ZONE,
    ENV_WINDOW_START,
    ENV_WINDOW_END,
    ENV_RETENTION_QUARTERS,
    ENV_REMOTE_ROOT,
    ENV_HISTORY_ROOT,
    ENV_REQUEST_TIMEOUT_SECS,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub time_zone: String,
    pub window_start: u32,
    pub window_end: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: "Asia/Kolkata".to_string(),
            window_start: 2 * 60 + 30,
            window_end: 9 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub horizon_quarters: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon_quarters: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub root: String,
    pub history_root: String,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            root: "live_results".to_string(),
            history_root: "live_results/history".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolloverConfig {
    pub schedule: ScheduleConfig,
    pub retention: RetentionConfig,
    pub remote: RemoteConfig,
}

impl RolloverConfig {
    pub fn window(&self) -> EligibilityWindow {
        EligibilityWindow {
            start: self.schedule.window_start,
            end: self.schedule.window_end,
        }
    }

    pub fn clock(&self) -> Result<ClockContext> {
        ClockContext::from_name(&self.schedule.time_zone)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialRolloverConfig {
    schedule: Option<ScheduleConfig>,
    retention: Option<RetentionConfig>,
    remote: Option<RemoteConfig>,
}

/// Accepts `150` (minutes) or `02:30` (clock time). Clock times must lie
/// within one day.
pub fn parse_minute_of_day(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Some((h, m)) = trimmed.split_once(':') {
        let hour = h.trim().parse::<u32>().ok()?;
        let minute = m.trim().parse::<u32>().ok()?;
        if hour >= 24 || minute >= 60 {
            return None;
        }
        return hour.checked_mul(60)?.checked_add(minute);
    }
    trimmed.parse::<u32>().ok()
}

fn env_or_minute_value(raw: Option<&str>, fallback: u32) -> u32 {
    raw.and_then(parse_minute_of_day).unwrap_or(fallback)
}

fn env_or_minute(var: &str, fallback: u32) -> u32 {
    env_or_minute_value(env::var(var).ok().as_deref(), fallback)
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn validate(cfg: &RolloverConfig) -> Result<()> {
    cfg.clock()?;
    let s = cfg.schedule.window_start;
    let e = cfg.schedule.window_end;
    if e > 24 * 60 {
        return Err(anyhow!(
            "invalid eligibility window: end must be <= 1440 minutes"
        ));
    }
    if s >= e {
        return Err(anyhow!(
            "invalid eligibility window: require start < end (got {s}..{e})"
        ));
    }
    if cfg.retention.horizon_quarters == 0 {
        return Err(anyhow!("invalid retention horizon: must be >= 1 quarter"));
    }
    if cfg.remote.root.trim_matches('/').is_empty() {
        return Err(anyhow!("invalid remote root: cannot be empty"));
    }
    if cfg.remote.history_root.trim_matches('/').is_empty() {
        return Err(anyhow!("invalid remote history root: cannot be empty"));
    }
    if cfg.remote.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("ROLLOVER_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".results-rollover").join("rollover.toml"))
}

fn merge_toml(base: &mut RolloverConfig, raw: &str) -> Result<()> {
    let parsed: PartialRolloverConfig = toml::from_str(raw)?;
    if let Some(schedule) = parsed.schedule {
        base.schedule = schedule;
    }
    if let Some(retention) = parsed.retention {
        base.retention = retention;
    }
    if let Some(remote) = parsed.remote {
        base.remote = remote;
    }
    Ok(())
}

fn merge_file_config(base: &mut RolloverConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    merge_toml(base, &raw)
        .map_err(|err| anyhow!("failed to parse rollover config {}: {err}", path.display()))
}

pub fn load_config() -> Result<RolloverConfig> {
    let mut cfg = RolloverConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.schedule.time_zone = env_or_string(ENV_TIME_ZONE, &cfg.schedule.time_zone);
    cfg.schedule.window_start = env_or_minute(ENV_WINDOW_START, cfg.schedule.window_start);
    cfg.schedule.window_end = env_or_minute(ENV_WINDOW_END, cfg.schedule.window_end);
    cfg.retention.horizon_quarters =
        env_or_u32(ENV_RETENTION_QUARTERS, cfg.retention.horizon_quarters);
    cfg.remote.root = env_or_string(ENV_REMOTE_ROOT, &cfg.remote.root);
    cfg.remote.history_root = env_or_string(ENV_HISTORY_ROOT, &cfg.remote.history_root);
    cfg.remote.request_timeout_secs =
        env_or_u64(ENV_REQUEST_TIMEOUT_SECS, cfg.remote.request_timeout_secs);

    validate(&cfg)?;
    Ok(cfg)
}
