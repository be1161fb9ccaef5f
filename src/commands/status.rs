use anyhow::Result;
use chrono::Utc;
use std::env;

use crate::commands::{CommandReport, connect_store, load_validated_config};
use crate::rollover::config::{ENV_OVERRIDES, resolve_config_path};
use crate::rollover::gate;
use crate::rollover::paths::resolve_paths;
use crate::rollover::retention::plan_sweep;
use crate::rollover::roller::{RemoteLayout, read_flag, read_live};

fn env_overrides_in_effect() -> Vec<&'static str> {
    ENV_OVERRIDES
        .iter()
        .copied()
        .filter(|key| env::var(key).is_ok_and(|v| !v.trim().is_empty()))
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let config = load_validated_config()?;
    let paths = resolve_paths()?;
    let clock = config.clock()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("version={}", env!("CARGO_PKG_VERSION")));
    match resolve_config_path() {
        Some(path) if path.exists() => report.detail(format!("config_file={}", path.display())),
        _ => report.detail("config_file=none (defaults + environment)"),
    }
    let overrides = env_overrides_in_effect();
    if !overrides.is_empty() {
        report.detail(format!("env_overrides={}", overrides.join(",")));
    }
    report.detail(format!("rollover_home={}", paths.rollover_home.display()));
    report.detail(format!("history_dir={}", paths.history_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("time_zone={}", clock.zone_name()));
    report.detail(format!("window={}", config.window().describe()));
    report.detail(format!(
        "retention_horizon_quarters={}",
        config.retention.horizon_quarters
    ));

    let instant = Utc::now();
    let now = clock.moment(instant);
    let archive_day = clock.previous_day(instant);
    report.detail(format!("now={}", now.stamp()));
    report.detail(format!(
        "next_archive_day={} quarter={}",
        archive_day.date_key,
        archive_day.quarter()
    ));

    let layout = RemoteLayout::from_config(&config.remote);
    match connect_store(&config) {
        Ok(store) => {
            report.detail(format!("store={}", store.describe()));
            match read_flag(store.as_ref(), &layout) {
                Ok(flag) => {
                    let decision = gate::evaluate(flag, &now, config.window());
                    report.detail(format!("remote.flag={}", flag.label()));
                    report.detail(format!("gate.decision={}", decision.label()));
                }
                Err(err) => report.issue(format!("{:#}", anyhow::Error::from(err))),
            }
            match read_live(store.as_ref(), &layout) {
                Ok(live) => report.detail(format!("remote.live_series={}", live.len())),
                Err(err) => report.issue(format!("{:#}", anyhow::Error::from(err))),
            }
            match store.read(&layout.last_day_path()) {
                Ok(last_day) => report.detail(format!(
                    "remote.last_day_series={}",
                    last_day
                        .as_ref()
                        .and_then(|v| v.as_object())
                        .map_or(0, |m| m.len())
                )),
                Err(err) => report.issue(format!("remote last_day unreadable: {err:#}")),
            }
        }
        Err(err) => report.issue(format!("{:#}", anyhow::Error::from(err))),
    }

    match plan_sweep(
        &paths.history_dir,
        archive_day.quarter(),
        config.retention.horizon_quarters,
    ) {
        Ok(plan) => {
            report.detail(format!(
                "local.quarter_files={}",
                plan.expired.len() + plan.retained.len()
            ));
            for entry in &plan.retained {
                report.detail(format!("local.keep={}", entry.quarter));
            }
            for entry in &plan.expired {
                report.detail(format!(
                    "local.expired={} (next sweep deletes)",
                    entry.quarter
                ));
            }
        }
        Err(err) => report.issue(format!("history dir unreadable: {err:#}")),
    }

    Ok(report)
}
