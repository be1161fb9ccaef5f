use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use crate::commands::{CommandReport, connect_store, load_validated_config};
use crate::error::RolloverError;
use crate::rollover::gate::GateDecision;
use crate::rollover::paths::resolve_paths;
use crate::rollover::pipeline::{RunContext, RunOptions, RunOutcome, run_rollover};

#[derive(Debug, Clone, Default)]
pub struct RunCommandOptions {
    pub at: Option<String>,
    pub dry_run: bool,
}

pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid --at instant `{raw}` (expected RFC 3339): {err}"))
}

pub fn run(opts: &RunCommandOptions) -> Result<CommandReport> {
    let config = load_validated_config()?;
    let paths = resolve_paths()?;
    let instant = match opts.at.as_deref() {
        Some(raw) => parse_instant(raw).map_err(RolloverError::InvalidConfig)?,
        None => Utc::now(),
    };
    let store = connect_store(&config)?;

    let command = if opts.dry_run {
        "run --dry-run"
    } else {
        "run"
    };
    let mut report = CommandReport::new(command);
    report.detail(format!("store={}", store.describe()));

    let ctx = RunContext {
        store: store.as_ref(),
        config: &config,
        paths: &paths,
    };
    match run_rollover(&ctx, instant, RunOptions { dry_run: opts.dry_run })? {
        RunOutcome::Skipped { now, decision } => {
            report.detail(format!(
                "now={} zone={}",
                now.stamp(),
                config.schedule.time_zone
            ));
            match decision {
                GateDecision::AlreadyDone => {
                    report.detail("skipped: already rolled over today (version=0)");
                }
                GateDecision::OutsideWindow { minute_of_day } => report.detail(format!(
                    "skipped: minute_of_day={minute_of_day} outside reset window {}",
                    config.window().describe()
                )),
                GateDecision::Proceed => {}
            }
        }
        RunOutcome::Planned(plan) => {
            report.detail(format!("now={}", plan.now.stamp()));
            report.detail(format!("would roll series={}", plan.series));
            report.detail(format!(
                "would archive day={} quarter={}",
                plan.day.date_key, plan.quarter
            ));
            report.detail(format!("would mirror to {}", plan.history_path));
            report.detail(format!("would update {}", plan.archive_path.display()));
            match plan.sweep {
                Some(sweep) => {
                    report.detail(format!("retention cutoff={}", sweep.cutoff));
                    for entry in sweep.expired {
                        report.detail(format!("would delete {}", entry.path.display()));
                    }
                }
                None => report.detail("retention preview unavailable"),
            }
        }
        RunOutcome::Completed(done) => {
            report.detail(format!("now={}", done.now.stamp()));
            report.detail(format!("rolled series={}", done.series));
            report.detail(format!("day={} quarter={}", done.day.date_key, done.quarter));
            report.detail(format!("history_mirror={}", done.history_path));
            report.detail(format!(
                "archive={} entries={} replaced={}",
                done.archive.path.display(),
                done.archive.entries,
                done.archive.replaced
            ));
            if done.archive.recovered_corrupt {
                report.detail("archive: unparseable quarter file was started fresh");
            }
            report.detail(format!(
                "retention cutoff={} deleted={} retained={}",
                done.sweep.cutoff,
                done.sweep.deleted.len(),
                done.sweep.retained
            ));
            for path in &done.sweep.deleted {
                report.detail(format!("deleted {}", path.display()));
            }
            if done.sweep.scan_failed {
                report.detail(format!(
                    "retention could not list {}",
                    paths.history_dir.display()
                ));
            }
            for path in &done.sweep.failed {
                report.detail(format!("retention could not delete {}", path.display()));
            }
        }
    }

    Ok(report)
}
