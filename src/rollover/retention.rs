use crate::rollover::clock::QuarterId;
use crate::rollover::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn cutoff_ordinal(current: QuarterId, horizon_quarters: u32) -> i64 {
    current.ordinal() - i64::from(horizon_quarters)
}

#[derive(Debug, Clone, Serialize)]
pub struct QuarterFileEntry {
    pub quarter: QuarterId,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepPlan {
    pub current: QuarterId,
    pub cutoff: i64,
    pub expired: Vec<QuarterFileEntry>,
    pub retained: Vec<QuarterFileEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub current: QuarterId,
    pub cutoff: i64,
    pub deleted: Vec<PathBuf>,
    pub retained: usize,
    /// Expired files that could not be removed.
    pub failed: Vec<PathBuf>,
    /// The directory itself could not be listed; nothing was considered.
    pub scan_failed: bool,
}

/// Quarter files in `dir`, oldest first. Names outside the pattern are
/// skipped, as are entries that cannot be read; a missing directory has no
/// files.
pub fn list_quarter_files(dir: &Path) -> Result<Vec<QuarterFileEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "RETENTION_ENTRY_UNREADABLE",
                    stage: "retention",
                    action: "skip-entry",
                    subject: &dir.display().to_string(),
                    reason: "read-dir-entry-failed",
                    err: &err.to_string(),
                });
                continue;
            }
        };
        let name = entry.file_name();
        let Some(quarter) = name.to_str().and_then(QuarterId::parse_file_name) else {
            continue;
        };
        out.push(QuarterFileEntry {
            quarter,
            path: entry.path(),
        });
    }
    out.sort_by_key(|e| e.quarter);
    Ok(out)
}

pub fn plan_sweep(dir: &Path, current: QuarterId, horizon_quarters: u32) -> Result<SweepPlan> {
    let cutoff = cutoff_ordinal(current, horizon_quarters);
    let (expired, retained): (Vec<_>, Vec<_>) = list_quarter_files(dir)?
        .into_iter()
        .partition(|e| e.quarter.ordinal() < cutoff);
    Ok(SweepPlan {
        current,
        cutoff,
        expired,
        retained,
    })
}

/// Delete every quarter file older than the horizon. Per-file failures are
/// warned about and do not stop the sweep.
pub fn sweep(dir: &Path, current: QuarterId, horizon_quarters: u32) -> SweepOutcome {
    let plan = match plan_sweep(dir, current, horizon_quarters) {
        Ok(plan) => plan,
        Err(err) => {
            warn::emit(WarnEvent {
                code: "RETENTION_SCAN_FAILED",
                stage: "retention",
                action: "list-quarter-files",
                subject: &dir.display().to_string(),
                reason: "read-dir-failed",
                err: &format!("{err:#}"),
            });
            return SweepOutcome {
                current,
                cutoff: cutoff_ordinal(current, horizon_quarters),
                deleted: Vec::new(),
                retained: 0,
                failed: Vec::new(),
                scan_failed: true,
            };
        }
    };

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for entry in plan.expired {
        match fs::remove_file(&entry.path) {
            Ok(()) => {
                log::info!(
                    "stage=retention status=deleted file={} quarter={} ordinal={} cutoff={}",
                    entry.path.display(),
                    entry.quarter,
                    entry.quarter.ordinal(),
                    plan.cutoff
                );
                deleted.push(entry.path);
            }
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "RETENTION_DELETE_FAILED",
                    stage: "retention",
                    action: "remove-quarter-file",
                    subject: &entry.path.display().to_string(),
                    reason: "remove-failed",
                    err: &err.to_string(),
                });
                failed.push(entry.path);
            }
        }
    }

    SweepOutcome {
        current,
        cutoff: plan.cutoff,
        deleted,
        retained: plan.retained.len(),
        failed,
        scan_failed: false,
    }
}
