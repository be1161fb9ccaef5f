use crate::error::RolloverError;
use crate::rollover::archive::{ArchiveOutcome, QuarterlyArchiver};
use crate::rollover::audit;
use crate::rollover::clock::{CalendarMoment, QuarterId};
use crate::rollover::config::RolloverConfig;
use crate::rollover::gate::{self, GateDecision};
use crate::rollover::paths::RolloverPaths;
use crate::rollover::retention::{self, SweepOutcome, SweepPlan};
use crate::rollover::roller::{RemoteLayout, SnapshotRoller, read_flag};
use crate::store::RemoteStore;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub struct RunContext<'a> {
    pub store: &'a dyn RemoteStore,
    pub config: &'a RolloverConfig,
    pub paths: &'a RolloverPaths,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct PlannedRollover {
    pub now: CalendarMoment,
    pub day: CalendarMoment,
    pub quarter: QuarterId,
    pub series: usize,
    pub history_path: String,
    pub archive_path: PathBuf,
    pub sweep: Option<SweepPlan>,
}

#[derive(Debug, Clone)]
pub struct CompletedRollover {
    pub now: CalendarMoment,
    pub day: CalendarMoment,
    pub quarter: QuarterId,
    pub series: usize,
    pub history_path: String,
    pub archive: ArchiveOutcome,
    pub sweep: SweepOutcome,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Skipped {
        now: CalendarMoment,
        decision: GateDecision,
    },
    Planned(PlannedRollover),
    Completed(CompletedRollover),
}

/// One invocation: gate, roll, archive, sweep. Any error after the gate
/// stops the sequence; a refused gate is not an error.
pub fn run_rollover(
    ctx: &RunContext<'_>,
    instant: DateTime<Utc>,
    opts: RunOptions,
) -> Result<RunOutcome, RolloverError> {
    let clock = ctx.config.clock().map_err(RolloverError::InvalidConfig)?;
    let now = clock.moment(instant);
    let layout = RemoteLayout::from_config(&ctx.config.remote);
    let window = ctx.config.window();

    // Check-then-act: two invocations that both read `Pending` before either
    // commits will both roll. The store offers no cross-path compare-and-set.
    let flag = read_flag(ctx.store, &layout)?;
    let decision = gate::evaluate(flag, &now, window);
    log::info!(
        "stage=gate decision={} flag={} now={} zone={} window={}",
        decision.label(),
        flag.label(),
        now.stamp(),
        clock.zone_name(),
        window.describe()
    );
    if decision != GateDecision::Proceed {
        if !opts.dry_run {
            audit::record(
                ctx.paths,
                "gate",
                "skipped",
                &format!("decision={} now={}", decision.label(), now.stamp()),
            );
        }
        return Ok(RunOutcome::Skipped { now, decision });
    }

    let roller = SnapshotRoller::new(ctx.store, &layout, clock);
    let archiver = QuarterlyArchiver::new(&ctx.paths.history_dir);
    let horizon = ctx.config.retention.horizon_quarters;
    let plan = roller.plan(instant)?;

    if opts.dry_run {
        let sweep = retention::plan_sweep(archiver.dir(), plan.quarter, horizon).ok();
        log::info!(
            "stage=plan status=dry-run series={} day={} quarter={}",
            plan.snapshot.len(),
            plan.day.date_key,
            plan.quarter
        );
        return Ok(RunOutcome::Planned(PlannedRollover {
            now,
            series: plan.snapshot.len(),
            archive_path: archiver.quarter_path(plan.quarter),
            day: plan.day,
            quarter: plan.quarter,
            history_path: plan.history_path,
            sweep,
        }));
    }

    let rolled = roller.commit(plan)?;
    audit::record(
        ctx.paths,
        "rollover",
        "committed",
        &format!(
            "series={} day={} history={}",
            rolled.snapshot.len(),
            rolled.day.date_key,
            rolled.history_path
        ),
    );

    let archive = archiver.record(rolled.quarter, &rolled.day.date_key, &rolled.snapshot)?;
    audit::record(
        ctx.paths,
        "archive",
        if archive.recovered_corrupt {
            "recovered"
        } else {
            "updated"
        },
        &format!(
            "file={} day={} entries={} sha256={}",
            archive.path.display(),
            archive.date_key,
            archive.entries,
            archive.content_hash
        ),
    );

    let sweep = retention::sweep(archiver.dir(), rolled.quarter, horizon);
    audit::record(
        ctx.paths,
        "retention",
        if sweep.scan_failed {
            "scan-failed"
        } else if sweep.failed.is_empty() {
            "ok"
        } else {
            "partial"
        },
        &format!(
            "cutoff={} deleted={} retained={} failed={} scan_failed={}",
            sweep.cutoff,
            sweep.deleted.len(),
            sweep.retained,
            sweep.failed.len(),
            sweep.scan_failed
        ),
    );

    log::info!(
        "stage=done status=completed day={} quarter={} deleted={}",
        rolled.day.date_key,
        rolled.quarter,
        sweep.deleted.len()
    );

    Ok(RunOutcome::Completed(CompletedRollover {
        now,
        series: rolled.snapshot.len(),
        day: rolled.day,
        quarter: rolled.quarter,
        history_path: rolled.history_path,
        archive,
        sweep,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollover::roller::empty_result;
    use crate::rollover::util::sha256_hex;
    use crate::store::memory::MemoryStore;
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    fn test_paths(tmp: &TempDir) -> RolloverPaths {
        RolloverPaths {
            rollover_home: tmp.path().to_path_buf(),
            history_dir: tmp.path().join("history"),
            logs_dir: tmp.path().join("logs"),
        }
    }

    fn seeded(version: i64) -> MemoryStore {
        MemoryStore::with_root(json!({
            "live_results": {
                "version": version,
                "live": {"A": {"fullResult": "1-2-3"}}
            }
        }))
    }

    // 03:00 IST on 2026-01-15.
    const IN_WINDOW: &str = "2026-01-14T21:30:00Z";
    // 10:00 IST on 2026-01-15.
    const AFTER_WINDOW: &str = "2026-01-15T04:30:00Z";

    #[test]
    fn eligible_run_rolls_archives_and_sweeps() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        fs::create_dir_all(&paths.history_dir).expect("mkdir");
        fs::write(paths.history_dir.join("2022-q4.json"), "{}\n").expect("seed old");
        fs::write(paths.history_dir.join("2023-q1.json"), "{}\n").expect("seed edge");

        let store = seeded(1);
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        let outcome = run_rollover(&ctx, at(IN_WINDOW), RunOptions::default()).expect("run");
        let RunOutcome::Completed(done) = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(done.day.date_key, "2026-01-14");
        assert_eq!(done.quarter.key(), "2026-q1");
        assert_eq!(done.series, 1);

        let root = store.snapshot();
        assert_eq!(root["live_results"]["live"]["A"], empty_result());
        assert_eq!(
            root["live_results"]["last_day"],
            json!({"A": {"fullResult": "1-2-3"}})
        );
        assert_eq!(root["live_results"]["version"], json!(0));

        let archived: Value = serde_json::from_str(
            &fs::read_to_string(paths.history_dir.join("2026-q1.json")).expect("quarter file"),
        )
        .expect("json");
        assert_eq!(
            archived,
            json!({"2026-01-14": {"A": {"fullResult": "1-2-3"}}})
        );

        assert!(!paths.history_dir.join("2022-q4.json").exists());
        assert!(paths.history_dir.join("2023-q1.json").exists());

        let audit = fs::read_to_string(paths.audit_log()).expect("audit log");
        let archive_record: Value = audit
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).expect("audit json"))
            .find(|event| event["phase"] == "archive")
            .expect("archive audit record");
        let want_hash = sha256_hex(br#"{"A":{"fullResult":"1-2-3"}}"#);
        assert_eq!(done.archive.content_hash, want_hash);
        assert!(
            archive_record["message"]
                .as_str()
                .is_some_and(|m| m.contains(&format!("sha256={want_hash}"))),
            "{archive_record}"
        );
    }

    #[test]
    fn second_run_same_day_is_a_no_op() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let store = seeded(1);
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        run_rollover(&ctx, at(IN_WINDOW), RunOptions::default()).expect("first");
        let after_first = store.snapshot();
        let writes = store.writes.get();

        let outcome = run_rollover(&ctx, at("2026-01-14T22:30:00Z"), RunOptions::default())
            .expect("second");
        assert!(matches!(
            outcome,
            RunOutcome::Skipped {
                decision: GateDecision::AlreadyDone,
                ..
            }
        ));
        assert_eq!(store.snapshot(), after_first);
        assert_eq!(store.writes.get(), writes);
    }

    #[test]
    fn done_flag_means_no_mutation_and_no_file() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let store = seeded(0);
        let before = store.snapshot();
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        for instant in [IN_WINDOW, AFTER_WINDOW] {
            let outcome = run_rollover(&ctx, at(instant), RunOptions::default()).expect("run");
            assert!(matches!(
                outcome,
                RunOutcome::Skipped {
                    decision: GateDecision::AlreadyDone,
                    ..
                }
            ));
        }
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.writes.get(), 0);
        assert!(!paths.history_dir.exists());
    }

    #[test]
    fn outside_window_means_no_mutation() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let store = seeded(1);
        let before = store.snapshot();
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        let outcome = run_rollover(&ctx, at(AFTER_WINDOW), RunOptions::default()).expect("run");
        assert!(matches!(
            outcome,
            RunOutcome::Skipped {
                decision: GateDecision::OutsideWindow { minute_of_day: 600 },
                ..
            }
        ));
        assert_eq!(store.snapshot(), before);
        assert!(!paths.history_dir.exists());
    }

    #[test]
    fn dry_run_reports_plan_without_writing() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let store = seeded(1);
        let before = store.snapshot();
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        let outcome =
            run_rollover(&ctx, at(IN_WINDOW), RunOptions { dry_run: true }).expect("dry run");
        let RunOutcome::Planned(plan) = outcome else {
            panic!("expected planned outcome");
        };
        assert_eq!(plan.series, 1);
        assert_eq!(plan.history_path, "live_results/history/2026-q1/2026-01-14");
        assert_eq!(plan.archive_path, paths.history_dir.join("2026-q1.json"));
        assert_eq!(store.snapshot(), before);
        assert!(!paths.history_dir.exists());
        assert!(!paths.logs_dir.exists());
    }

    #[test]
    fn remote_read_failure_is_fatal_before_any_write() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(&tmp);
        let store = seeded(1);
        store.fail_reads.set(true);
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        let err = run_rollover(&ctx, at(IN_WINDOW), RunOptions::default()).expect_err("fatal");
        assert!(matches!(
            err,
            RolloverError::RemoteRead { ref path, .. } if path == "live_results/version"
        ));
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn local_write_failure_after_remote_commit_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let mut paths = test_paths(&tmp);
        let blocker = tmp.path().join("blocked");
        fs::write(&blocker, "file, not dir").expect("seed");
        paths.history_dir = blocker;

        let store = seeded(1);
        let config = RolloverConfig::default();
        let ctx = RunContext {
            store: &store,
            config: &config,
            paths: &paths,
        };

        let err = run_rollover(&ctx, at(IN_WINDOW), RunOptions::default()).expect_err("fatal");
        assert!(matches!(err, RolloverError::LocalWrite { .. }));
        // The remote side had already committed, and the mirror holds the day.
        let root = store.snapshot();
        assert_eq!(root["live_results"]["version"], json!(0));
        assert_eq!(
            root["live_results"]["history"]["2026-q1"]["2026-01-14"],
            json!({"A": {"fullResult": "1-2-3"}})
        );
    }
}
