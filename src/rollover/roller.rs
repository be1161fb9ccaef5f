use crate::error::RolloverError;
use crate::rollover::clock::{CalendarMoment, ClockContext, QuarterId};
use crate::rollover::config::RemoteConfig;
use crate::rollover::gate::FlagState;
use crate::store::{RemoteStore, join_path};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

/// Series key -> opaque result payload.
pub type LiveRecord = Map<String, Value>;

pub const LIVE_SLOT: &str = "live";
pub const LAST_DAY_SLOT: &str = "last_day";
pub const VERSION_SLOT: &str = "version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    pub root: String,
    pub history_root: String,
}

impl RemoteLayout {
    pub fn from_config(cfg: &RemoteConfig) -> Self {
        Self {
            root: cfg.root.trim_matches('/').to_string(),
            history_root: cfg.history_root.trim_matches('/').to_string(),
        }
    }

    pub fn version_path(&self) -> String {
        join_path(&self.root, VERSION_SLOT)
    }

    pub fn live_path(&self) -> String {
        join_path(&self.root, LIVE_SLOT)
    }

    pub fn last_day_path(&self) -> String {
        join_path(&self.root, LAST_DAY_SLOT)
    }

    pub fn history_path(&self, quarter: QuarterId, date_key: &str) -> String {
        join_path(&join_path(&self.history_root, &quarter.key()), date_key)
    }
}

/// The payload every live series is reset to.
pub fn empty_result() -> Value {
    json!({
        "fullResult": "--- - - ---",
        "openPanel": "---",
        "openJodi": "-",
        "closeJodi": "-",
        "closePanel": "---",
        "openUpdate": null,
        "closeUpdate": null
    })
}

/// Same key set as `live`, every payload replaced by [`empty_result`].
pub fn reset_template(live: &LiveRecord) -> LiveRecord {
    live.keys()
        .map(|key| (key.clone(), empty_result()))
        .collect()
}

pub fn read_flag(
    store: &dyn RemoteStore,
    layout: &RemoteLayout,
) -> Result<FlagState, RolloverError> {
    let path = layout.version_path();
    let raw = store
        .read(&path)
        .map_err(|source| RolloverError::RemoteRead { path, source })?;
    Ok(FlagState::decode(raw.as_ref()))
}

pub fn read_live(
    store: &dyn RemoteStore,
    layout: &RemoteLayout,
) -> Result<LiveRecord, RolloverError> {
    let path = layout.live_path();
    let raw = store
        .read(&path)
        .map_err(|source| RolloverError::RemoteRead {
            path: path.clone(),
            source,
        })?;
    match raw {
        None => Ok(LiveRecord::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(RolloverError::RemoteRead {
            path,
            source: anyhow::anyhow!(
                "live slot holds {} instead of an object",
                kind_of(&other)
            ),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Everything a rollover would do, computed without touching the store.
#[derive(Debug, Clone)]
pub struct RolloverPlan {
    pub snapshot: LiveRecord,
    pub template: LiveRecord,
    pub day: CalendarMoment,
    pub quarter: QuarterId,
    pub history_path: String,
}

#[derive(Debug, Clone)]
pub struct RolloverOutput {
    pub snapshot: LiveRecord,
    pub day: CalendarMoment,
    pub quarter: QuarterId,
    pub history_path: String,
}

pub struct SnapshotRoller<'a> {
    store: &'a dyn RemoteStore,
    layout: &'a RemoteLayout,
    clock: ClockContext,
}

impl<'a> SnapshotRoller<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        layout: &'a RemoteLayout,
        clock: ClockContext,
    ) -> Self {
        Self {
            store,
            layout,
            clock,
        }
    }

    pub fn plan(&self, now: DateTime<Utc>) -> Result<RolloverPlan, RolloverError> {
        let snapshot = read_live(self.store, self.layout)?;
        let template = reset_template(&snapshot);
        // The roll happens after local midnight, so the snapshot belongs to
        // the previous calendar day.
        let day = self.clock.previous_day(now);
        let quarter = day.quarter();
        let history_path = self.layout.history_path(quarter, &day.date_key);
        Ok(RolloverPlan {
            snapshot,
            template,
            day,
            quarter,
            history_path,
        })
    }

    /// Archive-into-last-slot, reset-live and flag-claim go out as one
    /// update; the history mirror follows as its own write.
    pub fn commit(&self, plan: RolloverPlan) -> Result<RolloverOutput, RolloverError> {
        let RolloverPlan {
            snapshot,
            template,
            day,
            quarter,
            history_path,
        } = plan;

        let mut fields = Map::new();
        fields.insert(LAST_DAY_SLOT.to_string(), Value::Object(snapshot.clone()));
        fields.insert(LIVE_SLOT.to_string(), Value::Object(template));
        fields.insert(VERSION_SLOT.to_string(), FlagState::Done.encode());
        self.store
            .update(&self.layout.root, fields)
            .map_err(|source| RolloverError::RemoteWrite {
                path: self.layout.root.clone(),
                source,
            })?;
        log::info!(
            "stage=rollover status=committed store={} series={} root={}",
            self.store.describe(),
            snapshot.len(),
            self.layout.root
        );

        self.store
            .set(&history_path, &Value::Object(snapshot.clone()))
            .map_err(|source| RolloverError::RemoteWrite {
                path: history_path.clone(),
                source,
            })?;
        log::info!(
            "stage=history-mirror status=written path={history_path} day={}",
            day.date_key
        );

        Ok(RolloverOutput {
            snapshot,
            day,
            quarter,
            history_path,
        })
    }

    pub fn roll(&self, now: DateTime<Utc>) -> Result<RolloverOutput, RolloverError> {
        let plan = self.plan(now)?;
        self.commit(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn layout() -> RemoteLayout {
        RemoteLayout::from_config(&RemoteConfig::default())
    }

    fn clock() -> ClockContext {
        ClockContext::from_name("Asia/Kolkata").expect("zone")
    }

    fn three_am_ist() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-14T21:30:00Z")
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn reset_template_keeps_keys_and_blanks_values() {
        let live = json!({"A": {"fullResult": "1-2-3"}, "B": {"openPanel": "123"}, "C": 5});
        let Value::Object(live) = live else {
            unreachable!()
        };
        let template = reset_template(&live);
        assert_eq!(
            template.keys().collect::<Vec<_>>(),
            live.keys().collect::<Vec<_>>()
        );
        assert!(template.values().all(|v| *v == empty_result()));
        assert!(reset_template(&LiveRecord::new()).is_empty());
    }

    #[test]
    fn roll_transitions_remote_state() {
        let store = MemoryStore::with_root(json!({
            "live_results": {
                "version": 1,
                "live": {"A": {"fullResult": "1-2-3"}},
                "last_day": {"A": {"fullResult": "old"}}
            }
        }));
        let layout = layout();
        let out = SnapshotRoller::new(&store, &layout, clock())
            .roll(three_am_ist())
            .expect("roll");

        assert_eq!(out.day.date_key, "2026-01-14");
        assert_eq!(out.quarter, QuarterId::new(2026, 1));
        assert_eq!(out.history_path, "live_results/history/2026-q1/2026-01-14");

        let root = store.snapshot();
        assert_eq!(root["live_results"]["version"], json!(0));
        assert_eq!(
            root["live_results"]["last_day"],
            json!({"A": {"fullResult": "1-2-3"}})
        );
        assert_eq!(root["live_results"]["live"]["A"], empty_result());
        assert_eq!(
            root["live_results"]["history"]["2026-q1"]["2026-01-14"],
            json!({"A": {"fullResult": "1-2-3"}})
        );
        assert_eq!(store.writes.get(), 2);
    }

    #[test]
    fn absent_live_slot_rolls_as_empty_mapping() {
        let store = MemoryStore::with_root(json!({"live_results": {"version": 1}}));
        let layout = layout();
        let out = SnapshotRoller::new(&store, &layout, clock())
            .roll(three_am_ist())
            .expect("roll");
        assert!(out.snapshot.is_empty());
        assert_eq!(store.snapshot()["live_results"]["version"], json!(0));
    }

    #[test]
    fn failed_update_leaves_state_unchanged() {
        let seeded = json!({
            "live_results": {"version": 1, "live": {"A": {"fullResult": "1-2-3"}}}
        });
        let store = MemoryStore::with_root(seeded.clone());
        store.fail_updates.set(true);
        let layout = layout();
        let err = SnapshotRoller::new(&store, &layout, clock())
            .roll(three_am_ist())
            .expect_err("update must fail");
        assert!(matches!(
            err,
            RolloverError::RemoteWrite { ref path, .. } if path == "live_results"
        ));
        assert_eq!(store.snapshot(), seeded);
    }

    #[test]
    fn failed_history_mirror_is_a_remote_write_error() {
        let store = MemoryStore::with_root(json!({
            "live_results": {"version": 1, "live": {"A": {"fullResult": "1-2-3"}}}
        }));
        store.fail_sets.set(true);
        let layout = layout();
        let err = SnapshotRoller::new(&store, &layout, clock())
            .roll(three_am_ist())
            .expect_err("mirror must fail");
        assert!(matches!(
            err,
            RolloverError::RemoteWrite { ref path, .. } if path.ends_with("2026-q1/2026-01-14")
        ));
    }

    #[test]
    fn non_object_live_slot_is_a_read_failure() {
        let store = MemoryStore::with_root(json!({"live_results": {"live": "oops"}}));
        let err = read_live(&store, &layout()).expect_err("must fail");
        assert!(matches!(err, RolloverError::RemoteRead { .. }));
    }

    #[test]
    fn layout_honours_custom_roots() {
        let layout = RemoteLayout::from_config(&RemoteConfig {
            root: "/results/".to_string(),
            history_root: "history".to_string(),
            request_timeout_secs: 5,
        });
        assert_eq!(layout.version_path(), "results/version");
        assert_eq!(layout.last_day_path(), "results/last_day");
        assert_eq!(
            layout.history_path(QuarterId::new(2025, 4), "2025-12-31"),
            "history/2025-q4/2025-12-31"
        );
    }
}
