//! Quarter-partitioned local archive: one JSON file per quarter holding a
//! `date key -> snapshot` map.

use crate::error::RolloverError;
use crate::rollover::clock::QuarterId;
use crate::rollover::roller::LiveRecord;
use crate::rollover::util::{sha256_hex, write_atomic};
use crate::rollover::warn::{self, WarnEvent};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Date key -> archived snapshot. Entries are kept as raw values so a
/// malformed day never costs the rest of the quarter.
pub type QuarterContent = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct LoadedQuarter {
    pub content: QuarterContent,
    pub recovered_corrupt: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub path: PathBuf,
    pub date_key: String,
    pub entries: usize,
    pub replaced: bool,
    pub recovered_corrupt: bool,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct QuarterlyArchiver {
    dir: PathBuf,
}

impl QuarterlyArchiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn quarter_path(&self, quarter: QuarterId) -> PathBuf {
        self.dir.join(quarter.file_name())
    }

    /// Missing and unparseable files both load as empty; only the latter is
    /// flagged, and warned about, as a recovery. A file is unparseable when
    /// it is not JSON or its top level is not an object.
    pub fn load(&self, quarter: QuarterId) -> anyhow::Result<LoadedQuarter> {
        let path = self.quarter_path(quarter);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LoadedQuarter::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let (reason, err) = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => {
                return Ok(LoadedQuarter {
                    content: map.into_iter().collect(),
                    recovered_corrupt: false,
                });
            }
            Ok(_) => (
                "quarter-file-not-an-object",
                "top level is not a json object".to_string(),
            ),
            Err(err) => ("quarter-file-unparseable", err.to_string()),
        };

        warn::emit(WarnEvent {
            code: "LOCAL_ARCHIVE_CORRUPT",
            stage: "archive",
            action: "start-fresh",
            subject: &path.display().to_string(),
            reason,
            err: &err,
        });
        Ok(LoadedQuarter {
            content: QuarterContent::new(),
            recovered_corrupt: true,
        })
    }

    /// Set `content[date_key] = snapshot` and rewrite the whole file.
    pub fn record(
        &self,
        quarter: QuarterId,
        date_key: &str,
        snapshot: &LiveRecord,
    ) -> Result<ArchiveOutcome, RolloverError> {
        let path = self.quarter_path(quarter);
        let local_err = |source: anyhow::Error| RolloverError::LocalWrite {
            path: path.clone(),
            source,
        };

        let LoadedQuarter {
            mut content,
            recovered_corrupt,
        } = self.load(quarter).map_err(local_err)?;
        let replaced = content
            .insert(date_key.to_string(), Value::Object(snapshot.clone()))
            .is_some();

        let data = serde_json::to_string_pretty(&content)
            .context("failed to serialize quarter file")
            .map_err(local_err)?;
        write_atomic(&path, format!("{data}\n").as_bytes()).map_err(local_err)?;

        let content_hash = serde_json::to_vec(snapshot)
            .map(|bytes| sha256_hex(&bytes))
            .unwrap_or_default();

        log::info!(
            "stage=archive status=updated file={} day={date_key} entries={} replaced={replaced}",
            path.display(),
            content.len()
        );

        Ok(ArchiveOutcome {
            path,
            date_key: date_key.to_string(),
            entries: content.len(),
            replaced,
            recovered_corrupt,
            content_hash,
        })
    }
}
