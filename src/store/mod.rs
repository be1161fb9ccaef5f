//! Remote hierarchical key-value store seam.
//!
//! The rollover core only consumes the read/update contract below; which
//! backend answers it is decided once, at connection time.

pub mod file;
#[cfg(test)]
pub mod memory;
pub mod rtdb;
mod tree;

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub trait RemoteStore {
    /// Read the value at `path`. Absent paths are `Ok(None)`.
    fn read(&self, path: &str) -> Result<Option<Value>>;

    /// Apply all `fields` (child paths of `path`) in one request.
    fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()>;

    /// Replace the value at `path`. Writing `null` removes it.
    fn set(&self, path: &str, value: &Value) -> Result<()>;

    /// Short human label for reports and logs.
    fn describe(&self) -> String;
}

pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent}/{child}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    File(PathBuf),
    Http { base_url: String, auth: Option<String> },
}

fn env_non_empty_first(vars: &[&str]) -> Option<String> {
    for var in vars {
        if let Ok(v) = env::var(var) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

pub fn parse_target(url: &str, auth: Option<String>) -> Result<StoreTarget> {
    let url = url.trim();
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(anyhow!("file store url must name a document path"));
        }
        return Ok(StoreTarget::File(PathBuf::from(path)));
    }
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(StoreTarget::Http {
            base_url: url.trim_end_matches('/').to_string(),
            auth,
        });
    }
    Err(anyhow!(
        "unsupported database url `{url}`: use https://, http:// or file://"
    ))
}

pub fn resolve_target() -> Result<StoreTarget> {
    let url = env_non_empty_first(&["ROLLOVER_DATABASE_URL", "FIREBASE_DATABASE_URL"])
        .ok_or_else(|| anyhow!("missing ROLLOVER_DATABASE_URL (or FIREBASE_DATABASE_URL)"))?;
    let auth = env_non_empty_first(&["ROLLOVER_DATABASE_AUTH", "FIREBASE_DATABASE_AUTH"]);
    parse_target(&url, auth)
}

pub fn connect(target: &StoreTarget, timeout: Duration) -> Result<Box<dyn RemoteStore>> {
    match target {
        StoreTarget::File(path) => Ok(Box::new(file::JsonFileStore::new(path.clone()))),
        StoreTarget::Http { base_url, auth } => Ok(Box::new(rtdb::RtdbClient::new(
            base_url,
            auth.clone(),
            timeout,
        )?)),
    }
}
