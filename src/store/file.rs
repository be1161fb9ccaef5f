use super::tree::{get_at, set_at};
use super::{RemoteStore, join_path, split_path};
use crate::rollover::util::write_atomic;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// The remote tree contract served from a single local JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<Value> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Value::Object(Map::new())),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    fn save(&self, root: &Value) -> Result<()> {
        let data = serde_json::to_string_pretty(root)?;
        write_atomic(&self.path, format!("{data}\n").as_bytes())
    }
}

impl RemoteStore for JsonFileStore {
    fn read(&self, path: &str) -> Result<Option<Value>> {
        let root = self.load()?;
        Ok(get_at(&root, &split_path(path)).cloned())
    }

    fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let mut root = self.load()?;
        for (child, value) in fields {
            let full = join_path(path, &child);
            set_at(&mut root, &split_path(&full), value);
        }
        self.save(&root)
    }

    fn set(&self, path: &str, value: &Value) -> Result<()> {
        let mut root = self.load()?;
        set_at(&mut root, &split_path(path), value.clone());
        self.save(&root)
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
