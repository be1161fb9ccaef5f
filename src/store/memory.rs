use super::tree::{get_at, set_at};
use super::{RemoteStore, join_path, split_path};
use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};

/// In-process tree used by tests; failures can be switched on per operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RefCell<Value>,
    pub fail_reads: Cell<bool>,
    pub fail_updates: Cell<bool>,
    pub fail_sets: Cell<bool>,
    pub writes: Cell<usize>,
}

impl MemoryStore {
    pub fn with_root(root: Value) -> Self {
        Self {
            root: RefCell::new(root),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Value {
        self.root.borrow().clone()
    }
}

impl RemoteStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Option<Value>> {
        if self.fail_reads.get() {
            bail!("injected read failure");
        }
        Ok(get_at(&self.root.borrow(), &split_path(path)).cloned())
    }

    fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        if self.fail_updates.get() {
            bail!("injected update failure");
        }
        let mut root = self.root.borrow_mut();
        for (child, value) in fields {
            set_at(&mut root, &split_path(&join_path(path, &child)), value);
        }
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn set(&self, path: &str, value: &Value) -> Result<()> {
        if self.fail_sets.get() {
            bail!("injected set failure");
        }
        set_at(&mut self.root.borrow_mut(), &split_path(path), value.clone());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
