//! External variable store collaborator.
//!
//! The evaluator only ever talks to the store through [`VarStore`]: look a
//! name up once, then read and write through the returned [`VarHandle`].
//! [`MemoryStore`] is a `HashMap`-backed implementation for embedding and
//! tests.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Opaque binding into a [`VarStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarHandle(pub u32);

/// Kind of notification a script may ask the store for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    /// Ask to recompute the variable's value when it is read.
    Calc,
    /// Ask to be told when the variable changes.
    Modified,
}

/// The variable store as seen by the evaluator.
///
/// Errors from `get`/`set` are passed to the caller unmodified, normally as
/// [`Error::Store`].
pub trait VarStore {
    fn find_by_name(&mut self, name: &str) -> Option<VarHandle>;

    fn get(&mut self, handle: VarHandle) -> Result<Value>;

    fn set(&mut self, handle: VarHandle, value: &Value) -> Result<()>;

    fn notify(&mut self, _handle: VarHandle, _kind: NotifyKind) -> Result<()> {
        Ok(())
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Entry {
    name: String,
    value: Value,
    fail_get: Option<i32>,
    fail_set: Option<i32>,
    notifications: Vec<NotifyKind>,
}

/// In-memory variable store.
///
/// Values are stored detached, so the store never shares a string buffer
/// with a tree node.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Vec<Entry>,
    by_name: HashMap<String, VarHandle>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or overwrite) a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> VarHandle {
        let name = name.into();
        let value = value.into().detached();
        if let Some(&h) = self.by_name.get(&name) {
            self.entries[h.0 as usize].value = value;
            return h;
        }
        let h = VarHandle(self.entries.len() as u32);
        self.entries.push(Entry {
            name: name.clone(),
            value,
            fail_get: None,
            fail_set: None,
            notifications: Vec::new(),
        });
        self.by_name.insert(name, h);
        h
    }

    /// Current value of a variable, by name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        let h = self.by_name.get(name)?;
        Some(&self.entries[h.0 as usize].value)
    }

    pub fn name(&self, handle: VarHandle) -> Option<&str> {
        self.entries.get(handle.0 as usize).map(|e| e.name.as_str())
    }

    /// Make every read of `name` fail with `code`.
    pub fn fail_reads(&mut self, name: &str, code: i32) {
        if let Some(e) = self.entry_by_name(name) {
            e.fail_get = Some(code);
        }
    }

    /// Make every write of `name` fail with `code`.
    pub fn fail_writes(&mut self, name: &str, code: i32) {
        if let Some(e) = self.entry_by_name(name) {
            e.fail_set = Some(code);
        }
    }

    /// Notifications requested for `name`, in request order.
    pub fn notifications(&self, name: &str) -> &[NotifyKind] {
        self.by_name
            .get(name)
            .map(|h| self.entries[h.0 as usize].notifications.as_slice())
            .unwrap_or(&[])
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_by_name(&mut self, name: &str) -> Option<&mut Entry> {
        let h = *self.by_name.get(name)?;
        self.entries.get_mut(h.0 as usize)
    }

    fn entry(&mut self, handle: VarHandle) -> Result<&mut Entry> {
        self.entries
            .get_mut(handle.0 as usize)
            .ok_or(Error::Store { code: libc::ENOENT })
    }
}

impl VarStore for MemoryStore {
    fn find_by_name(&mut self, name: &str) -> Option<VarHandle> {
        self.by_name.get(name).copied()
    }

    fn get(&mut self, handle: VarHandle) -> Result<Value> {
        let e = self.entry(handle)?;
        match e.fail_get {
            Some(code) => Err(Error::Store { code }),
            None => Ok(e.value.detached()),
        }
    }

    fn set(&mut self, handle: VarHandle, value: &Value) -> Result<()> {
        let e = self.entry(handle)?;
        if let Some(code) = e.fail_set {
            return Err(Error::Store { code });
        }
        e.value = value.detached();
        self.writes += 1;
        Ok(())
    }

    fn notify(&mut self, handle: VarHandle, kind: NotifyKind) -> Result<()> {
        self.entry(handle)?.notifications.push(kind);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
