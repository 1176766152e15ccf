//! Local declaration list and system-variable cache.
//!
//! Both tables are lists of [`NodeId`]s into the evaluation context's arena,
//! scanned by identifier in insertion order.  The declaration list is
//! replaced for every compiled action; the sysvar cache only grows.

use tracing::debug;

use crate::error::{Error, Result};
use crate::store::VarStore;
use crate::tree::{Arena, Node, NodeId, Op};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct SymbolTables {
    declarations: Vec<NodeId>,
    sysvars: Vec<NodeId>,
}

fn find(arena: &Arena, list: &[NodeId], name: &str) -> Option<NodeId> {
    list.iter()
        .copied()
        .find(|&id| arena.get(id).and_then(|n| n.id.as_deref()) == Some(name))
}

impl SymbolTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_local(&self, arena: &Arena, name: &str) -> Option<NodeId> {
        find(arena, &self.declarations, name)
    }

    pub fn find_sysvar(&self, arena: &Arena, name: &str) -> Option<NodeId> {
        find(arena, &self.sysvars, name)
    }

    /// Replace the declaration list with the current action's locals.
    pub fn set_declarations(&mut self, declarations: Vec<NodeId>) {
        self.declarations = declarations;
    }

    pub fn declarations(&self) -> &[NodeId] {
        &self.declarations
    }

    pub fn sysvars(&self) -> &[NodeId] {
        &self.sysvars
    }

    /// Resolve `name` to a node.
    ///
    /// A declaration always creates a fresh local node.  Otherwise the
    /// declaration list is searched, then the sysvar cache, then the store;
    /// a store hit fetches the current value and is appended to the cache.
    /// Nothing is added to either table when resolution fails.
    pub fn new_identifier(
        &mut self,
        arena: &mut Arena,
        store: &mut dyn VarStore,
        name: &str,
        declaration: bool,
    ) -> Result<NodeId> {
        if declaration {
            let mut node = Node::new(Op::LocalVar, Value::default());
            node.id = Some(name.to_owned());
            node.flags.local = true;
            return Ok(arena.push(node));
        }

        if let Some(id) = self
            .find_local(arena, name)
            .or_else(|| self.find_sysvar(arena, name))
        {
            return Ok(id);
        }

        let handle = store
            .find_by_name(name)
            .ok_or_else(|| Error::not_found(format!("variable '{name}'")))?;
        let value = store.get(handle)?;

        let mut node = Node::new(Op::SysVar, value);
        node.id = Some(name.to_owned());
        node.handle = Some(handle);
        let id = arena.push(node);
        self.sysvars.push(id);
        debug!(name, ?handle, "bound system variable");
        Ok(id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
