//! The tree evaluator.
//!
//! A [`Context`] owns everything an evaluation pass touches: the node arena,
//! the symbol tables, the timer registry and the script runner.  The
//! variable store is passed into each call, so one store can serve many
//! contexts.
//!
//! Evaluating a node runs its right subtree, then its left subtree, then the
//! node's own operator.  A failing subtree does not stop its sibling or the
//! parent operator from running; the parent reports the operator's own
//! error if it has one, else the most recent subtree error.  `IF` is the
//! only place where a failure short-circuits: a failing condition skips both
//! branches.
//!
//! Passes are synchronous and must not overlap.  Timer firings reach the
//! context through [`Context::timer_fired`] or [`Context::set_timer`], which
//! the caller invokes between passes.

use tracing::{debug, trace, warn};

use crate::cast;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ops::assign::{self, Fix};
use crate::ops::{arith, bitwise, boolean, compare};
use crate::runner::{ScriptRunner, ShellRunner};
use crate::store::{NotifyKind, VarStore};
use crate::strbuf;
use crate::symbols::SymbolTables;
use crate::timer::{ActiveTimer, NullBackend, TimerBackend, TimerRegistry};
use crate::tree::{Arena, Block, BlockId, Node, NodeId, Op, Statement, StmtKind};
use crate::value::Value;

type Binary = fn(&Value, &Value) -> Result<Value>;
type Update = fn(&mut Value, &Value) -> Result<Value>;

/// Evaluation state for one family of compiled actions.
pub struct Context {
    arena: Arena,
    symbols: SymbolTables,
    timers: TimerRegistry,
    runner: Box<dyn ScriptRunner>,
    config: Config,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("nodes", &self.arena.len())
            .field("symbols", &self.symbols)
            .field("timers", &self.timers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Config::default())
    }
}

impl Context {
    /// A context whose scripts run through the configured shell and whose
    /// timers never fire.
    pub fn new(config: Config) -> Self {
        Context {
            arena: Arena::new(),
            symbols: SymbolTables::new(),
            timers: Self::registry(&config, Box::new(NullBackend::default())),
            runner: Box::new(ShellRunner::new(config.shell.clone())),
            config,
        }
    }

    pub fn with_runner(mut self, runner: Box<dyn ScriptRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the timer backend.  Any armed timers are forgotten.
    pub fn with_timer_backend(mut self, backend: Box<dyn TimerBackend>) -> Self {
        self.timers = Self::registry(&self.config, backend);
        self
    }

    fn registry(config: &Config, backend: Box<dyn TimerBackend>) -> TimerRegistry {
        TimerRegistry::new(
            config.max_timers,
            backend,
            ActiveTimer::new(config.timer_mode, config.timer_queue_depth),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Builders for constants, operators and `IF` live on the arena.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn symbols(&self) -> &SymbolTables {
        &self.symbols
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Current value of a node.
    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.arena.get(id).map(|n| &n.value)
    }

    // ── Compile-side helpers ──────────────────────────────────────────────────

    /// Resolve an identifier; see [`SymbolTables::new_identifier`].
    pub fn new_identifier(
        &mut self,
        store: &mut dyn VarStore,
        name: &str,
        declaration: bool,
    ) -> Result<NodeId> {
        self.symbols
            .new_identifier(&mut self.arena, store, name, declaration)
    }

    pub fn set_declarations(&mut self, declarations: Vec<NodeId>) {
        self.symbols.set_declarations(declarations);
    }

    pub fn add_block(&mut self, block: Block) -> BlockId {
        self.arena.add_block(block)
    }

    /// Ask the store to notify about a system variable, once per kind.
    pub fn request_notification(
        &mut self,
        store: &mut dyn VarStore,
        id: NodeId,
        kind: NotifyKind,
    ) -> Result<()> {
        let node = self.node(id)?;
        let handle = match (node.op, node.handle) {
            (Op::SysVar, Some(h)) => h,
            _ => return Err(Error::invalid("notification on a non-system variable")),
        };
        let already = match kind {
            NotifyKind::Calc => node.flags.calc_notification,
            NotifyKind::Modified => node.flags.modified_notification,
        };
        if already {
            return Ok(());
        }
        store.notify(handle, kind)?;
        let node = self.node_mut(id)?;
        match kind {
            NotifyKind::Calc => node.flags.calc_notification = true,
            NotifyKind::Modified => node.flags.modified_notification = true,
        }
        debug!(id = node.id.as_deref(), ?kind, "notification requested");
        Ok(())
    }

    // ── Timers ────────────────────────────────────────────────────────────────

    /// Overwrite the active timer id; 0 means none.
    pub fn set_timer(&mut self, id: u16) {
        self.timers.set_active(id);
    }

    /// Report that timer `id` expired.
    pub fn timer_fired(&mut self, id: u16) {
        self.timers.fired(id);
    }

    pub fn active_timer(&self) -> u16 {
        self.timers.active()
    }

    /// Make the next undelivered firing active for the coming pass.
    ///
    /// Returns the new active id, 0 once every firing has been consumed.
    pub fn next_timer_pass(&mut self) -> u16 {
        self.timers.next_pass()
    }

    // ── Statements ────────────────────────────────────────────────────────────

    /// Run every statement of `block` in order.
    ///
    /// A failing statement does not stop the ones after it; the last failure
    /// is returned.
    pub fn process_compound_statement(
        &mut self,
        store: &mut dyn VarStore,
        block: BlockId,
    ) -> Result<()> {
        let len = self
            .arena
            .block(block)
            .map(Vec::len)
            .ok_or_else(|| Error::invalid(format!("no block {}", block.index())))?;

        let mut result = Ok(());
        for i in 0..len {
            let Some(stmt) = self.arena.block(block).and_then(|b| b.get(i)).cloned() else {
                break;
            };
            if let Err(e) = self.process_statement(store, &stmt) {
                result = Err(e);
            }
        }
        result
    }

    pub fn process_statement(&mut self, store: &mut dyn VarStore, stmt: &Statement) -> Result<()> {
        match &stmt.kind {
            StmtKind::Expr(id) => self.process_variable(store, *id),
            StmtKind::Script(script) => {
                self.process_script(script);
                Ok(())
            }
        }
    }

    /// Hand `script` to the runner.  The outcome is not observed.
    pub fn process_script(&mut self, script: &str) {
        self.runner.run(script);
    }

    /// Evaluate the tree rooted at `id`, logging a failure.
    ///
    /// Each statement logs its own failure at warn level; failures inside
    /// its expression subtrees are logged at debug level.
    pub fn process_variable(&mut self, store: &mut dyn VarStore, id: NodeId) -> Result<()> {
        let result = self.eval_node(store, id);
        if let Err(e) = &result {
            let (op, line) = self.node(id).map_or(("?", 0), |n| (n.op.name(), n.lineno));
            warn!(op, line, code = e.code(), error = %e, "error processing action");
        }
        result
    }

    fn eval_node(&mut self, store: &mut dyn VarStore, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let (op, left, right, line) = (node.op, node.left, node.right, node.lineno);

        let result = if op == Op::If {
            self.process_if(store, left, right)
        } else {
            self.process_expr(store, id)
        };
        if let Err(e) = &result {
            debug!(op = op.name(), line, code = e.code(), error = %e, "subtree failed");
        }
        result
    }

    /// `IF (cond) ELSE{then, else}`.
    pub fn process_if(
        &mut self,
        store: &mut dyn VarStore,
        cond: Option<NodeId>,
        wrapper: Option<NodeId>,
    ) -> Result<()> {
        let (Some(cond), Some(wrapper)) = (cond, wrapper) else {
            return Err(Error::invalid("IF needs a condition and an ELSE wrapper"));
        };
        let Op::Else { then_block, else_block } = self.node(wrapper)?.op else {
            return Err(Error::invalid("IF right child is not ELSE"));
        };

        self.eval_node(store, cond)?;

        if self.node(cond)?.value.is_truthy() {
            let then_block = then_block.ok_or_else(|| Error::invalid("IF without a THEN block"))?;
            self.process_compound_statement(store, then_block)
        } else if let Some(else_block) = else_block {
            self.process_compound_statement(store, else_block)
        } else {
            Ok(())
        }
    }

    /// Evaluate children right then left, then apply the node's operator.
    pub fn process_expr(&mut self, store: &mut dyn VarStore, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let (op, left, right) = (node.op, node.left, node.right);

        let mut child_err = None;
        for child in [right, left].into_iter().flatten() {
            if let Err(e) = self.eval_node(store, child) {
                child_err = Some(e);
            }
        }

        trace!(op = op.name(), "dispatch");
        self.dispatch(store, id, op, left, right)?;
        child_err.map_or(Ok(()), Err)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn dispatch(
        &mut self,
        store: &mut dyn VarStore,
        id: NodeId,
        op: Op,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> Result<()> {
        match op {
            Op::Num | Op::FloatNum | Op::LocalVar | Op::Str | Op::Timer => Ok(()),
            Op::Illegal | Op::If | Op::Else { .. } => {
                Err(Error::unsupported(format!("{op} is not an operator")))
            }

            Op::SysVar => self.get_var(store, id),

            Op::Mul => self.binary(id, left, right, arith::mul),
            Op::Div => self.binary(id, left, right, arith::div),
            Op::Sub => self.binary(id, left, right, arith::sub),
            Op::Add => {
                let (l, r) = (self.operand(left)?, self.operand(right)?);
                self.with_result(id, |result| arith::add(result, &l, &r))
            }

            Op::BitAnd => self.binary(id, left, right, bitwise::band),
            Op::BitOr => self.binary(id, left, right, bitwise::bor),
            Op::BitXor => self.binary(id, left, right, bitwise::xor),
            Op::Shl => self.binary(id, left, right, bitwise::shl),
            Op::Shr => self.binary(id, left, right, bitwise::shr),

            Op::And => self.binary(id, left, right, boolean::and),
            Op::Or => self.binary(id, left, right, boolean::or),
            Op::Not => {
                let v = boolean::not(&self.operand(left)?);
                self.set_result(id, v)
            }

            Op::Equals => self.binary(id, left, right, compare::equals),
            Op::NotEquals => self.binary(id, left, right, compare::not_equals),
            Op::Gt => self.binary(id, left, right, compare::gt),
            Op::Lt => self.binary(id, left, right, compare::lt),
            Op::Gte => self.binary(id, left, right, compare::gte),
            Op::Lte => self.binary(id, left, right, compare::lte),

            Op::Assign => self.update(store, id, left, right, assign::assign),
            Op::PlusEquals => self.update(store, id, left, right, assign::plus_equals),
            Op::MinusEquals => self.update(store, id, left, right, assign::minus_equals),
            Op::TimesEquals => self.update(store, id, left, right, assign::times_equals),
            Op::DivEquals => self.update(store, id, left, right, assign::div_equals),
            Op::AndEquals => self.update(store, id, left, right, assign::and_equals),
            Op::OrEquals => self.update(store, id, left, right, assign::or_equals),
            Op::XorEquals => self.update(store, id, left, right, assign::xor_equals),
            Op::Inc | Op::Dec => self.step(store, id, op, left, right),

            Op::ToFloat => {
                let v = cast::to_float(&self.operand(left)?);
                self.set_result(id, v)
            }
            Op::ToInt => {
                let v = cast::to_int(&self.operand(left)?);
                self.set_result(id, v)
            }
            Op::ToShort => {
                let v = cast::to_short(&self.operand(left)?);
                self.set_result(id, v)
            }
            Op::ToString => {
                let src = self.operand(left)?;
                let format = match right.and_then(|r| self.arena.get(r)).map(|n| &n.value) {
                    Some(Value::Str(Some(s))) => Some(s.to_vec()),
                    _ => None,
                };
                self.with_result(id, |result| cast::to_string(result, &src, format.as_deref()))
            }

            // Operand failures leave the result untouched; registry
            // failures set it to 0.
            Op::CreateTimer | Op::CreateTick => {
                let timer = self.operand(left)?.as_u16()?;
                let ms = self.operand(right)?.as_u32()?;
                let outcome = self.timers.create(timer, ms, op == Op::CreateTick);
                self.set_result(id, Value::from(outcome.is_ok()))?;
                outcome
            }
            Op::DeleteTimer => {
                let timer = self.operand(left)?.as_u16()?;
                let outcome = self.timers.delete(timer);
                self.set_result(id, Value::from(outcome.is_ok()))?;
                outcome
            }
            Op::ActiveTimer => {
                let active = self.timers.active();
                self.set_result(id, Value::U16(active))
            }
        }
    }

    fn binary(&mut self, id: NodeId, left: Option<NodeId>, right: Option<NodeId>, f: Binary) -> Result<()> {
        let (l, r) = (self.operand(left)?, self.operand(right)?);
        let v = f(&l, &r)?;
        self.set_result(id, v)
    }

    /// Assignment family: mutate the left operand, set the result, then
    /// write a system variable back to the store.
    ///
    /// A failed write leaves the in-memory value mutated.
    fn update(
        &mut self,
        store: &mut dyn VarStore,
        id: NodeId,
        left: Option<NodeId>,
        right: Option<NodeId>,
        f: Update,
    ) -> Result<()> {
        let target = left.ok_or_else(|| Error::invalid("assignment without a target"))?;
        let r = self.operand(right)?;
        let mut v = self.operand(Some(target))?;
        let out = f(&mut v, &r)?;
        let node = self.node_mut(target)?;
        node.value = v;
        node.flags.assigned = true;
        self.set_result(id, out)?;
        self.write_back(store, target)
    }

    /// `++`/`--`: post-fix when the operand is on the left, pre-fix when it
    /// is on the right.
    fn step(
        &mut self,
        store: &mut dyn VarStore,
        id: NodeId,
        op: Op,
        left: Option<NodeId>,
        right: Option<NodeId>,
    ) -> Result<()> {
        let (target, fix) = match (left, right) {
            (Some(l), _) => (l, Fix::Post),
            (None, Some(r)) => (r, Fix::Pre),
            (None, None) => return Err(Error::invalid(format!("{op} without an operand"))),
        };
        let mut v = self.operand(Some(target))?;
        let out = if op == Op::Inc {
            assign::inc(&mut v, fix)?
        } else {
            assign::dec(&mut v, fix)?
        };
        let node = self.node_mut(target)?;
        node.value = v;
        node.flags.assigned = true;
        self.set_result(id, out)?;
        self.write_back(store, target)
    }

    /// Refresh a system variable from the store unless it is a write target.
    ///
    /// Strings are copied into the node's existing buffer.
    fn get_var(&mut self, store: &mut dyn VarStore, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if node.flags.lvalue {
            return Ok(());
        }
        let handle = node
            .handle
            .ok_or_else(|| Error::invalid("system variable without a store binding"))?;
        let fresh = store.get(handle)?;

        let node = self.node_mut(id)?;
        if let (Value::Str(slot), Value::Str(src)) = (&mut node.value, &fresh) {
            let bytes = src.as_ref().map(|s| s.to_vec()).unwrap_or_default();
            strbuf::assign(slot, &bytes)?;
            return Ok(());
        }
        node.value = fresh;
        Ok(())
    }

    fn write_back(&self, store: &mut dyn VarStore, target: NodeId) -> Result<()> {
        let node = self.node(target)?;
        match (node.op, node.handle) {
            (Op::SysVar, Some(handle)) => {
                debug!(id = node.id.as_deref(), ?handle, "writing back");
                store.set(handle, &node.value)
            }
            _ => Ok(()),
        }
    }

    // ── Node access ───────────────────────────────────────────────────────────

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.arena
            .get(id)
            .ok_or_else(|| Error::invalid(format!("no node {}", id.index())))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.arena
            .get_mut(id)
            .ok_or_else(|| Error::invalid(format!("no node {}", id.index())))
    }

    /// Value of a required operand.
    fn operand(&self, id: Option<NodeId>) -> Result<Value> {
        let id = id.ok_or_else(|| Error::invalid("missing operand"))?;
        Ok(self.node(id)?.value.clone())
    }

    fn set_result(&mut self, id: NodeId, v: Value) -> Result<()> {
        self.node_mut(id)?.value = v;
        Ok(())
    }

    /// Run `f` over the result node's value, which it may reuse.
    fn with_result(&mut self, id: NodeId, f: impl FnOnce(&mut Value) -> Result<()>) -> Result<()> {
        let node = self.node_mut(id)?;
        let mut result = std::mem::take(&mut node.value);
        let outcome = f(&mut result);
        node.value = result;
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
