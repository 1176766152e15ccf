//! Expression nodes, statements, and the arena that owns them.
//!
//! A compiled action is a tree of [`Node`]s addressed by [`NodeId`], plus
//! statement lists ([`Block`]s) addressed by [`BlockId`].  Identifier nodes
//! are shared: every reference to `x` inside one compilation unit points at
//! the same `NodeId`, so a node may appear at several tree positions.  The
//! symbol lists in [`crate::symbols`] index the same arena without adding
//! any link to the node itself.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::store::VarHandle;
use crate::value::{VarType, Value};

// ── Ids ───────────────────────────────────────────────────────────────────────

/// Index of a [`Node`] in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a [`Block`] in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Op ────────────────────────────────────────────────────────────────────────

/// Operation carried by a node.
///
/// Leaf ops (`Num`, `FloatNum`, `Str`, `LocalVar`, `Timer`) evaluate to
/// nothing; `SysVar` reads the external store; `If` is handled by the tree
/// evaluator itself and `Else` only ever appears as the right child of an
/// `If`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Illegal,
    Assign,
    Mul,
    Div,
    Add,
    Sub,
    BitAnd,
    BitOr,
    BitXor,
    Inc,
    Dec,
    Shl,
    Shr,
    And,
    Or,
    Not,
    Equals,
    NotEquals,
    Gt,
    Lt,
    Gte,
    Lte,
    AndEquals,
    OrEquals,
    XorEquals,
    DivEquals,
    TimesEquals,
    PlusEquals,
    MinusEquals,
    SysVar,
    ToFloat,
    ToInt,
    ToShort,
    ToString,
    Num,
    FloatNum,
    LocalVar,
    Str,
    If,
    Else {
        then_block: Option<BlockId>,
        else_block: Option<BlockId>,
    },
    CreateTick,
    CreateTimer,
    DeleteTimer,
    ActiveTimer,
    Timer,
}

impl Op {
    /// Symbolic name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Op::Illegal => "Illegal",
            Op::Assign => "Assign",
            Op::Mul => "Mul",
            Op::Div => "Div",
            Op::Add => "Add",
            Op::Sub => "Sub",
            Op::BitAnd => "Band",
            Op::BitOr => "Bor",
            Op::BitXor => "Xor",
            Op::Inc => "Inc",
            Op::Dec => "Dec",
            Op::Shl => "LShift",
            Op::Shr => "RShift",
            Op::And => "And",
            Op::Or => "Or",
            Op::Not => "Not",
            Op::Equals => "Equals",
            Op::NotEquals => "NotEquals",
            Op::Gt => "Gt",
            Op::Lt => "Lt",
            Op::Gte => "Gte",
            Op::Lte => "Lte",
            Op::AndEquals => "AndEquals",
            Op::OrEquals => "OrEquals",
            Op::XorEquals => "XorEquals",
            Op::DivEquals => "DivEquals",
            Op::TimesEquals => "TimesEquals",
            Op::PlusEquals => "PlusEquals",
            Op::MinusEquals => "MinusEquals",
            Op::SysVar => "Sysvar",
            Op::ToFloat => "ToFloat",
            Op::ToInt => "ToInt",
            Op::ToShort => "ToShort",
            Op::ToString => "ToString",
            Op::Num => "Num",
            Op::FloatNum => "FloatNum",
            Op::LocalVar => "LocalVar",
            Op::Str => "String",
            Op::If => "If",
            Op::Else { .. } => "Else",
            Op::CreateTick => "CreateTick",
            Op::CreateTimer => "CreateTimer",
            Op::DeleteTimer => "DeleteTimer",
            Op::ActiveTimer => "ActiveTimer",
            Op::Timer => "Timer",
        }
    }

    /// Type of the value a freshly built node of this op starts with, when
    /// it does not depend on the operands.
    fn fixed_type(self) -> Option<VarType> {
        match self {
            Op::Str | Op::ToString => Some(VarType::Str),
            Op::ToFloat => Some(VarType::Float),
            Op::ToInt => Some(VarType::U32),
            Op::ToShort
            | Op::If
            | Op::Else { .. }
            | Op::Equals
            | Op::NotEquals
            | Op::Gt
            | Op::Lt
            | Op::Gte
            | Op::Lte
            | Op::And
            | Op::Or
            | Op::Not
            | Op::CreateTick
            | Op::CreateTimer
            | Op::DeleteTimer
            | Op::ActiveTimer => Some(VarType::U16),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type specifier of a local declaration (`int x`, `short y`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSpec {
    Int,
    Short,
    Float,
    String,
}

impl From<TypeSpec> for VarType {
    fn from(t: TypeSpec) -> Self {
        match t {
            TypeSpec::Int => VarType::U32,
            TypeSpec::Short => VarType::U16,
            TypeSpec::Float => VarType::Float,
            TypeSpec::String => VarType::Str,
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// Per-node flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Declared in the current action; never touches the external store.
    pub local: bool,
    /// Has been assigned a value (used for use-before-assign checks).
    pub assigned: bool,
    /// Assignment destination: the store pre-read is skipped.
    pub lvalue: bool,
    /// A recompute notification has been requested from the store.
    pub calc_notification: bool,
    /// A change notification has been requested from the store.
    pub modified_notification: bool,
}

/// One expression tree node.
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub lineno: u32,
    /// Identifier, for variable nodes.
    pub id: Option<String>,
    pub flags: NodeFlags,
    /// External store binding, for `SysVar` nodes.
    pub handle: Option<VarHandle>,
    pub value: Value,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl Node {
    pub fn new(op: Op, value: Value) -> Self {
        Node {
            op,
            lineno: 0,
            id: None,
            flags: NodeFlags::default(),
            handle: None,
            value,
            left: None,
            right: None,
        }
    }

    /// Whether writes to this node must be propagated to the store.
    pub fn is_store_bound(&self) -> bool {
        self.op == Op::SysVar && self.handle.is_some()
    }
}

// ── Statements ────────────────────────────────────────────────────────────────

/// What a statement does.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Evaluate an expression tree (and apply its assignments).
    Expr(NodeId),
    /// Hand a command line to the script runner.
    Script(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StmtKind,
    pub lineno: u32,
}

impl Statement {
    pub fn expr(node: NodeId) -> Self {
        Statement { kind: StmtKind::Expr(node), lineno: 0 }
    }

    pub fn script(cmd: impl Into<String>) -> Self {
        Statement { kind: StmtKind::Script(cmd.into()), lineno: 0 }
    }

    pub fn at_line(mut self, lineno: u32) -> Self {
        self.lineno = lineno;
        self
    }
}

/// An ordered statement list (compound statement).
pub type Block = Vec<Statement>;

// ── Arena ─────────────────────────────────────────────────────────────────────

/// Owner of every node and block built for an evaluation context.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    blocks: Vec<Block>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn add_block(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Result type of a binary/unary node built over `left` and `right`:
    /// the shared operand type, or `None` when they disagree or both are
    /// absent.
    pub fn type_check(&self, left: Option<NodeId>, right: Option<NodeId>) -> Option<VarType> {
        let ty = |id: NodeId| self.get(id).map(|n| n.value.var_type());
        match (left, right) {
            (Some(l), Some(r)) => {
                let (lt, rt) = (ty(l)?, ty(r)?);
                (lt == rt).then_some(lt)
            }
            (Some(l), None) => ty(l),
            (None, Some(r)) => ty(r),
            (None, None) => None,
        }
    }

    // ── Builders ──────────────────────────────────────────────────────────────

    /// Build an operator node over `left` and `right`.
    ///
    /// The node's initial value type is fixed by the op where possible, and
    /// otherwise follows [`Arena::type_check`] (uint16 when the operands
    /// disagree).
    pub fn create_variable(&mut self, op: Op, left: Option<NodeId>, right: Option<NodeId>) -> NodeId {
        let ty = op
            .fixed_type()
            .or_else(|| self.type_check(left, right))
            .unwrap_or(VarType::U16);
        let mut node = Node::new(op, ty.zero());
        node.left = left;
        node.right = right;
        self.push(node)
    }

    /// Build an integer constant from its source text.
    ///
    /// Accepts decimal or `0x` hex.  A trailing `U` asks for uint16 and `L`
    /// for uint32; values outside `-32768..=65535` are always uint32, wrapping
    /// modulo 2^32.
    pub fn new_number(&mut self, text: &str) -> NodeId {
        let bytes = text.as_bytes();
        let radix = if bytes.starts_with(b"0x") || bytes.starts_with(b"0X") { 16 } else { 10 };
        let requested = match bytes.last().map(u8::to_ascii_uppercase) {
            Some(b'U') if radix == 10 => Some(VarType::U16),
            Some(b'L') => Some(VarType::U32),
            _ => None,
        };
        let n = crate::cast::parse_leading_int(bytes, radix);
        let ty = if !(-32768..=65535).contains(&n) {
            VarType::U32
        } else {
            requested.unwrap_or(VarType::U16)
        };
        let value = match ty {
            VarType::U16 => Value::U16(n as u16),
            _ => Value::U32(n as u32),
        };
        self.push(Node::new(Op::Num, value))
    }

    /// Build a float constant from its source text.
    pub fn new_float(&mut self, text: &str) -> NodeId {
        let x = crate::cast::parse_leading_float(text.as_bytes()) as f32;
        self.push(Node::new(Op::FloatNum, Value::Float(x)))
    }

    /// Build a string constant.
    pub fn new_string(&mut self, text: &str) -> NodeId {
        self.push(Node::new(Op::Str, Value::string(text)))
    }

    /// Build the `ELSE` wrapper an `IF` node expects as its right child.
    pub fn new_else(&mut self, then_block: Option<BlockId>, else_block: Option<BlockId>) -> NodeId {
        self.push(Node::new(Op::Else { then_block, else_block }, Value::U16(0)))
    }

    /// Build `IF (cond) { then } [ELSE { otherwise }]`.
    pub fn new_if(&mut self, cond: NodeId, then_block: Block, else_block: Option<Block>) -> NodeId {
        let then_id = self.add_block(then_block);
        let else_id = else_block.map(|b| self.add_block(b));
        let wrapper = self.new_else(Some(then_id), else_id);
        self.create_variable(Op::If, Some(cond), Some(wrapper))
    }

    /// Give a declared identifier its type (`int x;`).
    pub fn declare(&mut self, spec: TypeSpec, id: NodeId) -> Option<NodeId> {
        let node = self.get_mut(id)?;
        node.value = VarType::from(spec).zero();
        Some(id)
    }

    /// Mark a node as an assignment destination.
    pub fn mark_lvalue(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.flags.lvalue = true;
        }
    }

    /// True when `id` is a local variable read before anything assigned it.
    pub fn check_use_before_assign(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| n.flags.local && !n.flags.assigned)
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
