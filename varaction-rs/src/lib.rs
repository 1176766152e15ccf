//! Evaluation core for var/action scripts.
//!
//! A front end compiles an action into an expression tree and statement
//! lists inside a [`Context`]; this crate executes them against an external
//! variable store:
//!
//! - typed values (uint16, uint32, float, string) with wrapping arithmetic,
//!   comparisons, bitwise and boolean operators, and casts
//! - shared, grow-only string buffers
//! - identifier resolution into locals and cached system variables, with
//!   write-back of assigned system variables
//! - `IF`/`ELSE` and compound statements, script statements
//! - one-shot and repeating timers with an active-timer query
//!
//! # Quick start
//!
//! ```rust
//! use varaction::{Context, MemoryStore, Op, Statement, Value};
//!
//! let mut store = MemoryStore::new();
//! store.insert("count", 5u16);
//!
//! let mut ctx = Context::default();
//! let count = ctx.new_identifier(&mut store, "count", false).unwrap();
//! let arena = ctx.arena_mut();
//! let ten = arena.new_number("10");
//! let add = arena.create_variable(Op::PlusEquals, Some(count), Some(ten));
//! let action = ctx.add_block(vec![Statement::expr(add)]);
//!
//! ctx.process_compound_statement(&mut store, action).unwrap();
//! assert_eq!(store.value("count"), Some(&Value::U16(15)));
//! ```

pub mod cast;
pub mod config;
pub mod error;
pub mod eval;
pub mod format;
pub mod ops;
pub mod runner;
pub mod scheduler;
pub mod store;
pub mod strbuf;
pub mod symbols;
pub mod timer;
pub mod tree;
pub mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use eval::Context;
pub use store::{MemoryStore, NotifyKind, VarHandle, VarStore};
pub use tree::{Arena, Block, BlockId, NodeId, Op, Statement, StmtKind, TypeSpec};
pub use value::{Value, VarType};
