//! The operator family over [`Value`]s.
//!
//! Every binary operator dispatches on the left operand's type and reads the
//! right operand through the matching numeric view; operand types are
//! matched when the tree is built, not here.  Integer arithmetic wraps at
//! the operand width.

pub mod arith;
pub mod assign;
pub mod bitwise;
pub mod boolean;
pub mod compare;

use crate::error::Error;
use crate::value::Value;

fn unsupported(op: &str, v: &Value) -> Error {
    Error::unsupported(format!("{op} on {}", v.var_type()))
}
