//! Runtime value type for var/action expressions.
//!
//! Every node in an expression tree carries one [`Value`].  The tag always
//! agrees with the populated payload because the two are the same enum
//! variant; operators that change a node's type replace the whole value in a
//! single assignment.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};
use crate::strbuf::StrRef;

/// Type tag of a [`Value`], as seen by type checking and declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    U16,
    U32,
    Float,
    Str,
}

impl VarType {
    /// The zero value a freshly declared variable of this type holds.
    pub fn zero(self) -> Value {
        match self {
            VarType::U16 => Value::U16(0),
            VarType::U32 => Value::U32(0),
            VarType::Float => Value::Float(0.0),
            VarType::Str => Value::Str(None),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VarType::U16 => "uint16",
            VarType::U32 => "uint32",
            VarType::Float => "float",
            VarType::Str => "string",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A var/action runtime value.
///
/// `Str(None)` is the null string: a string variable that has never had a
/// buffer allocated.
#[derive(Debug, Clone)]
pub enum Value {
    U16(u16),
    U32(u32),
    Float(f32),
    Str(Option<StrRef>),
}

impl Default for Value {
    fn default() -> Self {
        Value::U16(0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(None), Value::Str(None)) => true,
            (Value::Str(Some(a)), Value::Str(Some(b))) => {
                StrRef::ptr_eq(a, b) || a.to_vec() == b.to_vec()
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U16(n) => write!(f, "{n}"),
            Value::U32(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(Some(s)) => f.write_str(&s.to_string_lossy()),
            Value::Str(None) => Ok(()),
        }
    }
}

impl Value {
    /// A string value holding a fresh copy of `s`.
    pub fn string(s: impl AsRef<[u8]>) -> Self {
        Value::Str(Some(StrRef::new(s.as_ref())))
    }

    pub fn var_type(&self) -> VarType {
        match self {
            Value::U16(_) => VarType::U16,
            Value::U32(_) => VarType::U32,
            Value::Float(_) => VarType::Float,
            Value::Str(_) => VarType::Str,
        }
    }

    /// Content length: the byte size of numerics, the content length of
    /// strings.
    pub fn len(&self) -> usize {
        match self {
            Value::U16(_) => 2,
            Value::U32(_) => 4,
            Value::Float(_) => 4,
            Value::Str(Some(s)) => s.len(),
            Value::Str(None) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated string capacity; zero for numerics and the null string.
    pub fn capacity(&self) -> usize {
        match self {
            Value::Str(Some(s)) => s.capacity(),
            _ => 0,
        }
    }

    pub fn is_null_str(&self) -> bool {
        matches!(self, Value::Str(None))
    }

    /// Copy of the value that shares no string buffer with `self`.
    pub fn detached(&self) -> Value {
        match self {
            Value::Str(Some(s)) => Value::Str(Some(StrRef::new(&s.to_vec()))),
            other => other.clone(),
        }
    }

    // ── Numeric views ─────────────────────────────────────────────────────────
    //
    // Binary operators read their right operand through the left operand's
    // type.  Strings have no numeric view.

    pub fn as_u16(&self) -> Result<u16> {
        match self {
            Value::U16(n) => Ok(*n),
            Value::U32(n) => Ok(*n as u16),
            Value::Float(x) => Ok(*x as i32 as u16),
            Value::Str(_) => Err(Error::unsupported("string used as uint16")),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        match self {
            Value::U16(n) => Ok(u32::from(*n)),
            Value::U32(n) => Ok(*n),
            Value::Float(x) => Ok(*x as i32 as u32),
            Value::Str(_) => Err(Error::unsupported("string used as uint32")),
        }
    }

    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Value::U16(n) => Ok(f32::from(*n)),
            Value::U32(n) => Ok(*n as f32),
            Value::Float(x) => Ok(*x),
            Value::Str(_) => Err(Error::unsupported("string used as float")),
        }
    }

    /// The string payload, or an error for numerics.
    pub fn as_str_ref(&self) -> Result<Option<&StrRef>> {
        match self {
            Value::Str(s) => Ok(s.as_ref()),
            other => Err(Error::unsupported(format!(
                "{} used as string",
                other.var_type()
            ))),
        }
    }

    /// Truth of a condition: the 16-bit view is non-zero.
    ///
    /// Strings are true when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(Some(s)) => !s.is_empty(),
            Value::Str(None) => false,
            other => other.as_u16().map(|n| n != 0).unwrap_or(false),
        }
    }

    /// Byte-lexicographic ordering of two string payloads, with null
    /// reading as empty.
    pub fn cmp_str(a: Option<&StrRef>, b: Option<&StrRef>) -> Ordering {
        let a = a.map(StrRef::to_vec).unwrap_or_default();
        let b = b.map(StrRef::to_vec).unwrap_or_default();
        a.cmp(&b)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::U16(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::U32(n)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::U16(u16::from(b))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_variants() {
        assert_eq!(Value::U16(1).var_type(), VarType::U16);
        assert_eq!(Value::U32(1).var_type(), VarType::U32);
        assert_eq!(Value::Float(1.0).var_type(), VarType::Float);
        assert_eq!(Value::Str(None).var_type(), VarType::Str);
    }

    #[test]
    fn lengths() {
        assert_eq!(Value::U16(7).len(), 2);
        assert_eq!(Value::U32(7).len(), 4);
        assert_eq!(Value::string("abc").len(), 3);
        assert_eq!(Value::Str(None).len(), 0);
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Value::U32(0x1_0005).as_u16().unwrap(), 5);
        assert_eq!(Value::U16(9).as_u32().unwrap(), 9);
        assert_eq!(Value::Float(3.9).as_u32().unwrap(), 3);
        assert!(Value::string("1").as_u16().is_err());
    }

    #[test]
    fn truthiness() {
        assert!(Value::U16(1).is_truthy());
        assert!(!Value::U16(0).is_truthy());
        assert!(!Value::Str(None).is_truthy());
        assert!(Value::string("x").is_truthy());
    }

    #[test]
    fn null_string_compares_as_empty() {
        let empty = StrRef::new(b"");
        assert_eq!(Value::cmp_str(None, None), Ordering::Equal);
        assert_eq!(Value::cmp_str(None, Some(&empty)), Ordering::Equal);
        let a = StrRef::new(b"a");
        assert_eq!(Value::cmp_str(Some(&a), None), Ordering::Greater);
    }

    #[test]
    fn detached_copies_buffer() {
        let v = Value::string("abc");
        let d = v.detached();
        match (&v, &d) {
            (Value::Str(Some(a)), Value::Str(Some(b))) => assert!(!StrRef::ptr_eq(a, b)),
            _ => panic!("expected strings"),
        }
        assert_eq!(v, d);
    }

    #[test]
    fn display() {
        assert_eq!(Value::U16(42).to_string(), "42");
        assert_eq!(Value::string("hello").to_string(), "hello");
        assert_eq!(Value::Str(None).to_string(), "");
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::U16(1));
        assert_eq!(Value::from(7u32), Value::U32(7));
        assert_eq!(Value::from("hi"), Value::string("hi"));
    }
}
