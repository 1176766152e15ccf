//! String buffer subsystem.
//!
//! String values live in [`StrBuf`]s behind a shared [`StrRef`] handle.  A
//! buffer is allocated lazily, sized to `max(32, len + 1)` bytes (room for the
//! NUL terminator the store side expects), and only ever grows: shrinking the
//! content never gives capacity back.
//!
//! Assignment and in-place append leave the result node holding a clone of
//! the target variable's `StrRef`, so both see the same bytes without either
//! owning a private copy.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Smallest buffer ever allocated for a string value.
pub const MIN_CAPACITY: usize = 32;

/// Buffer size used when formatting a number into a string.
pub const FORMAT_CAPACITY: usize = 64;

/// Capacity needed to hold `len` content bytes plus the terminator.
pub fn buffer_size(len: usize) -> usize {
    if len < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        len + 1
    }
}

// ── StrBuf ────────────────────────────────────────────────────────────────────

/// Byte content plus the capacity reserved for it.
///
/// `capacity` counts the terminator, so `capacity >= len + 1` always holds
/// once a buffer has been allocated.
#[derive(Debug, Default)]
pub struct StrBuf {
    bytes: Vec<u8>,
    capacity: usize,
}

impl StrBuf {
    fn exact(bytes: &[u8]) -> Self {
        StrBuf {
            bytes: bytes.to_vec(),
            capacity: bytes.len() + 1,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Make room for `len` content bytes; reallocates only when the current
    /// capacity is insufficient.
    fn grow(&mut self, len: usize) -> Result<()> {
        if self.capacity > len {
            return Ok(());
        }
        let requested = buffer_size(len);
        self.bytes
            .try_reserve_exact(requested.saturating_sub(self.bytes.len()))
            .map_err(|_| Error::Allocation { requested })?;
        self.capacity = requested;
        Ok(())
    }

    fn set(&mut self, src: &[u8]) -> Result<()> {
        self.grow(src.len())?;
        self.bytes.clear();
        self.bytes.extend_from_slice(src);
        Ok(())
    }

    fn push(&mut self, src: &[u8]) -> Result<()> {
        self.grow(self.bytes.len() + src.len())?;
        self.bytes.extend_from_slice(src);
        Ok(())
    }

    /// Keep at most `capacity - 1` bytes, the way a bounded `snprintf` would.
    fn truncate_to_capacity(&mut self) {
        let max = self.capacity.saturating_sub(1);
        self.bytes.truncate(max);
    }
}

// ── StrRef ────────────────────────────────────────────────────────────────────

/// Shared handle to a string buffer.
///
/// Cloning a `StrRef` aliases the buffer; use [`StrRef::new`] to copy bytes
/// into a fresh one.
#[derive(Clone, Default)]
pub struct StrRef(Rc<RefCell<StrBuf>>);

impl StrRef {
    /// A buffer holding exactly `bytes` (capacity `len + 1`).
    pub fn new(bytes: &[u8]) -> Self {
        StrRef(Rc::new(RefCell::new(StrBuf::exact(bytes))))
    }

    /// Allocate an empty buffer large enough for `len` bytes.
    pub fn allocate(len: usize) -> Result<Self> {
        let mut buf = StrBuf::default();
        buf.grow(len)?;
        Ok(StrRef(Rc::new(RefCell::new(buf))))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.0.borrow().capacity()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.borrow().as_bytes().to_vec()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.0.borrow().as_bytes()).into_owned()
    }

    /// Run `f` over the current content.
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.0.borrow().as_bytes())
    }

    /// Whether two handles alias the same buffer.
    pub fn ptr_eq(a: &StrRef, b: &StrRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    fn set(&self, src: &[u8]) -> Result<()> {
        self.0.borrow_mut().set(src)
    }

    fn push(&self, src: &[u8]) -> Result<()> {
        self.0.borrow_mut().push(src)
    }
}

impl fmt::Debug for StrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buf = self.0.borrow();
        f.debug_struct("StrRef")
            .field("content", &String::from_utf8_lossy(buf.as_bytes()))
            .field("capacity", &buf.capacity())
            .finish()
    }
}

// ── Slot operations ───────────────────────────────────────────────────────────
//
// A slot is the `Option<StrRef>` carried by a string `Value`; `None` is the
// null string a declared-but-never-assigned variable starts with.

/// Ensure the slot holds a buffer with room for `len` bytes, allocating on
/// first use.
pub fn reserve(slot: &mut Option<StrRef>, len: usize) -> Result<StrRef> {
    match slot {
        Some(s) => {
            s.0.borrow_mut().grow(len)?;
            Ok(s.clone())
        }
        None => {
            let s = StrRef::allocate(len)?;
            *slot = Some(s.clone());
            Ok(s)
        }
    }
}

/// Copy `src` into the slot's buffer, growing it as needed.
///
/// Returns the (possibly new) buffer so the caller can share it with the
/// result node.
pub fn assign(slot: &mut Option<StrRef>, src: &[u8]) -> Result<StrRef> {
    let s = reserve(slot, src.len())?;
    s.set(src)?;
    Ok(s)
}

/// Append `src` to the slot's existing content in place.
pub fn append(slot: &Option<StrRef>, src: &[u8]) -> Result<StrRef> {
    let Some(s) = slot else {
        return Err(Error::unsupported("append to a null string"));
    };
    s.push(src)?;
    Ok(s.clone())
}

/// Write `a + b` into the slot's buffer.
///
/// Null sources are unsupported here, unlike comparison where null reads as
/// empty.
pub fn concat(slot: &mut Option<StrRef>, a: Option<&StrRef>, b: Option<&StrRef>) -> Result<StrRef> {
    let (Some(a), Some(b)) = (a, b) else {
        return Err(Error::unsupported("concatenation of a null string"));
    };
    // Copy first: either source may alias the destination.
    let mut joined = a.to_vec();
    b.with(|bytes| joined.extend_from_slice(bytes));
    assign(slot, &joined)
}

/// Write formatted text into the slot, bounded by a [`FORMAT_CAPACITY`]
/// buffer.
pub fn format_into(slot: &mut Option<StrRef>, text: &[u8]) -> Result<StrRef> {
    let s = reserve(slot, FORMAT_CAPACITY)?;
    {
        let mut buf = s.0.borrow_mut();
        buf.bytes.clear();
        buf.bytes.extend_from_slice(text);
        buf.truncate_to_capacity();
    }
    Ok(s)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
