use bitflags::bitflags;

use crate::value::{ObjectRef, Value};

/// Heap object kind, mirroring the [`Body`](crate::Body) variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    String = 0,
    Symbol,
    Array,
    ByteArray,
    Dictionary,
    Class,
    Method,
    Block,
    Exception,
    Instance,
    Context,
}

impl ObjectKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Symbol => "Symbol",
            Self::Array => "Array",
            Self::ByteArray => "ByteArray",
            Self::Dictionary => "Dictionary",
            Self::Class => "Class",
            Self::Method => "Method",
            Self::Block => "Block",
            Self::Exception => "Exception",
            Self::Instance => "Instance",
            Self::Context => "Context",
        }
    }
}

bitflags! {
    /// GC bookkeeping flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeaderFlags: u8 {
        /// Copied to to-space during the running collection.
        const MOVED = 1 << 0;
    }
}

/// Header shared by every heap object.
///
/// ```text
/// word 0: class reference
/// word 1: flags | identity hash | forwarding reference (only set mid-collection)
/// ```
///
/// The identity hash is assigned by the heap on allocation and survives
/// collections, so it stays stable while the object moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub class: Value,
    flags: HeaderFlags,
    hash: u32,
    forward: Option<ObjectRef>,
}

impl Header {
    pub const WORDS: usize = 2;

    pub const fn new(class: Value) -> Self {
        Self {
            class,
            flags: HeaderFlags::empty(),
            hash: 0,
            forward: None,
        }
    }

    #[inline(always)]
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    #[inline(always)]
    pub fn is_moved(&self) -> bool {
        self.flags.contains(HeaderFlags::MOVED)
    }

    /// Zero until the heap assigns one.
    #[inline(always)]
    pub fn identity_hash(&self) -> u32 {
        self.hash
    }

    pub fn set_identity_hash(&mut self, hash: u32) {
        self.hash = hash;
    }

    #[inline(always)]
    pub fn forward(&self) -> Option<ObjectRef> {
        self.forward
    }

    /// Record that this object now lives at `to`.
    pub fn set_forward(&mut self, to: ObjectRef) {
        self.flags.insert(HeaderFlags::MOVED);
        self.forward = Some(to);
    }

    /// Drop any bookkeeping left from a collection.
    pub fn reset_gc(&mut self) {
        self.flags.remove(HeaderFlags::MOVED);
        self.forward = None;
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(Value::NIL)
    }
}
