use heap::{Heap, HeapError};
use object::{Value, ValueKind};

use crate::{Vm, VmError};

/// The result of a method lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    /// Neither the class nor any superclass defines the selector.
    None,
    Found {
        /// Class whose method dictionary held the method (may be a
        /// superclass of the class the lookup started at).
        holder: Value,
        method: Value,
    },
}

impl LookupResult {
    pub fn method(self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Found { method, .. } => Some(method),
        }
    }
}

/// Walk `class` and its superclasses for `selector`; the first hit wins.
///
/// The walk is bounded by the number of live objects so a corrupted
/// superclass cycle cannot hang the lookup.
pub fn lookup(heap: &Heap, class: Value, selector: &str) -> Result<LookupResult, HeapError> {
    let mut current = class;
    let mut remaining = heap.object_count();
    while !current.is_nil() && remaining > 0 {
        let data = heap.class(current)?;
        if let Some(&method) = data.methods.get(selector) {
            return Ok(LookupResult::Found {
                holder: current,
                method,
            });
        }
        current = data.superclass;
        remaining -= 1;
    }
    Ok(LookupResult::None)
}

/// Whether `class` is `ancestor` or inherits from it.
pub fn inherits_from(heap: &Heap, class: Value, ancestor: Value) -> Result<bool, HeapError> {
    let mut current = class;
    let mut remaining = heap.object_count();
    while !current.is_nil() && remaining > 0 {
        if current == ancestor {
            return Ok(true);
        }
        current = heap.class(current)?.superclass;
        remaining -= 1;
    }
    Ok(false)
}

impl Vm {
    /// The class of any value, immediates included.
    pub fn class_of(&self, value: Value) -> Result<Value, VmError> {
        let specials = &self.roots.specials;
        Ok(match value.kind() {
            ValueKind::Nil => specials.undefined_object,
            ValueKind::True => specials.true_class,
            ValueKind::False => specials.false_class,
            ValueKind::Integer => specials.integer,
            ValueKind::Float => specials.float,
            ValueKind::Reference => self.heap.get(value)?.class(),
        })
    }

    /// Method for `selector` in `class` or its superclass chain.
    pub fn lookup(&self, class: Value, selector: &str) -> Result<Option<Value>, VmError> {
        Ok(lookup(&self.heap, class, selector)?.method())
    }

    pub fn is_kind_of(&self, value: Value, ancestor: Value) -> Result<bool, VmError> {
        let class = self.class_of(value)?;
        Ok(inherits_from(&self.heap, class, ancestor)?)
    }

    /// Name of a class object.
    pub fn class_name(&self, class: Value) -> Result<&str, VmError> {
        Ok(&self.heap.class(class)?.name)
    }
}
