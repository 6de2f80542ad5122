use object::Value;

use crate::interpreter::Dispatch;
use crate::{Vm, VmError};

pub mod array;
pub mod block;
pub mod bytearray;
pub mod class;
pub mod dictionary;
pub mod exception;
pub mod float;
pub mod integer;
pub mod string;

/// A primitive reads the receiver and arguments, then either answers a
/// value or fails with [`VmError::PrimitiveFailed`]. Failing is only allowed
/// before the primitive allocates.
pub type PrimitiveFn = fn(&mut Vm, Value, &[Value]) -> Result<Value, VmError>;

#[derive(Clone, Copy)]
pub enum PrimitiveKind {
    /// The function's result is the answer of the send.
    Value(PrimitiveFn),
    /// The function answers a fresh context, which the running interpreter
    /// activates in place of a nested run.
    Activation(PrimitiveFn),
}

#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    pub name: &'static str,
    pub arity: u8,
    pub kind: PrimitiveKind,
}

impl PrimitiveDesc {
    pub const fn new(name: &'static str, arity: u8, func: PrimitiveFn) -> Self {
        Self {
            name,
            arity,
            kind: PrimitiveKind::Value(func),
        }
    }

    pub const fn activation(name: &'static str, arity: u8, func: PrimitiveFn) -> Self {
        Self {
            name,
            arity,
            kind: PrimitiveKind::Activation(func),
        }
    }
}

impl core::fmt::Debug for PrimitiveDesc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match self.kind {
            PrimitiveKind::Value(_) => "value",
            PrimitiveKind::Activation(_) => "activation",
        };
        f.debug_struct("PrimitiveDesc")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("kind", &kind)
            .finish()
    }
}

/// Primitives indexed by the number a method names.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveTable {
    entries: Vec<Option<PrimitiveDesc>>,
}

impl PrimitiveTable {
    pub fn with_defaults() -> Self {
        let mut table = Self::default();
        for (index, desc) in default_primitives() {
            table.register(index, desc);
        }
        table
    }

    /// Install `desc` at `index`, replacing whatever was there.
    pub fn register(&mut self, index: u32, desc: PrimitiveDesc) {
        let slot = index as usize;
        if self.entries.len() <= slot {
            self.entries.resize(slot + 1, None);
        }
        self.entries[slot] = Some(desc);
    }

    pub fn get(&self, index: u32) -> Option<PrimitiveDesc> {
        self.entries.get(index as usize).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn default_primitives() -> Vec<(u32, PrimitiveDesc)> {
    vec![
        (1, PrimitiveDesc::new("integer_add", 1, integer::integer_add)),
        (2, PrimitiveDesc::new("integer_mul", 1, integer::integer_mul)),
        (3, PrimitiveDesc::new("integer_eq", 1, integer::integer_eq)),
        (4, PrimitiveDesc::new("integer_sub", 1, integer::integer_sub)),
        (5, PrimitiveDesc::new("object_class", 0, class::object_class)),
        (6, PrimitiveDesc::new("integer_lt", 1, integer::integer_lt)),
        (7, PrimitiveDesc::new("integer_gt", 1, integer::integer_gt)),
        (8, PrimitiveDesc::new("integer_div", 1, integer::integer_div)),
        (9, PrimitiveDesc::new("integer_mod", 1, integer::integer_mod)),
        (10, PrimitiveDesc::new("float_add", 1, float::float_add)),
        (11, PrimitiveDesc::new("float_sub", 1, float::float_sub)),
        (12, PrimitiveDesc::new("float_mul", 1, float::float_mul)),
        (13, PrimitiveDesc::new("float_div", 1, float::float_div)),
        (14, PrimitiveDesc::new("float_eq", 1, float::float_eq)),
        (15, PrimitiveDesc::new("float_lt", 1, float::float_lt)),
        (16, PrimitiveDesc::new("float_gt", 1, float::float_gt)),
        (17, PrimitiveDesc::new("integer_ne", 1, integer::integer_ne)),
        (18, PrimitiveDesc::new("integer_le", 1, integer::integer_le)),
        (19, PrimitiveDesc::new("integer_ge", 1, integer::integer_ge)),
        (20, PrimitiveDesc::new("block_new", 0, block::block_new)),
        (21, PrimitiveDesc::activation("block_value", 0, block::block_value)),
        (22, PrimitiveDesc::activation("block_value_1", 1, block::block_value)),
        (23, PrimitiveDesc::activation("block_value_2", 2, block::block_value)),
        (24, PrimitiveDesc::new("block_num_args", 0, block::block_num_args)),
        (25, PrimitiveDesc::new("block_on_do", 2, block::block_on_do)),
        (26, PrimitiveDesc::activation("block_value_with_arguments", 1, block::block_value_with_arguments)),
        (30, PrimitiveDesc::new("string_concat", 1, string::string_concat)),
        (31, PrimitiveDesc::new("string_size", 0, string::string_size)),
        (32, PrimitiveDesc::new("string_at", 1, string::string_at)),
        (33, PrimitiveDesc::new("string_as_symbol", 0, string::string_as_symbol)),
        (40, PrimitiveDesc::new("array_at", 1, array::array_at)),
        (41, PrimitiveDesc::new("array_at_put", 2, array::array_at_put)),
        (42, PrimitiveDesc::new("array_size", 0, array::array_size)),
        (50, PrimitiveDesc::new("bytearray_at", 1, bytearray::bytearray_at)),
        (51, PrimitiveDesc::new("bytearray_at_put", 2, bytearray::bytearray_at_put)),
        (52, PrimitiveDesc::new("bytearray_size", 0, bytearray::bytearray_size)),
        (60, PrimitiveDesc::new("exception_signal", 0, exception::exception_signal)),
        (61, PrimitiveDesc::new("exception_signal_with", 1, exception::exception_signal_with)),
        (62, PrimitiveDesc::new("exception_message_text", 0, exception::exception_message_text)),
        (63, PrimitiveDesc::new("exception_set_message_text", 1, exception::exception_set_message_text)),
        (70, PrimitiveDesc::new("class_new", 0, class::class_new)),
        (71, PrimitiveDesc::new("class_new_sized", 1, class::class_new_sized)),
        (72, PrimitiveDesc::new("object_identical", 1, class::object_identical)),
        (73, PrimitiveDesc::new("class_name", 0, class::class_name)),
        (74, PrimitiveDesc::new("class_superclass", 0, class::class_superclass)),
        (75, PrimitiveDesc::new("object_identity_hash", 0, class::object_identity_hash)),
        (80, PrimitiveDesc::new("dictionary_at", 1, dictionary::dictionary_at)),
        (81, PrimitiveDesc::new("dictionary_at_put", 2, dictionary::dictionary_at_put)),
        (82, PrimitiveDesc::new("dictionary_includes_key", 1, dictionary::dictionary_includes_key)),
        (83, PrimitiveDesc::new("dictionary_size", 0, dictionary::dictionary_size)),
        (84, PrimitiveDesc::new("dictionary_keys", 0, dictionary::dictionary_keys)),
    ]
}

impl Vm {
    /// Run the primitive `method` names on `receiver` with `args`.
    ///
    /// `PrimitiveFailed` means the primitive declined; the caller decides
    /// whether fallback code runs. Activation primitives run their context
    /// to completion here.
    pub fn execute_primitive(
        &mut self,
        receiver: Value,
        selector: Value,
        args: &[Value],
        method: Value,
    ) -> Result<Value, VmError> {
        match self.invoke_primitive(receiver, selector, args, method)? {
            Dispatch::Returned(value) => Ok(value),
            Dispatch::Activate(context) => self.execute(context),
        }
    }

    /// Like [`execute_primitive`](Vm::execute_primitive), but activation
    /// primitives hand back their context unlinked.
    pub(crate) fn invoke_primitive(
        &mut self,
        receiver: Value,
        selector: Value,
        args: &[Value],
        method: Value,
    ) -> Result<Dispatch, VmError> {
        let Some(index) = self.heap.method(method)?.primitive else {
            return Err(VmError::TypeError {
                expected: "primitive method",
                got: method,
            });
        };
        let desc = self
            .primitives
            .get(index)
            .ok_or(VmError::UnknownPrimitive(index))?;
        if desc.arity as usize != args.len() {
            return Err(VmError::PrimitiveFailed);
        }
        log::trace!("primitive {index} ({}) for {selector:?}", desc.name);
        match desc.kind {
            PrimitiveKind::Value(func) => func(self, receiver, args).map(Dispatch::Returned),
            PrimitiveKind::Activation(func) => func(self, receiver, args).map(Dispatch::Activate),
        }
    }
}

// ── Argument helpers ───────────────────────────────────────────────

pub(crate) fn expect_integer(value: Value) -> Result<i64, VmError> {
    value.as_integer().map_err(|_| VmError::PrimitiveFailed)
}

/// Integer results outside the small integer range fail the primitive.
pub(crate) fn integer_result(n: Option<i64>) -> Result<Value, VmError> {
    n.and_then(|n| Value::from_integer(n).ok())
        .ok_or(VmError::PrimitiveFailed)
}

/// Zero-based position for a one-based `index`. Out of range is fatal.
pub(crate) fn checked_index(index: Value, size: usize, kind: &'static str) -> Result<usize, VmError> {
    let index = expect_integer(index)?;
    if index < 1 || index as u64 > size as u64 {
        return Err(VmError::IndexOutOfBounds { kind, index, size });
    }
    Ok(index as usize - 1)
}

pub(crate) fn arg(args: &[Value], n: usize) -> Result<Value, VmError> {
    args.get(n).copied().ok_or(VmError::PrimitiveFailed)
}
