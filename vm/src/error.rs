use bytecode::DecodeError;
use heap::HeapError;
use object::{Value, ValueError};
use thiserror::Error;

/// Everything that can stop the interpreter.
///
/// Most variants are fatal: they mean the heap is exhausted or compiled
/// code broke the bytecode contract. `Signal`, `NonLocalReturn` and
/// `PrimitiveFailed` are unwinding states that the VM consumes itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("invalid vm settings: {0}")]
    InvalidSettings(&'static str),
    #[error("stack overflow: context depth {depth} exceeds {limit}")]
    StackOverflow { depth: usize, limit: usize },
    #[error("operand stack overflow (capacity {capacity})")]
    OperandStackOverflow { capacity: usize },
    #[error("operand stack underflow")]
    OperandStackUnderflow,
    #[error("index {index} out of bounds for {kind} of size {size}")]
    IndexOutOfBounds {
        kind: &'static str,
        index: i64,
        size: usize,
    },
    #[error("temporary {index} is not reachable from the active context")]
    TempOutOfRange { index: u32 },
    #[error("literal {index} out of range ({count} literals)")]
    LiteralOutOfRange { index: u32, count: usize },
    #[error("selector literal {0:?} is not a symbol")]
    InvalidSelector(Value),
    #[error("jump target {target} outside code of length {len}")]
    InvalidJumpTarget { target: u32, len: usize },
    #[error("block body ({byte_len} bytes, {literal_count} literals) does not fit its creator")]
    InvalidBlock { byte_len: u32, literal_count: u32 },
    #[error("type error: expected {expected}, got {got:?}")]
    TypeError { expected: &'static str, got: Value },
    #[error("no primitive registered at index {0}")]
    UnknownPrimitive(u32),
    #[error("no active context")]
    NoActiveContext,
    #[error("unhandled {class}: {message}")]
    UnhandledException { class: String, message: String },
    #[error("primitive failed")]
    PrimitiveFailed,
    #[error("exception unwinding to handler {handler}")]
    Signal { exception: Value, handler: usize },
    #[error("non-local return")]
    NonLocalReturn { home: Value, value: Value },
}

impl VmError {
    /// Whether the error ends execution instead of being consumed by the VM.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Signal { .. } | Self::NonLocalReturn { .. } | Self::PrimitiveFailed
        )
    }
}
