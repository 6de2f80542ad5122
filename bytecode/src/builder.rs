use crate::op::Op;

/// A forward jump whose target has not yet been resolved.
///
/// Created by [`BytecodeBuilder::jump`], [`BytecodeBuilder::jump_if_true`],
/// and [`BytecodeBuilder::jump_if_false`]. Resolve it with
/// [`BytecodeBuilder::bind`].
#[derive(Debug)]
#[must_use = "an unbound label leaves a jump to offset 0"]
pub struct Label {
    /// Position of the u32 target bytes in the buffer.
    operand_pos: usize,
}

/// A `CreateBlock` whose body length is patched by
/// [`BytecodeBuilder::end_block`].
#[derive(Debug)]
#[must_use = "an unfinished block has a zero-length body"]
pub struct BlockLabel {
    operand_pos: usize,
    body_start: usize,
}

/// Builds a bytecode byte sequence.
///
/// Offsets are relative to the innermost open block body, since a block's
/// code is cut out of its creator when the block is materialized.
pub struct BytecodeBuilder {
    buf: Vec<u8>,
    block_starts: Vec<usize>,
}

impl Default for BytecodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            block_starts: Vec::new(),
        }
    }

    /// Current byte offset in the code unit being emitted.
    pub fn current_offset(&self) -> usize {
        self.buf.len() - self.block_starts.last().copied().unwrap_or(0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn emit_op(&mut self, op: Op) {
        self.buf.push(op as u8);
    }

    fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
    }

    fn emit_with(&mut self, op: Op, operand: u32) {
        self.emit_op(op);
        self.emit_u32(operand);
    }

    pub fn push_literal(&mut self, index: u32) {
        self.emit_with(Op::PushLiteral, index);
    }

    pub fn push_instance_variable(&mut self, index: u32) {
        self.emit_with(Op::PushInstanceVariable, index);
    }

    pub fn push_temporary_variable(&mut self, index: u32) {
        self.emit_with(Op::PushTemporaryVariable, index);
    }

    pub fn push_self(&mut self) {
        self.emit_op(Op::PushSelf);
    }

    pub fn store_instance_variable(&mut self, index: u32) {
        self.emit_with(Op::StoreInstanceVariable, index);
    }

    pub fn store_temporary_variable(&mut self, index: u32) {
        self.emit_with(Op::StoreTemporaryVariable, index);
    }

    /// `SendMessage <selector:u32> <argc:u32>`; `selector` indexes the
    /// literal table.
    pub fn send(&mut self, selector: u32, argc: u32) {
        self.emit_op(Op::SendMessage);
        self.emit_u32(selector);
        self.emit_u32(argc);
    }

    pub fn return_top(&mut self) {
        self.emit_op(Op::ReturnStackTop);
    }

    pub fn pop(&mut self) {
        self.emit_op(Op::Pop);
    }

    pub fn duplicate(&mut self) {
        self.emit_op(Op::Duplicate);
    }

    pub fn execute_block(&mut self, argc: u32) {
        self.emit_with(Op::ExecuteBlock, argc);
    }

    // ── control flow ───────────────────────────────────────────────

    fn jump_op(&mut self, op: Op) -> Label {
        self.emit_op(op);
        let operand_pos = self.buf.len();
        self.emit_u32(0);
        Label { operand_pos }
    }

    /// Forward unconditional jump, resolved by [`bind`](Self::bind).
    pub fn jump(&mut self) -> Label {
        self.jump_op(Op::Jump)
    }

    pub fn jump_if_true(&mut self) -> Label {
        self.jump_op(Op::JumpIfTrue)
    }

    pub fn jump_if_false(&mut self) -> Label {
        self.jump_op(Op::JumpIfFalse)
    }

    /// Jump to an already known offset (loops).
    pub fn jump_to(&mut self, target: usize) {
        self.emit_with(Op::Jump, target as u32);
    }

    pub fn jump_if_true_to(&mut self, target: usize) {
        self.emit_with(Op::JumpIfTrue, target as u32);
    }

    pub fn jump_if_false_to(&mut self, target: usize) {
        self.emit_with(Op::JumpIfFalse, target as u32);
    }

    /// Point a pending jump at the current offset.
    pub fn bind(&mut self, label: Label) {
        let target = self.current_offset() as u32;
        self.patch_u32(label.operand_pos, target);
    }

    // ── blocks ─────────────────────────────────────────────────────

    /// Start an inline block body. Instructions emitted until
    /// [`end_block`](Self::end_block) form the block's code.
    pub fn begin_block(&mut self, literal_count: u32, temp_count: u32) -> BlockLabel {
        self.emit_op(Op::CreateBlock);
        let operand_pos = self.buf.len();
        self.emit_u32(0);
        self.emit_u32(literal_count);
        self.emit_u32(temp_count);
        let body_start = self.buf.len();
        self.block_starts.push(body_start);
        BlockLabel {
            operand_pos,
            body_start,
        }
    }

    pub fn end_block(&mut self, label: BlockLabel) {
        debug_assert_eq!(self.block_starts.last(), Some(&label.body_start));
        self.block_starts.pop();
        let len = (self.buf.len() - label.body_start) as u32;
        self.patch_u32(label.operand_pos, len);
    }

    /// Embed an already assembled block body.
    pub fn create_block(&mut self, body: &[u8], literal_count: u32, temp_count: u32) {
        let label = self.begin_block(literal_count, temp_count);
        self.buf.extend_from_slice(body);
        self.end_block(label);
    }
}
