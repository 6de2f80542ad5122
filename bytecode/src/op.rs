/// Bytecode opcodes.
///
/// Every opcode is one byte. Operands are unsigned 32-bit big-endian words
/// that follow the opcode directly. Jump operands are absolute byte
/// offsets into the same code object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    /// Push a literal table entry.
    /// Operands: `index:u32`
    PushLiteral = 0,

    /// Push an instance variable of the receiver.
    /// Operands: `index:u32`
    PushInstanceVariable,

    /// Push a temporary (arguments first, then locals). Indices past the
    /// current activation continue into the lexically enclosing one.
    /// Operands: `index:u32`
    PushTemporaryVariable,

    /// Push the receiver.
    PushSelf,

    /// Pop the stack top into an instance variable of the receiver.
    /// Operands: `index:u32`
    StoreInstanceVariable,

    /// Pop the stack top into a temporary.
    /// Operands: `index:u32`
    StoreTemporaryVariable,

    /// Pop `argc` arguments and the receiver, then send the selector.
    /// Operands: `selector:u32` (literal index), `argc:u32`
    SendMessage,

    /// Return the stack top. From a block this returns from the home method.
    ReturnStackTop,

    /// Unconditional jump.
    /// Operands: `target:u32`
    Jump,

    /// Pop; jump if the value is `true`.
    /// Operands: `target:u32`
    JumpIfTrue,

    /// Pop; jump if the value is `false`.
    /// Operands: `target:u32`
    JumpIfFalse,

    /// Drop the stack top.
    Pop,

    /// Push a copy of the stack top.
    Duplicate,

    /// Create a block closing over the active context. The block body
    /// (`byte_len` bytes) follows inline and is skipped by the creator.
    /// Operands: `byte_len:u32`, `literal_count:u32`, `temp_count:u32`
    ///
    /// `temp_count` is the block's parameter count; inline blocks carry no
    /// temps of their own. Locals a block needs live in the enclosing
    /// method and are reached through temp indices past the parameters.
    CreateBlock,

    /// Pop `argc` arguments and a block, then run the block.
    /// Operands: `argc:u32`
    ExecuteBlock,
}

impl Op {
    pub const COUNT: usize = Op::ExecuteBlock as usize + 1;

    /// Number of `u32` operands following the opcode.
    pub const fn operand_count(self) -> usize {
        match self {
            Op::PushSelf | Op::ReturnStackTop | Op::Pop | Op::Duplicate => 0,
            Op::SendMessage => 2,
            Op::CreateBlock => 3,
            _ => 1,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub const fn instruction_size(self) -> usize {
        1 + 4 * self.operand_count()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Op::PushLiteral => "PUSH_LITERAL",
            Op::PushInstanceVariable => "PUSH_INSTANCE_VARIABLE",
            Op::PushTemporaryVariable => "PUSH_TEMPORARY_VARIABLE",
            Op::PushSelf => "PUSH_SELF",
            Op::StoreInstanceVariable => "STORE_INSTANCE_VARIABLE",
            Op::StoreTemporaryVariable => "STORE_TEMPORARY_VARIABLE",
            Op::SendMessage => "SEND_MESSAGE",
            Op::ReturnStackTop => "RETURN_STACK_TOP",
            Op::Jump => "JUMP",
            Op::JumpIfTrue => "JUMP_IF_TRUE",
            Op::JumpIfFalse => "JUMP_IF_FALSE",
            Op::Pop => "POP",
            Op::Duplicate => "DUPLICATE",
            Op::CreateBlock => "CREATE_BLOCK",
            Op::ExecuteBlock => "EXECUTE_BLOCK",
        }
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        if byte < Self::COUNT as u8 {
            // SAFETY: Op is repr(u8) with contiguous variants starting at 0.
            Ok(unsafe { core::mem::transmute::<u8, Op>(byte) })
        } else {
            Err(byte)
        }
    }
}
