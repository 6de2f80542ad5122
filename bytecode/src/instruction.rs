use core::fmt;

use crate::op::Op;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PushLiteral {
        index: u32,
    },
    PushInstanceVariable {
        index: u32,
    },
    PushTemporaryVariable {
        index: u32,
    },
    PushSelf,
    StoreInstanceVariable {
        index: u32,
    },
    StoreTemporaryVariable {
        index: u32,
    },
    SendMessage {
        selector: u32,
        argc: u32,
    },
    ReturnStackTop,
    Jump {
        target: u32,
    },
    JumpIfTrue {
        target: u32,
    },
    JumpIfFalse {
        target: u32,
    },
    Pop,
    Duplicate,
    CreateBlock {
        byte_len: u32,
        literal_count: u32,
        temp_count: u32,
    },
    ExecuteBlock {
        argc: u32,
    },
}

impl Instruction {
    pub const fn op(&self) -> Op {
        match self {
            Self::PushLiteral { .. } => Op::PushLiteral,
            Self::PushInstanceVariable { .. } => Op::PushInstanceVariable,
            Self::PushTemporaryVariable { .. } => Op::PushTemporaryVariable,
            Self::PushSelf => Op::PushSelf,
            Self::StoreInstanceVariable { .. } => Op::StoreInstanceVariable,
            Self::StoreTemporaryVariable { .. } => Op::StoreTemporaryVariable,
            Self::SendMessage { .. } => Op::SendMessage,
            Self::ReturnStackTop => Op::ReturnStackTop,
            Self::Jump { .. } => Op::Jump,
            Self::JumpIfTrue { .. } => Op::JumpIfTrue,
            Self::JumpIfFalse { .. } => Op::JumpIfFalse,
            Self::Pop => Op::Pop,
            Self::Duplicate => Op::Duplicate,
            Self::CreateBlock { .. } => Op::CreateBlock,
            Self::ExecuteBlock { .. } => Op::ExecuteBlock,
        }
    }

    /// Encoded size in bytes. For `CreateBlock` the inline body is not
    /// included.
    pub const fn size(&self) -> usize {
        self.op().instruction_size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.op().name();
        match *self {
            Self::PushLiteral { index } => write!(f, "{name} #{index}"),
            Self::PushInstanceVariable { index }
            | Self::StoreInstanceVariable { index } => write!(f, "{name} iv{index}"),
            Self::PushTemporaryVariable { index }
            | Self::StoreTemporaryVariable { index } => write!(f, "{name} t{index}"),
            Self::SendMessage { selector, argc } => {
                write!(f, "{name} #{selector} argc={argc}")
            }
            Self::Jump { target }
            | Self::JumpIfTrue { target }
            | Self::JumpIfFalse { target } => write!(f, "{name} @{target}"),
            Self::CreateBlock {
                byte_len,
                literal_count,
                temp_count,
            } => write!(
                f,
                "{name} len={byte_len} literals={literal_count} temps={temp_count}"
            ),
            Self::ExecuteBlock { argc } => write!(f, "{name} argc={argc}"),
            Self::PushSelf | Self::ReturnStackTop | Self::Pop | Self::Duplicate => {
                f.write_str(name)
            }
        }
    }
}
