use core::fmt::Write;

use thiserror::Error;

use crate::instruction::Instruction;
use crate::op::Op;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("truncated {} at offset {offset}", .op.name())]
    Truncated { op: Op, offset: usize },
    #[error("no instruction at offset {offset}")]
    EndOfCode { offset: usize },
    #[error("block body at offset {offset} runs past the end of the code")]
    BlockOverrun { offset: usize },
}

/// Decode the instruction starting at `offset`.
pub fn decode_at(bytes: &[u8], offset: usize) -> Result<Instruction, DecodeError> {
    let Some(&byte) = bytes.get(offset) else {
        return Err(DecodeError::EndOfCode { offset });
    };
    let op = Op::try_from(byte).map_err(|opcode| DecodeError::UnknownOpcode { opcode, offset })?;
    if offset + op.instruction_size() > bytes.len() {
        return Err(DecodeError::Truncated { op, offset });
    }

    let operand = |n: usize| {
        let at = offset + 1 + 4 * n;
        u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    };

    Ok(match op {
        Op::PushLiteral => Instruction::PushLiteral { index: operand(0) },
        Op::PushInstanceVariable => Instruction::PushInstanceVariable { index: operand(0) },
        Op::PushTemporaryVariable => Instruction::PushTemporaryVariable { index: operand(0) },
        Op::PushSelf => Instruction::PushSelf,
        Op::StoreInstanceVariable => Instruction::StoreInstanceVariable { index: operand(0) },
        Op::StoreTemporaryVariable => {
            Instruction::StoreTemporaryVariable { index: operand(0) }
        }
        Op::SendMessage => Instruction::SendMessage {
            selector: operand(0),
            argc: operand(1),
        },
        Op::ReturnStackTop => Instruction::ReturnStackTop,
        Op::Jump => Instruction::Jump { target: operand(0) },
        Op::JumpIfTrue => Instruction::JumpIfTrue { target: operand(0) },
        Op::JumpIfFalse => Instruction::JumpIfFalse { target: operand(0) },
        Op::Pop => Instruction::Pop,
        Op::Duplicate => Instruction::Duplicate,
        Op::CreateBlock => Instruction::CreateBlock {
            byte_len: operand(0),
            literal_count: operand(1),
            temp_count: operand(2),
        },
        Op::ExecuteBlock => Instruction::ExecuteBlock { argc: operand(0) },
    })
}

/// Decodes a bytecode byte slice into [`Instruction`]s, one after another.
///
/// Inline block bodies are decoded in place like any other instruction.
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset in the stream.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Whether the decoder has reached the end of the bytecode.
    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `None` at end-of-stream.
    pub fn decode_next(&mut self) -> Option<Result<Instruction, DecodeError>> {
        if self.is_at_end() {
            return None;
        }
        let result = decode_at(self.bytes, self.pos);
        match &result {
            Ok(instruction) => self.pos += instruction.size(),
            Err(_) => self.pos = self.bytes.len(),
        }
        Some(result)
    }
}

impl Iterator for BytecodeDecoder<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next()
    }
}

/// Render `bytes` one instruction per line. Block bodies are indented under
/// their `CREATE_BLOCK`, with offsets relative to the body.
pub fn disassemble(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::new();
    disassemble_into(&mut out, bytes, 0)?;
    Ok(out)
}

fn disassemble_into(out: &mut String, bytes: &[u8], depth: usize) -> Result<(), DecodeError> {
    let mut pos = 0;
    while pos < bytes.len() {
        let instruction = decode_at(bytes, pos)?;
        let _ = writeln!(out, "{:indent$}{pos:04}  {instruction}", "", indent = depth * 4);
        pos += instruction.size();

        if let Instruction::CreateBlock { byte_len, .. } = instruction {
            let end = pos + byte_len as usize;
            if end > bytes.len() {
                return Err(DecodeError::BlockOverrun { offset: pos });
            }
            disassemble_into(out, &bytes[pos..end], depth + 1)?;
            pos = end;
        }
    }
    Ok(())
}
