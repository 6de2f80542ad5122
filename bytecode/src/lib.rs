mod op;
mod instruction;
mod builder;
mod decoder;

pub use op::Op;
pub use instruction::Instruction;
pub use builder::{BlockLabel, BytecodeBuilder, Label};
pub use decoder::{BytecodeDecoder, DecodeError, decode_at, disassemble};
