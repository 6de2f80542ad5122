use object::{BlockData, Body, HeapObject, Value};

use crate::primitives::arg;
use crate::{Vm, VmError};

fn expect_block(vm: &Vm, value: Value) -> Result<usize, VmError> {
    vm.heap()
        .block(value)
        .map(|b| b.arg_count)
        .map_err(|_| VmError::PrimitiveFailed)
}

/// An empty block closed over the active context. Evaluating it answers
/// nil.
pub fn block_new(vm: &mut Vm, _receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let data = BlockData {
        bytecode: Vec::new(),
        literals: Vec::new(),
        temp_names: Vec::new(),
        arg_count: 0,
        outer_context: vm.active_context(),
    };
    let class = vm.specials().block;
    vm.allocate(HeapObject::new(class, Body::Block(data)))
}

/// `value`, `value:` and `value:value:`. Answers the block's context for
/// the caller to activate; an arity mismatch signals when it is built.
pub fn block_value(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_block(vm, receiver)?;
    vm.new_context(receiver, Value::NIL, args)
}

pub fn block_num_args(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let count = expect_block(vm, receiver)?;
    Ok(Value::from_integer(count as i64)?)
}

/// Runs the protected block in a nested run, the one native boundary a
/// block evaluation keeps.
pub fn block_on_do(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_block(vm, receiver)?;
    let filter = arg(args, 0)?;
    let handler = arg(args, 1)?;
    if vm.heap().class(filter).is_err() {
        return Err(VmError::PrimitiveFailed);
    }
    expect_block(vm, handler)?;
    vm.on_do(receiver, filter, handler)
}

pub fn block_value_with_arguments(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_block(vm, receiver)?;
    let items = vm
        .heap()
        .array(arg(args, 0)?)
        .map_err(|_| VmError::PrimitiveFailed)?
        .clone();
    vm.new_context(receiver, Value::NIL, &items)
}
