use object::Value;

use crate::primitives::{arg, checked_index};
use crate::{Vm, VmError};

fn expect_array(vm: &Vm, value: Value) -> Result<&[Value], VmError> {
    vm.heap()
        .array(value)
        .map(Vec::as_slice)
        .map_err(|_| VmError::PrimitiveFailed)
}

pub fn array_size(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let len = expect_array(vm, receiver)?.len();
    Ok(Value::from_integer(len as i64)?)
}

pub fn array_at(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let items = expect_array(vm, receiver)?;
    let index = checked_index(arg(args, 0)?, items.len(), "array")?;
    Ok(items[index])
}

/// Store and answer the stored value.
pub fn array_at_put(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let len = expect_array(vm, receiver)?.len();
    let index = checked_index(arg(args, 0)?, len, "array")?;
    let value = arg(args, 1)?;
    vm.heap_mut().array_mut(receiver)?[index] = value;
    Ok(value)
}
