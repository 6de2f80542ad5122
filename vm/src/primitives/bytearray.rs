use object::Value;

use crate::primitives::{arg, checked_index, expect_integer};
use crate::{Vm, VmError};

fn expect_bytes(vm: &Vm, value: Value) -> Result<&[u8], VmError> {
    vm.heap()
        .byte_array(value)
        .map(Vec::as_slice)
        .map_err(|_| VmError::PrimitiveFailed)
}

pub fn bytearray_size(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let len = expect_bytes(vm, receiver)?.len();
    Ok(Value::from_integer(len as i64)?)
}

pub fn bytearray_at(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let bytes = expect_bytes(vm, receiver)?;
    let index = checked_index(arg(args, 0)?, bytes.len(), "byte array")?;
    Ok(Value::from_integer(bytes[index] as i64)?)
}

/// Values outside 0..=255 fail the primitive.
pub fn bytearray_at_put(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let len = expect_bytes(vm, receiver)?.len();
    let index = checked_index(arg(args, 0)?, len, "byte array")?;
    let value = arg(args, 1)?;
    let byte = u8::try_from(expect_integer(value)?).map_err(|_| VmError::PrimitiveFailed)?;
    vm.heap_mut().byte_array_mut(receiver)?[index] = byte;
    Ok(value)
}
