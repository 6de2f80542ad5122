use object::{Body, HeapObject, Value};

use crate::primitives::{arg, checked_index};
use crate::{Vm, VmError};

/// Bytes of a String or Symbol receiver.
fn text_bytes(vm: &Vm, value: Value) -> Result<&[u8], VmError> {
    let object = vm.heap().get(value).map_err(|_| VmError::PrimitiveFailed)?;
    if let Some(bytes) = object.as_string() {
        return Ok(bytes);
    }
    object
        .as_symbol()
        .map(|s| s.as_bytes())
        .ok_or(VmError::PrimitiveFailed)
}

pub fn string_concat(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let mut joined = text_bytes(vm, receiver)?.to_vec();
    joined.extend_from_slice(text_bytes(vm, arg(args, 0)?)?);
    let class = vm.specials().string;
    vm.allocate(HeapObject::new(class, Body::String(joined)))
}

pub fn string_size(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let len = text_bytes(vm, receiver)?.len();
    Ok(Value::from_integer(len as i64)?)
}

/// Byte at a one-based index, as an integer.
pub fn string_at(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let bytes = text_bytes(vm, receiver)?;
    let index = checked_index(arg(args, 0)?, bytes.len(), "string")?;
    Ok(Value::from_integer(bytes[index] as i64)?)
}

pub fn string_as_symbol(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let text = String::from_utf8(text_bytes(vm, receiver)?.to_vec())
        .map_err(|_| VmError::PrimitiveFailed)?;
    vm.new_symbol(&text)
}
