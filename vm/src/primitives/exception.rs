use object::{Body, HeapObject, Value};

use crate::primitives::arg;
use crate::{Vm, VmError};

fn expect_exception(vm: &Vm, value: Value) -> Result<(), VmError> {
    vm.heap()
        .exception(value)
        .map(|_| ())
        .map_err(|_| VmError::PrimitiveFailed)
}

fn expect_text(vm: &Vm, value: Value) -> Result<Box<str>, VmError> {
    vm.text_of(value)
        .map(Into::into)
        .map_err(|_| VmError::PrimitiveFailed)
}

/// Unwind to the nearest matching handler; never answers normally.
pub fn exception_signal(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    expect_exception(vm, receiver)?;
    Err(vm.signal(receiver))
}

pub fn exception_signal_with(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_exception(vm, receiver)?;
    let text = expect_text(vm, arg(args, 0)?)?;
    vm.heap_mut().exception_mut(receiver)?.message_text = Some(text);
    Err(vm.signal(receiver))
}

/// The message as a new String, or nil when none was set.
pub fn exception_message_text(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let text = vm
        .heap()
        .exception(receiver)
        .map_err(|_| VmError::PrimitiveFailed)?
        .message_text
        .clone();
    match text {
        Some(text) => {
            let class = vm.specials().string;
            vm.allocate(HeapObject::new(class, Body::String(text.as_bytes().to_vec())))
        }
        None => Ok(Value::NIL),
    }
}

pub fn exception_set_message_text(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_exception(vm, receiver)?;
    let text = expect_text(vm, arg(args, 0)?)?;
    vm.heap_mut().exception_mut(receiver)?.message_text = Some(text);
    Ok(receiver)
}
