use object::Value;

use crate::primitives::arg;
use crate::{Vm, VmError};

/// Keys are Strings or Symbols, compared by text.
fn key_text(vm: &Vm, key: Value) -> Result<String, VmError> {
    vm.text_of(key).map_err(|_| VmError::PrimitiveFailed)
}

fn expect_dictionary(vm: &Vm, value: Value) -> Result<(), VmError> {
    vm.heap()
        .dictionary(value)
        .map(|_| ())
        .map_err(|_| VmError::PrimitiveFailed)
}

/// A missing key signals `NotFound` with the key as tag.
pub fn dictionary_at(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_dictionary(vm, receiver)?;
    let key = arg(args, 0)?;
    let text = key_text(vm, key)?;
    let found = vm.heap().dictionary(receiver)?.get(&text);
    match found {
        Some(value) => Ok(value),
        None => {
            let class = vm.specials().not_found;
            Err(vm.raise(class, format!("key not found: {text}"), key))
        }
    }
}

pub fn dictionary_at_put(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_dictionary(vm, receiver)?;
    let text = key_text(vm, arg(args, 0)?)?;
    let value = arg(args, 1)?;
    vm.dictionary_insert(receiver, &text, value)?;
    Ok(value)
}

pub fn dictionary_includes_key(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_dictionary(vm, receiver)?;
    let text = key_text(vm, arg(args, 0)?)?;
    Ok(Value::from_bool(vm.heap().dictionary(receiver)?.contains_key(&text)))
}

pub fn dictionary_size(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    expect_dictionary(vm, receiver)?;
    let len = vm.heap().dictionary(receiver)?.len();
    Ok(Value::from_integer(len as i64)?)
}

/// An Array of the keys as Symbols, sorted by text.
pub fn dictionary_keys(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    expect_dictionary(vm, receiver)?;
    let mut texts: Vec<String> = vm
        .heap()
        .dictionary(receiver)?
        .iter()
        .map(|(key, _)| key.to_owned())
        .collect();
    texts.sort_unstable();

    let mark = vm.scratch_mark();
    let interned = texts
        .iter()
        .try_for_each(|text| vm.new_symbol(text).map(|symbol| vm.scratch_push(symbol)));
    let symbols = vm.scratch_release(mark);
    interned?;
    vm.new_array(&symbols)
}
