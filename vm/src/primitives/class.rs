use object::{Body, Dictionary, HeapObject, Value};

use crate::lookup::inherits_from;
use crate::primitives::{arg, block, expect_integer};
use crate::{Vm, VmError};

fn expect_class(vm: &Vm, value: Value) -> Result<(), VmError> {
    vm.heap()
        .class(value)
        .map(|_| ())
        .map_err(|_| VmError::PrimitiveFailed)
}

pub fn object_class(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    vm.class_of(receiver)
}

pub fn object_identical(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::from_bool(receiver == arg(args, 0)?))
}

/// Integers hash to themselves, other immediates to their folded bits,
/// and heap objects to the hash stored in their header.
pub fn object_identity_hash(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    if receiver.is_integer() {
        return Ok(receiver);
    }
    let hash = if receiver.is_ref() {
        vm.heap().get(receiver)?.header.identity_hash()
    } else {
        let bits = receiver.raw();
        ((bits ^ (bits >> 32)) & ((1 << 30) - 1)) as u32
    };
    Ok(Value::from_integer(i64::from(hash))?)
}

/// `Class>>new`. The body follows the nearest built-in ancestor:
/// dictionaries get an empty table, indexable classes answer size 0,
/// exception classes an exception, and plain classes an instance with nil
/// slots. Classes whose instances only the VM makes fail.
pub fn class_new(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_class(vm, receiver)?;
    let specials = *vm.specials();
    if receiver == specials.block {
        return block::block_new(vm, receiver, args);
    }
    let vm_made = [
        specials.undefined_object,
        specials.true_class,
        specials.false_class,
        specials.integer,
        specials.float,
        specials.symbol,
        specials.block,
        specials.method,
        specials.context,
        specials.class,
    ];
    for ancestor in vm_made {
        if inherits_from(vm.heap(), receiver, ancestor)? {
            return Err(VmError::PrimitiveFailed);
        }
    }
    if inherits_from(vm.heap(), receiver, specials.dictionary)? {
        return vm.allocate(HeapObject::new(receiver, Body::Dictionary(Dictionary::new())));
    }
    match sized(vm, receiver, 0) {
        Err(VmError::PrimitiveFailed) => vm.new_instance(receiver),
        result => result,
    }
}

/// `Class>>new:` for the indexable classes.
pub fn class_new_sized(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    expect_class(vm, receiver)?;
    let size = usize::try_from(expect_integer(arg(args, 0)?)?).map_err(|_| VmError::PrimitiveFailed)?;
    if inherits_from(vm.heap(), receiver, vm.specials().symbol)? {
        return Err(VmError::PrimitiveFailed);
    }
    sized(vm, receiver, size)
}

fn sized(vm: &mut Vm, class: Value, size: usize) -> Result<Value, VmError> {
    if size > vm.heap().settings().max_capacity {
        return Err(VmError::PrimitiveFailed);
    }
    let specials = *vm.specials();
    let heap = vm.heap();
    let body = if inherits_from(heap, class, specials.array)? {
        Body::Array(vec![Value::NIL; size])
    } else if inherits_from(heap, class, specials.byte_array)? {
        Body::ByteArray(vec![0; size])
    } else if inherits_from(heap, class, specials.string)? {
        Body::String(vec![b' '; size])
    } else {
        return Err(VmError::PrimitiveFailed);
    };
    vm.allocate(HeapObject::new(class, body))
}

/// The class name as a symbol.
pub fn class_name(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    let name = vm
        .heap()
        .class(receiver)
        .map_err(|_| VmError::PrimitiveFailed)?
        .name
        .to_string();
    vm.new_symbol(&name)
}

pub fn class_superclass(vm: &mut Vm, receiver: Value, _args: &[Value]) -> Result<Value, VmError> {
    vm.heap()
        .class(receiver)
        .map(|c| c.superclass)
        .map_err(|_| VmError::PrimitiveFailed)
}
