use object::Value;

use crate::primitives::arg;
use crate::{Vm, VmError};

/// Floats combine with floats and integers; anything else fails.
fn expect_number(value: Value) -> Result<f64, VmError> {
    if let Ok(f) = value.as_float() {
        return Ok(f);
    }
    value
        .as_integer()
        .map(|n| n as f64)
        .map_err(|_| VmError::PrimitiveFailed)
}

fn operands(receiver: Value, args: &[Value]) -> Result<(f64, f64), VmError> {
    let lhs = receiver.as_float().map_err(|_| VmError::PrimitiveFailed)?;
    Ok((lhs, expect_number(arg(args, 0)?)?))
}

pub fn float_add(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_float(a + b))
}

pub fn float_sub(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_float(a - b))
}

pub fn float_mul(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_float(a * b))
}

pub fn float_div(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    if b == 0.0 {
        let class = vm.specials().zero_divide;
        return Err(vm.raise(class, "division by zero", receiver));
    }
    Ok(Value::from_float(a / b))
}

/// Equality with a non-number is false.
pub fn float_eq(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let a = receiver.as_float().map_err(|_| VmError::PrimitiveFailed)?;
    let equal = expect_number(arg(args, 0)?).is_ok_and(|b| a == b);
    Ok(Value::from_bool(equal))
}

pub fn float_lt(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_bool(a < b))
}

pub fn float_gt(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_bool(a > b))
}
