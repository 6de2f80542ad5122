use object::Value;

use crate::primitives::{arg, expect_integer, integer_result};
use crate::{Vm, VmError};

fn operands(receiver: Value, args: &[Value]) -> Result<(i64, i64), VmError> {
    Ok((expect_integer(receiver)?, expect_integer(arg(args, 0)?)?))
}

pub fn integer_add(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    integer_result(a.checked_add(b))
}

pub fn integer_sub(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    integer_result(a.checked_sub(b))
}

pub fn integer_mul(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    integer_result(a.checked_mul(b))
}

/// Equality with anything that is not an integer is false.
pub fn integer_eq(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let a = expect_integer(receiver)?;
    let other = arg(args, 0)?;
    Ok(Value::from_bool(other.as_integer() == Ok(a)))
}

pub fn integer_ne(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let a = expect_integer(receiver)?;
    let other = arg(args, 0)?;
    Ok(Value::from_bool(other.as_integer() != Ok(a)))
}

pub fn integer_lt(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_bool(a < b))
}

pub fn integer_gt(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_bool(a > b))
}

pub fn integer_le(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_bool(a <= b))
}

pub fn integer_ge(_vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    Ok(Value::from_bool(a >= b))
}

/// Quotient rounded toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q }
}

fn zero_divide(vm: &mut Vm, receiver: Value) -> VmError {
    let class = vm.specials().zero_divide;
    vm.raise(class, "division by zero", receiver)
}

/// `//`: floored integer division.
pub fn integer_div(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    if b == 0 {
        return Err(zero_divide(vm, receiver));
    }
    integer_result(Some(floor_div(a, b)))
}

/// `\\`: modulo with the sign of the divisor.
pub fn integer_mod(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
    let (a, b) = operands(receiver, args)?;
    if b == 0 {
        return Err(zero_divide(vm, receiver));
    }
    integer_result(Some(a - floor_div(a, b) * b))
}
