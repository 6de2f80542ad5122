//! Small hand-assembled programs used by the `stvm` binary, the tests and
//! the benchmarks.

use bytecode::BytecodeBuilder;
use object::Value;

use crate::{Literal, Vm, VmError};

/// `Integer>>factorial`:
///
/// ```text
/// self < 2 ifTrue: [^1].
/// ^self * (self - 1) factorial
/// ```
pub fn factorial_bytecode() -> Vec<u8> {
    let mut code = BytecodeBuilder::new();
    code.push_self();
    code.push_literal(1);
    code.send(2, 1);
    let recurse = code.jump_if_false();
    code.push_literal(0);
    code.return_top();
    code.bind(recurse);
    code.push_self();
    code.push_self();
    code.push_literal(0);
    code.send(3, 1);
    code.send(4, 0);
    code.send(5, 1);
    code.return_top();
    code.into_bytes()
}

pub fn install_factorial(vm: &mut Vm) -> Result<Value, VmError> {
    let integer = vm.specials().integer;
    vm.new_method(
        integer,
        "factorial",
        factorial_bytecode(),
        &[
            Literal::Integer(1),
            Literal::Integer(2),
            Literal::Symbol("<"),
            Literal::Symbol("-"),
            Literal::Symbol("factorial"),
            Literal::Symbol("*"),
        ],
        &[],
        None,
    )
}

pub fn run_factorial(vm: &mut Vm, n: i64) -> Result<Value, VmError> {
    install_factorial(vm)?;
    let receiver = vm.new_integer(n)?;
    vm.send(receiver, "factorial", &[])
}

/// `Object>>adder: n`, answering `[:x | x + n]`. The block body has no
/// explicit return; its value is whatever is left on its stack.
pub fn adder_bytecode() -> Vec<u8> {
    let mut code = BytecodeBuilder::new();
    let block = code.begin_block(1, 1);
    code.push_temporary_variable(0);
    code.push_temporary_variable(1);
    code.send(0, 1);
    code.end_block(block);
    code.return_top();
    code.into_bytes()
}

pub fn install_adder(vm: &mut Vm) -> Result<Value, VmError> {
    let object = vm.specials().object;
    vm.new_method(
        object,
        "adder:",
        adder_bytecode(),
        &[Literal::Symbol("+")],
        &["n"],
        None,
    )
}

/// `(nil adder: n) value: x`, evaluated after `adder:` has returned.
pub fn run_closure(vm: &mut Vm, n: i64, x: i64) -> Result<Value, VmError> {
    install_adder(vm)?;
    let n = vm.new_integer(n)?;
    let block = vm.send(Value::NIL, "adder:", &[n])?;
    let x = vm.new_integer(x)?;
    vm.call_block(block, &[x])
}

/// `Integer>>safeDivide: d`:
///
/// ```text
/// ^[self // d] on: ZeroDivide do: [:e | 0]
/// ```
pub fn safe_divide_bytecode() -> Vec<u8> {
    let mut code = BytecodeBuilder::new();
    let protected = code.begin_block(1, 0);
    code.push_self();
    code.push_temporary_variable(0);
    code.send(0, 1);
    code.end_block(protected);
    code.push_literal(1);
    let handler = code.begin_block(3, 1);
    code.push_literal(2);
    code.end_block(handler);
    code.send(3, 2);
    code.return_top();
    code.into_bytes()
}

pub fn install_safe_divide(vm: &mut Vm) -> Result<Value, VmError> {
    let integer = vm.specials().integer;
    vm.new_method(
        integer,
        "safeDivide:",
        safe_divide_bytecode(),
        &[
            Literal::Symbol("//"),
            Literal::Global("ZeroDivide"),
            Literal::Integer(0),
            Literal::Symbol("on:do:"),
        ],
        &["d"],
        None,
    )
}

pub fn run_exception(vm: &mut Vm, dividend: i64, divisor: i64) -> Result<Value, VmError> {
    install_safe_divide(vm)?;
    let receiver = vm.new_integer(dividend)?;
    let divisor = vm.new_integer(divisor)?;
    vm.send(receiver, "safeDivide:", &[divisor])
}
