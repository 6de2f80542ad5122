use bytecode::BytecodeBuilder;
use object::{Body, ClassData, Dictionary, HeapObject, Value};

use crate::materialize::Literal;
use crate::{Vm, VmError};

/// Classes the VM itself needs to know about.
#[derive(Debug, Clone, Copy)]
pub struct SpecialClasses {
    pub object: Value,
    pub undefined_object: Value,
    pub true_class: Value,
    pub false_class: Value,
    pub integer: Value,
    pub float: Value,
    pub string: Value,
    pub symbol: Value,
    pub array: Value,
    pub byte_array: Value,
    pub dictionary: Value,
    pub block: Value,
    pub method: Value,
    pub class: Value,
    pub context: Value,
    pub exception: Value,
    pub error: Value,
    pub zero_divide: Value,
    pub message_not_understood: Value,
    pub not_found: Value,
}

impl Default for SpecialClasses {
    fn default() -> Self {
        Self {
            object: Value::NIL,
            undefined_object: Value::NIL,
            true_class: Value::NIL,
            false_class: Value::NIL,
            integer: Value::NIL,
            float: Value::NIL,
            string: Value::NIL,
            symbol: Value::NIL,
            array: Value::NIL,
            byte_array: Value::NIL,
            dictionary: Value::NIL,
            block: Value::NIL,
            method: Value::NIL,
            class: Value::NIL,
            context: Value::NIL,
            exception: Value::NIL,
            error: Value::NIL,
            zero_divide: Value::NIL,
            message_not_understood: Value::NIL,
            not_found: Value::NIL,
        }
    }
}

impl SpecialClasses {
    pub(crate) fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        for slot in [
            &mut self.object,
            &mut self.undefined_object,
            &mut self.true_class,
            &mut self.false_class,
            &mut self.integer,
            &mut self.float,
            &mut self.string,
            &mut self.symbol,
            &mut self.array,
            &mut self.byte_array,
            &mut self.dictionary,
            &mut self.block,
            &mut self.method,
            &mut self.class,
            &mut self.context,
            &mut self.exception,
            &mut self.error,
            &mut self.zero_divide,
            &mut self.message_not_understood,
            &mut self.not_found,
        ] {
            visitor(slot);
        }
    }
}

/// `(class, selector, primitive index)` for every primitive method the
/// image starts with.
const PRIMITIVE_METHODS: &[(&str, &str, u32)] = &[
    ("Integer", "+", 1),
    ("Integer", "*", 2),
    ("Integer", "=", 3),
    ("Integer", "-", 4),
    ("Object", "basicClass", 5),
    ("Integer", "<", 6),
    ("Integer", ">", 7),
    ("Integer", "//", 8),
    ("Integer", "\\\\", 9),
    ("Float", "+", 10),
    ("Float", "-", 11),
    ("Float", "*", 12),
    ("Float", "/", 13),
    ("Float", "=", 14),
    ("Float", "<", 15),
    ("Float", ">", 16),
    ("Integer", "~=", 17),
    ("Integer", "<=", 18),
    ("Integer", ">=", 19),
    ("Block", "value", 21),
    ("Block", "value:", 22),
    ("Block", "value:value:", 23),
    ("Block", "numArgs", 24),
    ("Block", "on:do:", 25),
    ("Block", "valueWithArguments:", 26),
    ("String", ",", 30),
    ("String", "size", 31),
    ("String", "at:", 32),
    ("String", "asSymbol", 33),
    ("Array", "at:", 40),
    ("Array", "at:put:", 41),
    ("Array", "size", 42),
    ("ByteArray", "at:", 50),
    ("ByteArray", "at:put:", 51),
    ("ByteArray", "size", 52),
    ("Exception", "signal", 60),
    ("Exception", "signal:", 61),
    ("Exception", "messageText", 62),
    ("Exception", "messageText:", 63),
    ("Class", "new", 70),
    ("Class", "new:", 71),
    ("Object", "==", 72),
    ("Class", "name", 73),
    ("Class", "superclass", 74),
    ("Object", "identityHash", 75),
    ("Dictionary", "at:", 80),
    ("Dictionary", "at:put:", 81),
    ("Dictionary", "includesKey:", 82),
    ("Dictionary", "size", 83),
    ("Dictionary", "keys", 84),
];

/// Build the class hierarchy and the starting method set.
///
/// `Class` is allocated first with a nil class pointer and patched to be
/// its own class; the globals dictionary gets its class once `Dictionary`
/// exists.
pub(crate) fn bootstrap(vm: &mut Vm) -> Result<(), VmError> {
    let class_class = vm.allocate(HeapObject::new(
        Value::NIL,
        Body::Class(ClassData::new("Class", Value::NIL, Vec::new(), 0)),
    ))?;
    vm.roots.specials.class = class_class;
    vm.heap.get_mut(class_class)?.header.class = class_class;

    vm.roots.globals = vm.allocate(HeapObject::new(
        Value::NIL,
        Body::Dictionary(Dictionary::new()),
    ))?;

    let object = vm.define_class("Object", Value::NIL, &[])?;
    vm.roots.specials.object = object;
    let class_class = vm.roots.specials.class;
    vm.heap.class_mut(class_class)?.superclass = object;
    let globals = vm.roots.globals;
    vm.dictionary_insert(globals, "Class", class_class)?;

    macro_rules! define {
        ($($field:ident = $name:literal < $superclass:ident;)*) => {
            $(
                let superclass = vm.roots.specials.$superclass;
                vm.roots.specials.$field = vm.define_class($name, superclass, &[])?;
            )*
        };
    }

    define! {
        undefined_object = "UndefinedObject" < object;
        true_class = "True" < object;
        false_class = "False" < object;
        integer = "Integer" < object;
        float = "Float" < object;
        string = "String" < object;
        symbol = "Symbol" < string;
        array = "Array" < object;
        byte_array = "ByteArray" < object;
        dictionary = "Dictionary" < object;
        block = "Block" < object;
        method = "Method" < object;
        context = "Context" < object;
        exception = "Exception" < object;
        error = "Error" < exception;
        zero_divide = "ZeroDivide" < error;
        message_not_understood = "MessageNotUnderstood" < error;
        not_found = "NotFound" < exception;
    }

    let globals = vm.roots.globals;
    vm.heap.get_mut(globals)?.header.class = vm.roots.specials.dictionary;

    for &(class_name, selector, index) in PRIMITIVE_METHODS {
        let Some(class) = vm.class_named(class_name)? else {
            return Err(VmError::InvalidSettings("primitive installed on a missing class"));
        };
        vm.new_method(class, selector, Vec::new(), &[], &[], Some(index))?;
    }

    install_not(vm, "True", Literal::False)?;
    install_not(vm, "False", Literal::True)?;

    log::debug!(
        "installed {} primitive methods on {} classes",
        PRIMITIVE_METHODS.len(),
        vm.heap.dictionary(vm.roots.globals)?.len()
    );
    Ok(())
}

/// `not` on a boolean class answers the other boolean.
fn install_not(vm: &mut Vm, class_name: &str, answer: Literal<'_>) -> Result<(), VmError> {
    let mut code = BytecodeBuilder::new();
    code.push_literal(0);
    code.return_top();
    let Some(class) = vm.class_named(class_name)? else {
        return Err(VmError::InvalidSettings("boolean class missing"));
    };
    vm.new_method(class, "not", code.into_bytes(), &[answer], &[], None)?;
    Ok(())
}
