use std::collections::HashMap;

use crate::header::{Header, ObjectKind};
use crate::value::Value;

pub type Selectors<V> = HashMap<Box<str>, V, ahash::RandomState>;

#[inline]
fn byte_words(len: usize) -> usize {
    len.div_ceil(8)
}

/// Number of arguments a selector takes: one per keyword part, one for a
/// binary operator, none for a unary name.
pub fn selector_arity(selector: &str) -> usize {
    let keywords = selector.bytes().filter(|&b| b == b':').count();
    if keywords > 0 {
        return keywords;
    }
    match selector.chars().next() {
        Some(c) if c.is_alphabetic() || c == '_' => 0,
        Some(_) => 1,
        None => 0,
    }
}

/// String-keyed map of values.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: Selectors<Value>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.entries.iter().map(|(k, v)| (&**k, *v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries.values_mut()
    }
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: Box<str>,
    /// Nil for the root class.
    pub superclass: Value,
    /// Names declared by this class only.
    pub instance_variables: Vec<Box<str>>,
    /// Slot count including every inherited instance variable.
    pub instance_size: usize,
    pub methods: Selectors<Value>,
}

impl ClassData {
    pub fn new(
        name: &str,
        superclass: Value,
        instance_variables: Vec<Box<str>>,
        inherited_size: usize,
    ) -> Self {
        let instance_size = inherited_size + instance_variables.len();
        Self {
            name: name.into(),
            superclass,
            instance_variables,
            instance_size,
            methods: Selectors::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodData {
    pub selector: Value,
    pub bytecode: Vec<u8>,
    pub literals: Vec<Value>,
    pub temp_names: Vec<Box<str>>,
    pub arg_count: usize,
    pub owner: Value,
    pub primitive: Option<u32>,
}

impl MethodData {
    /// Temp slots in an activation: arguments first, then locals.
    pub fn temp_count(&self) -> usize {
        self.temp_names.len().max(self.arg_count)
    }
}

#[derive(Debug, Clone)]
pub struct BlockData {
    pub bytecode: Vec<u8>,
    pub literals: Vec<Value>,
    pub temp_names: Vec<Box<str>>,
    pub arg_count: usize,
    /// Context the block was created in, nil for detached blocks.
    pub outer_context: Value,
}

impl BlockData {
    pub fn temp_count(&self) -> usize {
        self.temp_names.len().max(self.arg_count)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExceptionData {
    pub message_text: Option<Box<str>>,
    pub tag: Value,
}

/// One method or block activation.
#[derive(Debug, Clone)]
pub struct ContextData {
    /// The method or block being run.
    pub code: Value,
    pub receiver: Value,
    pub temps: Vec<Value>,
    pub stack: Vec<Value>,
    pub stack_capacity: usize,
    pub pc: usize,
    pub sender: Value,
    /// Lexically enclosing context, nil for method activations.
    pub outer: Value,
    /// Method activation a block's `^` returns from, nil for methods.
    pub home: Value,
    pub depth: u32,
}

impl ContextData {
    pub const FIXED_WORDS: usize = 8;

    pub fn is_block_context(&self) -> bool {
        !self.outer.is_nil()
    }
}

#[derive(Debug, Clone)]
pub enum Body {
    String(Vec<u8>),
    Symbol(Box<str>),
    Array(Vec<Value>),
    ByteArray(Vec<u8>),
    Dictionary(Dictionary),
    Class(ClassData),
    Method(MethodData),
    Block(BlockData),
    Exception(ExceptionData),
    Instance(Vec<Value>),
    Context(ContextData),
}

impl Default for Body {
    fn default() -> Self {
        Self::Instance(Vec::new())
    }
}

/// A heap object: common header plus kind-specific payload.
#[derive(Debug, Clone, Default)]
pub struct HeapObject {
    pub header: Header,
    pub body: Body,
}

macro_rules! body_accessors {
    ($($kind:ident => $get:ident, $get_mut:ident : $ty:ty;)*) => {
        $(
            pub fn $get(&self) -> Option<&$ty> {
                match &self.body {
                    Body::$kind(inner) => Some(inner),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                match &mut self.body {
                    Body::$kind(inner) => Some(inner),
                    _ => None,
                }
            }
        )*
    };
}

impl HeapObject {
    pub fn new(class: Value, body: Body) -> Self {
        Self {
            header: Header::new(class),
            body,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.body {
            Body::String(_) => ObjectKind::String,
            Body::Symbol(_) => ObjectKind::Symbol,
            Body::Array(_) => ObjectKind::Array,
            Body::ByteArray(_) => ObjectKind::ByteArray,
            Body::Dictionary(_) => ObjectKind::Dictionary,
            Body::Class(_) => ObjectKind::Class,
            Body::Method(_) => ObjectKind::Method,
            Body::Block(_) => ObjectKind::Block,
            Body::Exception(_) => ObjectKind::Exception,
            Body::Instance(_) => ObjectKind::Instance,
            Body::Context(_) => ObjectKind::Context,
        }
    }

    #[inline(always)]
    pub fn class(&self) -> Value {
        self.header.class
    }

    /// Size in words, header included.
    pub fn footprint(&self) -> usize {
        let payload = match &self.body {
            Body::String(bytes) | Body::ByteArray(bytes) => 1 + byte_words(bytes.len()),
            Body::Symbol(text) => 1 + byte_words(text.len()),
            Body::Array(items) | Body::Instance(items) => 1 + items.len(),
            Body::Dictionary(dict) => 1 + 2 * dict.len(),
            Body::Class(class) => {
                4 + class.instance_variables.len() + 2 * class.methods.len()
            }
            Body::Method(method) => {
                6 + byte_words(method.bytecode.len())
                    + method.literals.len()
                    + method.temp_names.len()
            }
            Body::Block(block) => {
                5 + byte_words(block.bytecode.len())
                    + block.literals.len()
                    + block.temp_names.len()
            }
            Body::Exception(_) => 2,
            Body::Context(ctx) => {
                ContextData::FIXED_WORDS + ctx.temps.len() + ctx.stack_capacity
            }
        };
        Header::WORDS + payload
    }

    body_accessors! {
        String => as_string, as_string_mut: Vec<u8>;
        Symbol => as_symbol, as_symbol_mut: Box<str>;
        Array => as_array, as_array_mut: Vec<Value>;
        ByteArray => as_byte_array, as_byte_array_mut: Vec<u8>;
        Dictionary => as_dictionary, as_dictionary_mut: Dictionary;
        Class => as_class, as_class_mut: ClassData;
        Method => as_method, as_method_mut: MethodData;
        Block => as_block, as_block_mut: BlockData;
        Exception => as_exception, as_exception_mut: ExceptionData;
        Instance => as_instance, as_instance_mut: Vec<Value>;
        Context => as_context, as_context_mut: ContextData;
    }
}
