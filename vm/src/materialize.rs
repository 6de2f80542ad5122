use object::{
    BlockData, Body, ClassData, Dictionary, ExceptionData, HeapObject, MethodData, Value,
    selector_arity,
};

use crate::{Vm, VmError};

/// A literal-table entry as the host describes it.
///
/// Strings and symbols are allocated when the table is materialized;
/// `Global` resolves a name in the globals dictionary at that time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Nil,
    True,
    False,
    Integer(i64),
    Float(f64),
    String(&'a str),
    Symbol(&'a str),
    Global(&'a str),
    Value(Value),
}

impl Vm {
    // ── Literal tables ─────────────────────────────────────────────

    /// Materialize `literals` onto the scratch roots.
    ///
    /// Existing values go in first so a collection triggered by a later
    /// string or symbol allocation updates them in place.
    fn materialize_literals(&mut self, literals: &[Literal<'_>]) -> Result<(), VmError> {
        let base = self.scratch_mark();
        for literal in literals {
            let value = match *literal {
                Literal::Nil => Value::NIL,
                Literal::True => Value::TRUE,
                Literal::False => Value::FALSE,
                Literal::Integer(n) => Value::from_integer(n)?,
                Literal::Float(f) => Value::from_float(f),
                Literal::Global(name) => self.global(name)?.unwrap_or(Value::NIL),
                Literal::Value(v) => v,
                Literal::String(_) | Literal::Symbol(_) => Value::NIL,
            };
            self.scratch_push(value);
        }
        for (i, literal) in literals.iter().enumerate() {
            let value = match *literal {
                Literal::String(text) => self.new_string(text)?,
                Literal::Symbol(text) => self.new_symbol(text)?,
                _ => continue,
            };
            self.roots.scratch[base + i] = value;
        }
        Ok(())
    }

    // ── Constructors ───────────────────────────────────────────────

    pub fn new_integer(&self, n: i64) -> Result<Value, VmError> {
        Ok(Value::from_integer(n)?)
    }

    pub fn new_float(&self, f: f64) -> Value {
        Value::from_float(f)
    }

    pub fn new_string(&mut self, text: &str) -> Result<Value, VmError> {
        let class = self.roots.specials.string;
        self.allocate(HeapObject::new(class, Body::String(text.as_bytes().to_vec())))
    }

    /// The unique symbol for `text`.
    pub fn new_symbol(&mut self, text: &str) -> Result<Value, VmError> {
        if let Some(&symbol) = self.roots.symbols.get(text) {
            return Ok(symbol);
        }
        let class = self.roots.specials.symbol;
        let symbol = self.allocate(HeapObject::new(class, Body::Symbol(text.into())))?;
        self.roots.symbols.insert(text.into(), symbol);
        Ok(symbol)
    }

    pub fn new_array(&mut self, items: &[Value]) -> Result<Value, VmError> {
        let class = self.roots.specials.array;
        self.allocate(HeapObject::new(class, Body::Array(items.to_vec())))
    }

    pub fn new_byte_array(&mut self, bytes: &[u8]) -> Result<Value, VmError> {
        let class = self.roots.specials.byte_array;
        self.allocate(HeapObject::new(class, Body::ByteArray(bytes.to_vec())))
    }

    pub fn new_dictionary(&mut self) -> Result<Value, VmError> {
        let class = self.roots.specials.dictionary;
        self.allocate(HeapObject::new(class, Body::Dictionary(Dictionary::new())))
    }

    /// A fresh instance of `class` with every instance variable nil.
    ///
    /// Exception classes get an exception body instead of slots.
    pub fn new_instance(&mut self, class: Value) -> Result<Value, VmError> {
        let exception = self.roots.specials.exception;
        if crate::lookup::inherits_from(&self.heap, class, exception)? {
            return self.new_exception(class, None);
        }
        let size = self.heap.class(class)?.instance_size;
        self.allocate(HeapObject::new(class, Body::Instance(vec![Value::NIL; size])))
    }

    pub fn new_exception(&mut self, class: Value, message: Option<&str>) -> Result<Value, VmError> {
        self.heap.class(class)?;
        let data = ExceptionData {
            message_text: message.map(Into::into),
            tag: Value::NIL,
        };
        self.allocate(HeapObject::new(class, Body::Exception(data)))
    }

    // ── Classes ────────────────────────────────────────────────────

    /// Create a class and register it in the globals under `name`.
    pub fn define_class(
        &mut self,
        name: &str,
        superclass: Value,
        instance_variables: &[&str],
    ) -> Result<Value, VmError> {
        let inherited = if superclass.is_nil() {
            0
        } else {
            self.heap.class(superclass)?.instance_size
        };
        let data = ClassData::new(
            name,
            superclass,
            instance_variables.iter().map(|&iv| iv.into()).collect(),
            inherited,
        );
        let class_class = self.roots.specials.class;
        let class = self.allocate(HeapObject::new(class_class, Body::Class(data)))?;
        let globals = self.roots.globals;
        self.dictionary_insert(globals, name, class)?;
        log::debug!("defined class {name}");
        Ok(class)
    }

    pub fn global(&self, name: &str) -> Result<Option<Value>, VmError> {
        Ok(self.heap.dictionary(self.roots.globals)?.get(name))
    }

    /// A registered class by name; `None` if the name is unbound or bound
    /// to something else.
    pub fn class_named(&self, name: &str) -> Result<Option<Value>, VmError> {
        Ok(self
            .global(name)?
            .filter(|&v| self.heap.class(v).is_ok()))
    }

    // ── Code ───────────────────────────────────────────────────────

    /// Build a method owned by `class` and install it there.
    ///
    /// The argument count comes from the selector. A method with a
    /// `primitive` may also carry bytecode, which runs when the primitive
    /// fails.
    pub fn new_method(
        &mut self,
        class: Value,
        selector: &str,
        bytecode: Vec<u8>,
        literals: &[Literal<'_>],
        temp_names: &[&str],
        primitive: Option<u32>,
    ) -> Result<Value, VmError> {
        self.heap.class(class)?;
        let mark = self.scratch_mark();
        self.scratch_push(class);
        let prepared = self
            .new_symbol(selector)
            .map(|symbol| self.scratch_push(symbol))
            .and_then(|()| self.materialize_literals(literals));
        let rooted = self.scratch_release(mark);
        prepared?;

        let data = MethodData {
            selector: rooted[1],
            bytecode,
            literals: rooted[2..].to_vec(),
            temp_names: temp_names.iter().map(|&t| t.into()).collect(),
            arg_count: selector_arity(selector),
            owner: rooted[0],
            primitive,
        };
        let method_class = self.roots.specials.method;
        let method = self.allocate(HeapObject::new(method_class, Body::Method(data)))?;
        let owner = self.heap.method(method)?.owner;
        self.method_insert(owner, selector.into(), method)?;
        Ok(method)
    }

    /// Install an existing method in `class` under its own selector.
    pub fn install_method(&mut self, class: Value, method: Value) -> Result<(), VmError> {
        let selector = self.heap.method(method)?.selector;
        let name = self.heap.symbol(selector)?.clone();
        log::debug!("installing #{name} in {}", self.class_name(class)?);
        self.method_insert(class, name, method)
    }

    /// Insert into a dictionary; growth counts against the heap.
    pub(crate) fn dictionary_insert(
        &mut self,
        dictionary: Value,
        key: &str,
        value: Value,
    ) -> Result<Option<Value>, VmError> {
        self.heap.dictionary(dictionary)?;
        let previous = self.heap.resize_with(dictionary, |object| {
            object
                .as_dictionary_mut()
                .and_then(|entries| entries.insert(key, value))
        })?;
        Ok(previous)
    }

    fn method_insert(&mut self, class: Value, selector: Box<str>, method: Value) -> Result<(), VmError> {
        self.heap.class(class)?;
        self.heap.resize_with(class, |object| {
            if let Some(data) = object.as_class_mut() {
                data.methods.insert(selector, method);
            }
        })?;
        Ok(())
    }

    /// A block not created by running code. `outer` may be nil, in which
    /// case the block's receiver is whatever its activation is given.
    pub fn new_block(
        &mut self,
        bytecode: Vec<u8>,
        literals: &[Literal<'_>],
        temp_names: &[&str],
        arg_count: usize,
        outer: Value,
    ) -> Result<Value, VmError> {
        if !outer.is_nil() {
            self.heap.context(outer)?;
        }
        let mark = self.scratch_mark();
        self.scratch_push(outer);
        let prepared = self.materialize_literals(literals);
        let rooted = self.scratch_release(mark);
        prepared?;

        let data = BlockData {
            bytecode,
            literals: rooted[1..].to_vec(),
            temp_names: temp_names.iter().map(|&t| t.into()).collect(),
            arg_count,
            outer_context: rooted[0],
        };
        let block_class = self.roots.specials.block;
        self.allocate(HeapObject::new(block_class, Body::Block(data)))
    }

    // ── Reading back ───────────────────────────────────────────────

    /// Text of a String or Symbol.
    pub fn text_of(&self, value: Value) -> Result<String, VmError> {
        let object = self.heap.get(value)?;
        if let Some(bytes) = object.as_string() {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }
        if let Some(text) = object.as_symbol() {
            return Ok(text.to_string());
        }
        Err(VmError::TypeError {
            expected: "string or symbol",
            got: value,
        })
    }
}
