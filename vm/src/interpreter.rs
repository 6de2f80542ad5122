use bytecode::{Instruction, decode_at};
use heap::Heap;
use object::{BlockData, Body, ContextData, HeapObject, Value};

use crate::lookup::{LookupResult, lookup};
use crate::{Vm, VmError};

/// What a send resolved to.
pub(crate) enum Dispatch {
    /// A primitive answered directly.
    Returned(Value),
    /// A new context that must run to produce the answer.
    Activate(Value),
}

/// Bytecode and literals of a method or block.
fn code_parts(heap: &Heap, code: Value) -> Result<(&[u8], &[Value]), VmError> {
    match &heap.get(code)?.body {
        Body::Method(m) => Ok((&m.bytecode, &m.literals)),
        Body::Block(b) => Ok((&b.bytecode, &b.literals)),
        _ => Err(VmError::TypeError {
            expected: "method or block",
            got: code,
        }),
    }
}

impl Vm {
    // ── Contexts ───────────────────────────────────────────────────

    /// A fresh, unlinked activation of a method or block.
    ///
    /// Block activations take their receiver from the context the block
    /// was created in; `receiver` is only used for methods and detached
    /// blocks. Arguments fill the first temps, the rest start nil.
    pub fn new_context(&mut self, code: Value, receiver: Value, args: &[Value]) -> Result<Value, VmError> {
        let (temp_count, arg_count, outer) = match &self.heap.get(code)?.body {
            Body::Method(m) => (m.temp_count(), m.arg_count, Value::NIL),
            Body::Block(b) => (b.temp_count(), b.arg_count, b.outer_context),
            _ => {
                return Err(VmError::TypeError {
                    expected: "method or block",
                    got: code,
                });
            }
        };
        if args.len() != arg_count {
            return Err(self.raise_error(format!(
                "wrong argument count: expected {arg_count}, got {}",
                args.len()
            )));
        }

        let (receiver, home) = if outer.is_nil() {
            (receiver, Value::NIL)
        } else {
            let outer_context = self.heap.context(outer)?;
            let home = if outer_context.home.is_nil() {
                outer
            } else {
                outer_context.home
            };
            (outer_context.receiver, home)
        };

        let mut temps = args.to_vec();
        temps.resize(temp_count, Value::NIL);
        let capacity = self.settings.stack_capacity;
        let context = ContextData {
            code,
            receiver,
            temps,
            stack: Vec::with_capacity(capacity),
            stack_capacity: capacity,
            pc: 0,
            sender: Value::NIL,
            outer,
            home,
            depth: 0,
        };
        let class = self.roots.specials.context;
        self.allocate(HeapObject::new(class, Body::Context(context)))
    }

    /// Make the active context the sender of `context`.
    fn link_context(&mut self, context: Value) -> Result<u32, VmError> {
        let sender = self.roots.active;
        let depth = if sender.is_nil() {
            1
        } else {
            self.heap.context(sender)?.depth + 1
        };
        let limit = self.settings.max_depth;
        if depth as usize > limit {
            return Err(VmError::StackOverflow {
                depth: depth as usize,
                limit,
            });
        }
        let linked = self.heap.context_mut(context)?;
        linked.sender = sender;
        linked.depth = depth;
        Ok(depth)
    }

    fn activate(&mut self, context: Value) -> Result<(), VmError> {
        self.link_context(context)?;
        self.roots.active = context;
        Ok(())
    }

    /// Run `context` until it returns and answer its result.
    ///
    /// The previously active context is active again afterwards, whether
    /// the run succeeded or not. Each call is one native run loop; more than
    /// `max_nested_runs` of them at once is a stack overflow.
    pub fn execute(&mut self, context: Value) -> Result<Value, VmError> {
        let nested = self.roots.run_bases.len() + 1;
        let limit = self.settings.max_nested_runs;
        if nested > limit {
            return Err(VmError::StackOverflow {
                depth: nested,
                limit,
            });
        }
        self.roots.run_bases.push(self.roots.active);
        let result = match self.link_context(context) {
            Ok(depth) => {
                self.roots.active = context;
                self.run(depth)
            }
            Err(e) => Err(e),
        };
        if let Some(base) = self.roots.run_bases.pop() {
            self.roots.active = base;
        }
        result
    }

    /// Send `selector` to `receiver` from the host.
    pub fn send(&mut self, receiver: Value, selector: &str, args: &[Value]) -> Result<Value, VmError> {
        let mark = self.scratch_mark();
        self.scratch_push(receiver);
        self.roots.scratch.extend_from_slice(args);
        let symbol = self.new_symbol(selector);
        let rooted = self.scratch_release(mark);
        let symbol = symbol?;

        match self.dispatch(rooted[0], symbol, &rooted[1..])? {
            Dispatch::Returned(value) => Ok(value),
            Dispatch::Activate(context) => self.execute(context),
        }
    }

    /// Evaluate a block with `args`.
    pub fn call_block(&mut self, block: Value, args: &[Value]) -> Result<Value, VmError> {
        let context = self.new_context(block, Value::NIL, args)?;
        self.execute(context)
    }

    // ── Run loop ───────────────────────────────────────────────────

    fn run(&mut self, entry_depth: u32) -> Result<Value, VmError> {
        loop {
            match self.step(entry_depth) {
                Ok(None) => {}
                Ok(Some(value)) => return Ok(value),
                Err(VmError::NonLocalReturn { home, value }) => {
                    if let Some(value) = self.return_from_home(home, value, entry_depth)? {
                        return Ok(value);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Execute one instruction of the active context. Answers the result
    /// once the entry context of this run returns.
    fn step(&mut self, entry_depth: u32) -> Result<Option<Value>, VmError> {
        let context = self.roots.active;
        let fetched = {
            let ctx = self.heap.context(context)?;
            let (bytecode, _) = code_parts(&self.heap, ctx.code)?;
            if ctx.pc >= bytecode.len() {
                None
            } else {
                Some((decode_at(bytecode, ctx.pc)?, ctx.pc, bytecode.len()))
            }
        };
        let Some((instruction, pc, code_len)) = fetched else {
            let ctx = self.heap.context(context)?;
            let value = ctx.stack.last().copied().unwrap_or(Value::NIL);
            return self.finish_return(value, entry_depth);
        };
        log::trace!("{pc:04}  {instruction}");
        self.heap.context_mut(context)?.pc = pc + instruction.size();

        match instruction {
            Instruction::PushLiteral { index } => {
                let value = self.literal(index)?;
                self.push(value)?;
            }
            Instruction::PushInstanceVariable { index } => {
                let receiver = self.heap.context(context)?.receiver;
                let value = self.instance_variable(receiver, index)?;
                self.push(value)?;
            }
            Instruction::PushTemporaryVariable { index } => {
                let (holder, slot) = self.temp_slot(index)?;
                let value = self.heap.context(holder)?.temps[slot];
                self.push(value)?;
            }
            Instruction::PushSelf => {
                let receiver = self.heap.context(context)?.receiver;
                self.push(receiver)?;
            }
            Instruction::StoreInstanceVariable { index } => {
                let value = self.pop()?;
                let receiver = self.heap.context(context)?.receiver;
                self.set_instance_variable(receiver, index, value)?;
            }
            Instruction::StoreTemporaryVariable { index } => {
                let value = self.pop()?;
                let (holder, slot) = self.temp_slot(index)?;
                self.heap.context_mut(holder)?.temps[slot] = value;
            }
            Instruction::SendMessage { selector, argc } => {
                let selector = self.literal(selector)?;
                if self.heap.symbol(selector).is_err() {
                    return Err(VmError::InvalidSelector(selector));
                }
                let args = self.pop_n(argc as usize)?;
                let receiver = self.pop()?;
                match self.dispatch(receiver, selector, &args)? {
                    Dispatch::Returned(value) => self.push(value)?,
                    Dispatch::Activate(callee) => self.activate(callee)?,
                }
            }
            Instruction::ReturnStackTop => {
                let value = self.pop()?;
                let (outer, home) = {
                    let ctx = self.heap.context(context)?;
                    (ctx.outer, ctx.home)
                };
                if outer.is_nil() {
                    return self.finish_return(value, entry_depth);
                }
                if !self.on_active_chain(home)? {
                    return Err(self.raise_error("block cannot return"));
                }
                return self.return_from_home(home, value, entry_depth);
            }
            Instruction::Jump { target } => {
                self.jump(context, target, code_len)?;
            }
            Instruction::JumpIfTrue { target } | Instruction::JumpIfFalse { target } => {
                let condition = self.pop()?;
                if !condition.is_boolean() {
                    return Err(self.raise_error(format!(
                        "conditional jump on non-boolean {condition:?}"
                    )));
                }
                let wanted = matches!(instruction, Instruction::JumpIfTrue { .. });
                if condition.is_true() == wanted {
                    self.jump(context, target, code_len)?;
                }
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Duplicate => {
                let value = self.top()?;
                self.push(value)?;
            }
            Instruction::CreateBlock {
                byte_len,
                literal_count,
                temp_count,
            } => {
                let start = pc + instruction.size();
                let end = start + byte_len as usize;
                let (bytecode, literals) = {
                    let code = self.heap.context(context)?.code;
                    let (bytes, literals) = code_parts(&self.heap, code)?;
                    if end > bytes.len() || literal_count as usize > literals.len() {
                        return Err(VmError::InvalidBlock {
                            byte_len,
                            literal_count,
                        });
                    }
                    (
                        bytes[start..end].to_vec(),
                        literals[..literal_count as usize].to_vec(),
                    )
                };
                self.heap.context_mut(context)?.pc = end;
                let data = BlockData {
                    bytecode,
                    literals,
                    temp_names: Vec::new(),
                    arg_count: temp_count as usize,
                    outer_context: context,
                };
                let class = self.roots.specials.block;
                let block = self.allocate(HeapObject::new(class, Body::Block(data)))?;
                self.push(block)?;
            }
            Instruction::ExecuteBlock { argc } => {
                let args = self.pop_n(argc as usize)?;
                let block = self.pop()?;
                if self.heap.block(block).is_err() {
                    return Err(self.raise_error(format!("cannot execute {block:?} as a block")));
                }
                let callee = self.new_context(block, Value::NIL, &args)?;
                self.activate(callee)?;
            }
        }
        Ok(None)
    }

    /// Pop the active context and hand `value` to its sender. Answers the
    /// value when the context is the entry context of this run.
    fn finish_return(&mut self, value: Value, entry_depth: u32) -> Result<Option<Value>, VmError> {
        let (depth, sender) = {
            let ctx = self.heap.context(self.roots.active)?;
            (ctx.depth, ctx.sender)
        };
        if depth <= entry_depth {
            return Ok(Some(value));
        }
        self.roots.active = sender;
        self.push(value)?;
        Ok(None)
    }

    /// Return `value` from `home` to home's sender. Homes below this run's
    /// entry belong to an enclosing run and are passed outward.
    fn return_from_home(
        &mut self,
        home: Value,
        value: Value,
        entry_depth: u32,
    ) -> Result<Option<Value>, VmError> {
        if self.heap.context(home)?.depth < entry_depth {
            return Err(VmError::NonLocalReturn { home, value });
        }
        log::trace!("non-local return to {home:?}");
        self.roots.active = home;
        self.finish_return(value, entry_depth)
    }

    fn on_active_chain(&self, target: Value) -> Result<bool, VmError> {
        let mut current = self.roots.active;
        while !current.is_nil() {
            if current == target {
                return Ok(true);
            }
            current = self.heap.context(current)?.sender;
        }
        Ok(false)
    }

    fn jump(&mut self, context: Value, target: u32, code_len: usize) -> Result<(), VmError> {
        if target as usize > code_len {
            return Err(VmError::InvalidJumpTarget {
                target,
                len: code_len,
            });
        }
        self.heap.context_mut(context)?.pc = target as usize;
        Ok(())
    }

    // ── Sends ──────────────────────────────────────────────────────

    /// Look up and start a send. Primitives answer directly; anything else
    /// produces a context for the caller to run.
    pub(crate) fn dispatch(
        &mut self,
        receiver: Value,
        selector: Value,
        args: &[Value],
    ) -> Result<Dispatch, VmError> {
        let class = self.class_of(receiver)?;
        let name = self.heap.symbol(selector)?.clone();

        let method = match lookup(&self.heap, class, &name)? {
            LookupResult::Found { holder, method } => {
                log::debug!("send #{name} to {receiver:?}, found in {}", self.class_name(holder)?);
                method
            }
            LookupResult::None => return Err(self.does_not_understand(class, selector, &name)),
        };
        let (primitive, arg_count, has_code) = {
            let m = self.heap.method(method)?;
            (m.primitive, m.arg_count, !m.bytecode.is_empty())
        };
        if arg_count != args.len() {
            return Err(self.raise_error(format!(
                "#{name} expects {arg_count} arguments, got {}",
                args.len()
            )));
        }

        if let Some(index) = primitive {
            match self.invoke_primitive(receiver, selector, args, method) {
                Ok(dispatch) => return Ok(dispatch),
                Err(VmError::PrimitiveFailed) if has_code => {
                    log::trace!("primitive {index} for #{name} failed, running fallback code");
                }
                Err(VmError::PrimitiveFailed) => {
                    return Err(self.raise_error(format!(
                        "primitive {index} failed for #{name}"
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Dispatch::Activate(self.new_context(method, receiver, args)?))
    }

    fn does_not_understand(&mut self, class: Value, selector: Value, name: &str) -> VmError {
        let class_name = self
            .class_name(class)
            .map(str::to_string)
            .unwrap_or_default();
        let error = self.roots.specials.message_not_understood;
        self.raise(error, format!("{class_name} does not understand #{name}"), selector)
    }

    // ── Operand stack and variables ────────────────────────────────

    fn active_context_mut(&mut self) -> Result<&mut ContextData, VmError> {
        if self.roots.active.is_nil() {
            return Err(VmError::NoActiveContext);
        }
        Ok(self.heap.context_mut(self.roots.active)?)
    }

    pub(crate) fn push(&mut self, value: Value) -> Result<(), VmError> {
        let ctx = self.active_context_mut()?;
        if ctx.stack.len() >= ctx.stack_capacity {
            return Err(VmError::OperandStackOverflow {
                capacity: ctx.stack_capacity,
            });
        }
        ctx.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Value, VmError> {
        self.active_context_mut()?
            .stack
            .pop()
            .ok_or(VmError::OperandStackUnderflow)
    }

    fn top(&mut self) -> Result<Value, VmError> {
        self.active_context_mut()?
            .stack
            .last()
            .copied()
            .ok_or(VmError::OperandStackUnderflow)
    }

    /// Pop `n` values, answered in push order.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, VmError> {
        let ctx = self.active_context_mut()?;
        let Some(at) = ctx.stack.len().checked_sub(n) else {
            return Err(VmError::OperandStackUnderflow);
        };
        Ok(ctx.stack.split_off(at))
    }

    fn literal(&self, index: u32) -> Result<Value, VmError> {
        let code = self.heap.context(self.roots.active)?.code;
        let (_, literals) = code_parts(&self.heap, code)?;
        literals
            .get(index as usize)
            .copied()
            .ok_or(VmError::LiteralOutOfRange {
                index,
                count: literals.len(),
            })
    }

    /// Context and slot for a temp index. Indices past the local temps
    /// continue into the lexically enclosing context.
    fn temp_slot(&self, index: u32) -> Result<(Value, usize), VmError> {
        let mut context = self.roots.active;
        let mut slot = index as usize;
        loop {
            let ctx = self.heap.context(context)?;
            if slot < ctx.temps.len() {
                return Ok((context, slot));
            }
            if ctx.outer.is_nil() {
                return Err(VmError::TempOutOfRange { index });
            }
            slot -= ctx.temps.len();
            context = ctx.outer;
        }
    }

    fn instance_variable(&self, receiver: Value, index: u32) -> Result<Value, VmError> {
        let slots = self.heap.instance(receiver)?;
        slots
            .get(index as usize)
            .copied()
            .ok_or(VmError::IndexOutOfBounds {
                kind: "instance variables",
                index: index as i64,
                size: slots.len(),
            })
    }

    fn set_instance_variable(&mut self, receiver: Value, index: u32, value: Value) -> Result<(), VmError> {
        let slots = self.heap.instance_mut(receiver)?;
        let size = slots.len();
        let slot = slots
            .get_mut(index as usize)
            .ok_or(VmError::IndexOutOfBounds {
                kind: "instance variables",
                index: index as i64,
                size,
            })?;
        *slot = value;
        Ok(())
    }
}
