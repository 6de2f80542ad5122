use object::{Body, ExceptionData, HeapObject, Value};

use crate::{Vm, VmError};

/// One `on:do:` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Exception class the handler catches (subclasses included).
    pub filter: Value,
    /// Block run with the exception.
    pub handler: Value,
    /// Context that sent `on:do:`; execution resumes there.
    pub context: Value,
    /// Index of the next handler out, `None` for the outermost.
    pub outer: Option<usize>,
}

impl Vm {
    pub fn handler_depth(&self) -> usize {
        self.roots.handlers.len()
    }

    pub fn handlers(&self) -> &[ExceptionHandler] {
        &self.roots.handlers
    }

    /// Innermost handler whose filter `exception` is a kind of.
    fn find_handler(&self, exception: Value) -> Result<Option<usize>, VmError> {
        let mut next = self.roots.handlers.len().checked_sub(1);
        while let Some(index) = next {
            let entry = self.roots.handlers[index];
            if self.is_kind_of(exception, entry.filter)? {
                return Ok(Some(index));
            }
            next = entry.outer;
        }
        Ok(None)
    }

    /// Start unwinding `exception` toward its handler.
    ///
    /// The returned error is what the caller propagates: `Signal` when a
    /// handler matches, `UnhandledException` otherwise.
    pub fn signal(&mut self, exception: Value) -> VmError {
        let handler = match self.find_handler(exception) {
            Ok(handler) => handler,
            Err(e) => return e,
        };
        let (class, message) = self.describe_exception(exception);
        match handler {
            Some(handler) => {
                log::debug!("signal {class}: {message} -> handler {handler}");
                VmError::Signal { exception, handler }
            }
            None => {
                log::warn!("unhandled {class}: {message}");
                VmError::UnhandledException { class, message }
            }
        }
    }

    /// Allocate an instance of `class` carrying `message` and `tag`, then
    /// signal it.
    pub fn raise(&mut self, class: Value, message: impl Into<Box<str>>, tag: Value) -> VmError {
        let data = ExceptionData {
            message_text: Some(message.into()),
            tag,
        };
        match self.allocate(HeapObject::new(class, Body::Exception(data))) {
            Ok(exception) => self.signal(exception),
            Err(e) => e,
        }
    }

    /// Signal a plain `Error`.
    pub fn raise_error(&mut self, message: impl Into<Box<str>>) -> VmError {
        let error = self.roots.specials.error;
        self.raise(error, message, Value::NIL)
    }

    fn describe_exception(&self, exception: Value) -> (String, String) {
        let class = self
            .class_of(exception)
            .and_then(|c| self.class_name(c).map(str::to_string))
            .unwrap_or_else(|_| "<unknown>".to_string());
        let message = self
            .heap
            .exception(exception)
            .ok()
            .and_then(|e| e.message_text.as_deref())
            .unwrap_or("")
            .to_string();
        (class, message)
    }

    /// Run `protected` with a handler for `filter` installed.
    ///
    /// The handler entry is removed on every exit. When a signal unwinds to
    /// this entry, the context that sent `on:do:` becomes active again and
    /// the handler block runs with the exception; its result is the result
    /// of `on:do:`.
    pub fn on_do(&mut self, protected: Value, filter: Value, handler: Value) -> Result<Value, VmError> {
        self.heap.class(filter)?;
        self.heap.block(handler)?;

        let index = self.roots.handlers.len();
        self.roots.handlers.push(ExceptionHandler {
            filter,
            handler,
            context: self.roots.active,
            outer: index.checked_sub(1),
        });

        let result = self.call_block(protected, &[]);
        let entry = self.roots.handlers.get(index).copied();
        self.roots.handlers.truncate(index);

        match (result, entry) {
            (Err(VmError::Signal { exception, handler }), Some(entry)) if handler == index => {
                self.roots.active = entry.context;
                let arity = self.heap.block(entry.handler)?.arg_count;
                log::debug!("handler {index} caught {exception:?}");
                if arity == 0 {
                    self.call_block(entry.handler, &[])
                } else {
                    self.call_block(entry.handler, &[exception])
                }
            }
            (result, _) => result,
        }
    }
}
