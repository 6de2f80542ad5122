use crate::objects::{
    BlockData, Body, ClassData, ContextData, Dictionary, ExceptionData, HeapObject,
    MethodData,
};
use crate::value::Value;

/// Enumerates the outgoing references of an object.
///
/// Visiting an object only reports its direct edges; the collector drives
/// the traversal.
pub trait Visitable {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value));
    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value));
}

impl Visitable for HeapObject {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        visitor(self.header.class);
        match &self.body {
            Body::String(_) | Body::Symbol(_) | Body::ByteArray(_) => {}
            Body::Array(items) | Body::Instance(items) => {
                items.iter().for_each(|v| visitor(*v))
            }
            Body::Dictionary(dict) => dict.visit_edges(visitor),
            Body::Class(class) => class.visit_edges(visitor),
            Body::Method(method) => method.visit_edges(visitor),
            Body::Block(block) => block.visit_edges(visitor),
            Body::Exception(exception) => exception.visit_edges(visitor),
            Body::Context(ctx) => ctx.visit_edges(visitor),
        }
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        visitor(&mut self.header.class);
        match &mut self.body {
            Body::String(_) | Body::Symbol(_) | Body::ByteArray(_) => {}
            Body::Array(items) | Body::Instance(items) => items.iter_mut().for_each(visitor),
            Body::Dictionary(dict) => dict.visit_edges_mut(visitor),
            Body::Class(class) => class.visit_edges_mut(visitor),
            Body::Method(method) => method.visit_edges_mut(visitor),
            Body::Block(block) => block.visit_edges_mut(visitor),
            Body::Exception(exception) => exception.visit_edges_mut(visitor),
            Body::Context(ctx) => ctx.visit_edges_mut(visitor),
        }
    }
}

impl Visitable for Dictionary {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        self.iter().for_each(|(_, v)| visitor(v));
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        self.values_mut().for_each(visitor);
    }
}

impl Visitable for ClassData {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        visitor(self.superclass);
        self.methods.values().for_each(|v| visitor(*v));
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        visitor(&mut self.superclass);
        self.methods.values_mut().for_each(visitor);
    }
}

impl Visitable for MethodData {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        visitor(self.selector);
        self.literals.iter().for_each(|v| visitor(*v));
        visitor(self.owner);
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        visitor(&mut self.selector);
        self.literals.iter_mut().for_each(&mut *visitor);
        visitor(&mut self.owner);
    }
}

impl Visitable for BlockData {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        self.literals.iter().for_each(|v| visitor(*v));
        visitor(self.outer_context);
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        self.literals.iter_mut().for_each(&mut *visitor);
        visitor(&mut self.outer_context);
    }
}

impl Visitable for ExceptionData {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        visitor(self.tag);
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        visitor(&mut self.tag);
    }
}

impl Visitable for ContextData {
    fn visit_edges(&self, visitor: &mut dyn FnMut(Value)) {
        visitor(self.code);
        visitor(self.receiver);
        self.temps.iter().for_each(|v| visitor(*v));
        self.stack.iter().for_each(|v| visitor(*v));
        visitor(self.sender);
        visitor(self.outer);
        visitor(self.home);
    }

    fn visit_edges_mut(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        visitor(&mut self.code);
        visitor(&mut self.receiver);
        self.temps.iter_mut().for_each(&mut *visitor);
        self.stack.iter_mut().for_each(&mut *visitor);
        visitor(&mut self.sender);
        visitor(&mut self.outer);
        visitor(&mut self.home);
    }
}
