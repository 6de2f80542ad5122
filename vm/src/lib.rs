pub mod demos;
pub mod error;
pub mod exception;
pub mod interpreter;
pub mod lookup;
pub mod materialize;
pub mod primitives;
pub mod special;

use heap::{GcStats, Heap, HeapSettings, RootProvider};
use object::{HeapObject, Value, Visitable};

pub use error::VmError;
pub use exception::ExceptionHandler;
pub use materialize::Literal;
pub use primitives::{PrimitiveDesc, PrimitiveFn, PrimitiveKind, PrimitiveTable};
pub use special::SpecialClasses;

type SymbolTable = std::collections::HashMap<Box<str>, Value, ahash::RandomState>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmSettings {
    pub heap: HeapSettings,
    /// Longest sender chain before execution stops with a stack overflow.
    pub max_depth: usize,
    /// Operand stack slots reserved in every context.
    pub stack_capacity: usize,
    /// Run loops allowed on the native stack at once. Host calls and
    /// `on:do:` each start one; plain sends and block evaluation do not.
    pub max_nested_runs: usize,
}

impl Default for VmSettings {
    fn default() -> Self {
        Self {
            heap: HeapSettings::default(),
            max_depth: 1024,
            stack_capacity: 64,
            max_nested_runs: 32,
        }
    }
}

impl VmSettings {
    pub fn validate(&self) -> Result<(), VmError> {
        self.heap
            .validate()
            .map_err(|reason| VmError::Heap(heap::HeapError::InvalidSettings(reason)))?;
        if self.max_depth == 0 {
            return Err(VmError::InvalidSettings("max_depth must be > 0"));
        }
        if self.stack_capacity == 0 {
            return Err(VmError::InvalidSettings("stack_capacity must be > 0"));
        }
        if self.max_nested_runs == 0 {
            return Err(VmError::InvalidSettings("max_nested_runs must be > 0"));
        }
        Ok(())
    }
}

/// Every value the collector must treat as live.
pub struct Roots {
    pub specials: SpecialClasses,
    /// Global namespace (a `Dictionary`), classes are registered here.
    pub globals: Value,
    pub symbols: SymbolTable,
    /// Context currently executing, nil between runs.
    pub active: Value,
    pub handlers: Vec<ExceptionHandler>,
    /// Contexts that were active when each nested run started.
    pub run_bases: Vec<Value>,
    /// Values held by multi-allocation helpers between allocations.
    pub scratch: Vec<Value>,
    pub pinned: Vec<Option<Value>>,
}

impl Roots {
    fn new() -> Self {
        Self {
            specials: SpecialClasses::default(),
            globals: Value::NIL,
            symbols: SymbolTable::default(),
            active: Value::NIL,
            handlers: Vec::new(),
            run_bases: Vec::new(),
            scratch: Vec::new(),
            pinned: Vec::new(),
        }
    }
}

impl RootProvider for Roots {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        self.specials.visit_mut(visitor);
        visitor(&mut self.globals);
        for v in self.symbols.values_mut() {
            visitor(v);
        }
        visitor(&mut self.active);
        for h in &mut self.handlers {
            visitor(&mut h.filter);
            visitor(&mut h.handler);
            visitor(&mut h.context);
        }
        for v in &mut self.run_bases {
            visitor(v);
        }
        for v in &mut self.scratch {
            visitor(v);
        }
        for v in self.pinned.iter_mut().flatten() {
            visitor(v);
        }
    }
}

/// Roots for a collection triggered by an allocation: the VM roots plus
/// whatever the object being allocated already points at.
struct AllocationRoots<'a> {
    roots: &'a mut Roots,
    pending: &'a mut HeapObject,
}

impl RootProvider for AllocationRoots<'_> {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(&mut Value)) {
        self.roots.visit_roots(visitor);
        self.pending.visit_edges_mut(visitor);
    }
}

/// Handle to a value held across allocations by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin(usize);

/// The virtual machine: heap, roots and the primitive table.
///
/// Any `Value` the host holds is invalidated by the next allocation unless
/// it is pinned or reachable from a pinned value.
pub struct Vm {
    heap: Heap,
    roots: Roots,
    primitives: PrimitiveTable,
    settings: VmSettings,
}

impl Vm {
    pub fn new(settings: VmSettings) -> Result<Self, VmError> {
        settings.validate()?;
        let mut vm = Self {
            heap: Heap::new(settings.heap)?,
            roots: Roots::new(),
            primitives: PrimitiveTable::with_defaults(),
            settings,
        };
        special::bootstrap(&mut vm)?;
        log::debug!(
            "bootstrapped {} objects ({} words)",
            vm.heap.object_count(),
            vm.heap.used_words()
        );
        Ok(vm)
    }

    pub fn settings(&self) -> &VmSettings {
        &self.settings
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn specials(&self) -> &SpecialClasses {
        &self.roots.specials
    }

    pub fn globals(&self) -> Value {
        self.roots.globals
    }

    /// The executing context, nil when the VM is idle.
    pub fn active_context(&self) -> Value {
        self.roots.active
    }

    pub fn primitives(&self) -> &PrimitiveTable {
        &self.primitives
    }

    pub fn register_primitive(&mut self, index: u32, desc: PrimitiveDesc) {
        self.primitives.register(index, desc);
    }

    // ── Allocation ─────────────────────────────────────────────────

    /// Allocate `object`, collecting first when the heap asks for it.
    ///
    /// This is the only place a collection starts. Values the object
    /// refers to are kept alive and updated before it is stored.
    pub fn allocate(&mut self, mut object: HeapObject) -> Result<Value, VmError> {
        let words = object.footprint();
        if self.heap.needs_collection(words) {
            let mut roots = AllocationRoots {
                roots: &mut self.roots,
                pending: &mut object,
            };
            self.heap.collect(&mut roots)?;
        }
        let r = self.heap.allocate(object)?;
        Ok(Value::from_ref(r))
    }

    pub fn collect_garbage(&mut self) -> Result<(), VmError> {
        Ok(self.heap.collect(&mut self.roots)?)
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    // ── Pins ───────────────────────────────────────────────────────

    /// Keep `value` alive and tracked across collections.
    pub fn pin(&mut self, value: Value) -> Pin {
        if let Some(free) = self.roots.pinned.iter().position(Option::is_none) {
            self.roots.pinned[free] = Some(value);
            return Pin(free);
        }
        self.roots.pinned.push(Some(value));
        Pin(self.roots.pinned.len() - 1)
    }

    /// Current location of a pinned value.
    pub fn pinned(&self, pin: Pin) -> Option<Value> {
        self.roots.pinned.get(pin.0).copied().flatten()
    }

    pub fn unpin(&mut self, pin: Pin) -> Option<Value> {
        self.roots.pinned.get_mut(pin.0).and_then(Option::take)
    }

    // ── Scratch roots ──────────────────────────────────────────────

    pub(crate) fn scratch_mark(&self) -> usize {
        self.roots.scratch.len()
    }

    pub(crate) fn scratch_push(&mut self, value: Value) {
        self.roots.scratch.push(value);
    }

    /// Remove and return everything pushed since `mark`.
    pub(crate) fn scratch_release(&mut self, mark: usize) -> Vec<Value> {
        self.roots.scratch.split_off(mark)
    }
}
