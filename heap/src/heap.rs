use std::mem;

use object::{
    BlockData, ClassData, ContextData, Dictionary, ExceptionData, HeapObject, MethodData,
    ObjectKind, ObjectRef, Value, ValueError, Visitable,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeapError {
    #[error("invalid heap settings: {0}")]
    InvalidSettings(&'static str),
    #[error("allocation of {requested} words exceeds the {capacity}-word semispace")]
    OversizedAllocation { requested: usize, capacity: usize },
    #[error("out of memory: {requested} words requested, {available} available")]
    OutOfMemory { requested: usize, available: usize },
    #[error("dangling reference {0:?}")]
    InvalidReference(Value),
    #[error("collector found dangling reference {0:?}")]
    DanglingReference(Value),
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Sizes are counted in words; thresholds are fractions of one semispace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeapSettings {
    /// Initial size of each semispace in words.
    pub initial_capacity: usize,
    /// Fill level (0.0 - 1.0) at which the allocator asks for a collection.
    pub collect_threshold: f64,
    /// Live fraction (0.0 - 1.0) after a collection above which both spaces double.
    pub growth_threshold: f64,
    /// Upper bound for the semispace size in words.
    pub max_capacity: usize,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            initial_capacity: 10_000,
            collect_threshold: 0.8,
            growth_threshold: 0.7,
            max_capacity: 1 << 24,
        }
    }
}

impl HeapSettings {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.initial_capacity == 0 {
            return Err("initial_capacity must be > 0");
        }
        if self.max_capacity < self.initial_capacity {
            return Err("max_capacity must be >= initial_capacity");
        }
        if self.max_capacity > u32::MAX as usize {
            return Err("max_capacity must fit object indices");
        }
        if !(0.0..=1.0).contains(&self.collect_threshold)
            || !(0.0..=1.0).contains(&self.growth_threshold)
        {
            return Err("thresholds must be within 0.0..=1.0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: usize,
    pub growths: usize,
    pub live_objects: usize,
    pub live_words: usize,
    /// Objects left behind by the last collection.
    pub freed_objects: usize,
    pub total_copied: usize,
}

/// Source of the root set for a collection.
///
/// Each visited slot is rewritten in place with the object's new location.
pub trait RootProvider {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(&mut Value));
}

/// Cheney copy state: evacuates from-space objects into to-space and
/// leaves a forwarding reference behind.
struct Evacuator<'a> {
    from: &'a mut [HeapObject],
    to: &'a mut Vec<HeapObject>,
    words: usize,
    /// First reference that did not resolve to a from-space object.
    dangling: Option<Value>,
}

impl Evacuator<'_> {
    fn copy(&mut self, value: &mut Value) {
        let Ok(old) = value.as_ref() else {
            return;
        };
        let Some(slot) = self.from.get_mut(old.index()) else {
            log::error!("collector found dangling reference {value:?}");
            self.dangling.get_or_insert(*value);
            return;
        };
        if let Some(new) = slot.header.forward() {
            *value = Value::from_ref(new);
            return;
        }

        let new = ObjectRef::new(self.to.len() as u32);
        let mut object = mem::take(slot);
        slot.header.set_forward(new);
        object.header.reset_gc();
        self.words += object.footprint();
        self.to.push(object);
        *value = Value::from_ref(new);
    }
}

/// Two equal semispaces; objects are bump-allocated into "from".
///
/// The heap never decides on its own to collect: callers check
/// [`needs_collection`](Heap::needs_collection) and run
/// [`collect`](Heap::collect) with their roots before allocating.
pub struct Heap {
    from: Vec<HeapObject>,
    to: Vec<HeapObject>,
    used: usize,
    capacity: usize,
    settings: HeapSettings,
    stats: GcStats,
    next_hash: u32,
}

macro_rules! typed_accessors {
    ($($kind:ident => $get:ident, $get_mut:ident, $as:ident, $as_mut:ident : $ty:ty;)*) => {
        $(
            pub fn $get(&self, value: Value) -> Result<&$ty, HeapError> {
                let object = self.get(value)?;
                let found = object.kind().name();
                object.$as().ok_or(HeapError::WrongKind {
                    expected: ObjectKind::$kind.name(),
                    found,
                })
            }

            pub fn $get_mut(&mut self, value: Value) -> Result<&mut $ty, HeapError> {
                let object = self.get_mut(value)?;
                let found = object.kind().name();
                object.$as_mut().ok_or(HeapError::WrongKind {
                    expected: ObjectKind::$kind.name(),
                    found,
                })
            }
        )*
    };
}

impl Heap {
    pub fn new(settings: HeapSettings) -> Result<Self, HeapError> {
        settings.validate().map_err(HeapError::InvalidSettings)?;
        Ok(Self {
            from: Vec::new(),
            to: Vec::new(),
            used: 0,
            capacity: settings.initial_capacity,
            settings,
            stats: GcStats::default(),
            next_hash: 0,
        })
    }

    pub fn settings(&self) -> &HeapSettings {
        &self.settings
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    /// Words allocated in the current from-space.
    pub fn used_words(&self) -> usize {
        self.used
    }

    /// Size of one semispace in words.
    pub fn capacity_words(&self) -> usize {
        self.capacity
    }

    pub fn object_count(&self) -> usize {
        self.from.len()
    }

    // ── Allocation ─────────────────────────────────────────────────

    /// Whether an allocation of `words` would cross the collection threshold.
    pub fn needs_collection(&self, words: usize) -> bool {
        (self.used + words) as f64 > self.capacity as f64 * self.settings.collect_threshold
    }

    pub fn allocate(&mut self, mut object: HeapObject) -> Result<ObjectRef, HeapError> {
        let words = object.footprint();
        if words > self.capacity {
            return Err(HeapError::OversizedAllocation {
                requested: words,
                capacity: self.capacity,
            });
        }
        if self.used + words > self.capacity {
            return Err(HeapError::OutOfMemory {
                requested: words,
                available: self.capacity.saturating_sub(self.used),
            });
        }

        object.header.reset_gc();
        if object.header.identity_hash() == 0 {
            object.header.set_identity_hash(self.fresh_hash());
        }
        let r = ObjectRef::new(self.from.len() as u32);
        self.from.push(object);
        self.used += words;
        Ok(r)
    }

    /// Identity hashes cycle through 1..2^30 and are never zero.
    fn fresh_hash(&mut self) -> u32 {
        self.next_hash = self.next_hash % ((1 << 30) - 1) + 1;
        self.next_hash
    }

    // ── Collection ─────────────────────────────────────────────────

    /// Stop-and-copy collection of everything reachable from `roots`.
    ///
    /// A reference that names no object is an engine bug; the cycle still
    /// completes, then fails with [`HeapError::DanglingReference`].
    pub fn collect(&mut self, roots: &mut dyn RootProvider) -> Result<(), HeapError> {
        let before = self.from.len();

        self.to.clear();
        self.to.reserve(before);
        for object in &mut self.from {
            object.header.reset_gc();
        }

        let mut evacuator = Evacuator {
            from: &mut self.from,
            to: &mut self.to,
            words: 0,
            dangling: None,
        };
        roots.visit_roots(&mut |slot| evacuator.copy(slot));

        let mut scan = 0;
        while scan < evacuator.to.len() {
            let mut object = mem::take(&mut evacuator.to[scan]);
            object.visit_edges_mut(&mut |slot| evacuator.copy(slot));
            evacuator.to[scan] = object;
            scan += 1;
        }
        let live_words = evacuator.words;
        let dangling = evacuator.dangling;

        mem::swap(&mut self.from, &mut self.to);
        self.to.clear();
        self.used = live_words;

        let live = self.from.len();
        self.stats.collections += 1;
        self.stats.live_objects = live;
        self.stats.live_words = live_words;
        self.stats.freed_objects = before - live;
        self.stats.total_copied += live;

        if live_words as f64 > self.capacity as f64 * self.settings.growth_threshold {
            self.grow();
        }

        log::debug!(
            "gc #{}: {} live objects ({} words), {} freed, capacity {} words",
            self.stats.collections,
            live,
            live_words,
            before - live,
            self.capacity
        );

        match dangling {
            Some(value) => Err(HeapError::DanglingReference(value)),
            None => Ok(()),
        }
    }

    fn grow(&mut self) {
        let grown = (self.capacity * 2).min(self.settings.max_capacity);
        if grown > self.capacity {
            log::debug!("growing semispaces from {} to {} words", self.capacity, grown);
            self.capacity = grown;
            self.stats.growths += 1;
        }
    }

    // ── Access ─────────────────────────────────────────────────────

    pub fn get(&self, value: Value) -> Result<&HeapObject, HeapError> {
        let r = value.as_ref()?;
        self.from
            .get(r.index())
            .ok_or(HeapError::InvalidReference(value))
    }

    pub fn get_mut(&mut self, value: Value) -> Result<&mut HeapObject, HeapError> {
        let r = value.as_ref()?;
        self.from
            .get_mut(r.index())
            .ok_or(HeapError::InvalidReference(value))
    }

    /// Mutate the object at `value` in place, charging any change in its
    /// footprint to the current space.
    pub fn resize_with<R>(
        &mut self,
        value: Value,
        update: impl FnOnce(&mut HeapObject) -> R,
    ) -> Result<R, HeapError> {
        let object = self.get_mut(value)?;
        let before = object.footprint();
        let result = update(object);
        let after = object.footprint();
        self.used = (self.used + after).saturating_sub(before);
        Ok(result)
    }

    pub fn is_valid_ref(&self, value: Value) -> bool {
        value
            .as_ref()
            .is_ok_and(|r| r.index() < self.from.len())
    }

    typed_accessors! {
        String => string, string_mut, as_string, as_string_mut: Vec<u8>;
        Symbol => symbol, symbol_mut, as_symbol, as_symbol_mut: Box<str>;
        Array => array, array_mut, as_array, as_array_mut: Vec<Value>;
        ByteArray => byte_array, byte_array_mut, as_byte_array, as_byte_array_mut: Vec<u8>;
        Dictionary => dictionary, dictionary_mut, as_dictionary, as_dictionary_mut: Dictionary;
        Class => class, class_mut, as_class, as_class_mut: ClassData;
        Method => method, method_mut, as_method, as_method_mut: MethodData;
        Block => block, block_mut, as_block, as_block_mut: BlockData;
        Exception => exception, exception_mut, as_exception, as_exception_mut: ExceptionData;
        Instance => instance, instance_mut, as_instance, as_instance_mut: Vec<Value>;
        Context => context, context_mut, as_context, as_context_mut: ContextData;
    }

    /// Check that every object's class and every outgoing edge resolves to
    /// a live object, and that class pointers name classes.
    pub fn verify(&self) -> Result<(), HeapError> {
        for object in &self.from {
            let class = object.class();
            match self.get(class) {
                Ok(c) if c.kind() == ObjectKind::Class => {}
                Ok(c) => {
                    return Err(HeapError::WrongKind {
                        expected: "Class",
                        found: c.kind().name(),
                    });
                }
                Err(_) => return Err(HeapError::InvalidReference(class)),
            }

            let mut dangling = None;
            object.visit_edges(&mut |edge| {
                if dangling.is_none() && edge.is_ref() && !self.is_valid_ref(edge) {
                    dangling = Some(edge);
                }
            });
            if let Some(edge) = dangling {
                return Err(HeapError::InvalidReference(edge));
            }
        }
        Ok(())
    }
}
