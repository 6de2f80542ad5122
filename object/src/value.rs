use thiserror::Error;

/// Tag constants.
const TAG_BITS: u32 = 2;
const TAG_MASK: u64 = 0b11;
const POINTER_TAG: u64 = 0b00;
const SPECIAL_TAG: u64 = 0b01;
const FLOAT_TAG: u64 = 0b10;
const INTEGER_TAG: u64 = 0b11;

const NIL_BITS: u64 = (0 << TAG_BITS) | SPECIAL_TAG;
const TRUE_BITS: u64 = (1 << TAG_BITS) | SPECIAL_TAG;
const FALSE_BITS: u64 = (2 << TAG_BITS) | SPECIAL_TAG;

/// Smallest integer that fits in an immediate.
pub const SMALL_INTEGER_MIN: i64 = -(1 << 61);
/// Largest integer that fits in an immediate.
pub const SMALL_INTEGER_MAX: i64 = (1 << 61) - 1;

/// Index of an object inside the current from-space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectRef(u32);

impl ObjectRef {
    #[inline(always)]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a [`Value`] holds, as seen through its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Nil,
    True,
    False,
    Integer,
    Float,
    Reference,
}

impl ValueKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::True => "true",
            Self::False => "false",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Reference => "reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected {expected} immediate, found {found:?}")]
    WrongTag { expected: &'static str, found: Value },
    #[error("integer {0} does not fit in a small integer")]
    IntegerOutOfRange(i64),
}

/// A tagged 64-bit value.
///
/// Encoding (low two bits are the tag):
/// - **Pointer**: `...XXXX00`: object index shifted left by two.
/// - **Special**: `...XXXX01`: `0` nil, `1` true, `2` false.
/// - **Float**:   `...XXXX10`: binary64 bits, two low mantissa bits replaced
///   by the tag.
/// - **Integer**: `...XXXX11`: 62-bit signed integer.
///
/// Tag `00` is the only encoding ever resolved as a heap reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    pub const NIL: Self = Self(NIL_BITS);
    pub const TRUE: Self = Self(TRUE_BITS);
    pub const FALSE: Self = Self(FALSE_BITS);

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    const fn tag(self) -> u64 {
        self.0 & TAG_MASK
    }

    pub const fn kind(self) -> ValueKind {
        match self.tag() {
            POINTER_TAG => ValueKind::Reference,
            FLOAT_TAG => ValueKind::Float,
            INTEGER_TAG => ValueKind::Integer,
            _ => match self.0 {
                TRUE_BITS => ValueKind::True,
                FALSE_BITS => ValueKind::False,
                _ => ValueKind::Nil,
            },
        }
    }

    #[inline(always)]
    pub const fn is_immediate(self) -> bool {
        self.tag() != POINTER_TAG
    }

    // ── Specials ───────────────────────────────────────────────────

    #[inline(always)]
    pub const fn from_bool(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }

    #[inline(always)]
    pub const fn is_nil(self) -> bool {
        self.0 == NIL_BITS
    }

    /// Identity with the True immediate. Nothing else is truthy.
    #[inline(always)]
    pub const fn is_true(self) -> bool {
        self.0 == TRUE_BITS
    }

    #[inline(always)]
    pub const fn is_false(self) -> bool {
        self.0 == FALSE_BITS
    }

    #[inline(always)]
    pub const fn is_boolean(self) -> bool {
        self.is_true() || self.is_false()
    }

    // ── Integer ────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_integer(self) -> bool {
        self.tag() == INTEGER_TAG
    }

    #[inline(always)]
    pub const fn fits_integer(n: i64) -> bool {
        n >= SMALL_INTEGER_MIN && n <= SMALL_INTEGER_MAX
    }

    pub const fn from_integer(n: i64) -> Result<Self, ValueError> {
        if Self::fits_integer(n) {
            Ok(Self(((n << TAG_BITS) as u64) | INTEGER_TAG))
        } else {
            Err(ValueError::IntegerOutOfRange(n))
        }
    }

    pub const fn as_integer(self) -> Result<i64, ValueError> {
        if self.is_integer() {
            Ok((self.0 as i64) >> TAG_BITS)
        } else {
            Err(ValueError::WrongTag {
                expected: "integer",
                found: self,
            })
        }
    }

    // ── Float ──────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_float(self) -> bool {
        self.tag() == FLOAT_TAG
    }

    /// Encodes `f` inline. The two lowest mantissa bits are dropped; every
    /// NaN becomes the canonical quiet NaN so its payload survives that.
    pub fn from_float(f: f64) -> Self {
        let f = if f.is_nan() { f64::NAN } else { f };
        Self((f.to_bits() & !TAG_MASK) | FLOAT_TAG)
    }

    pub fn as_float(self) -> Result<f64, ValueError> {
        if self.is_float() {
            Ok(f64::from_bits(self.0 & !TAG_MASK))
        } else {
            Err(ValueError::WrongTag {
                expected: "float",
                found: self,
            })
        }
    }

    // ── Reference ──────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_ref(self) -> bool {
        self.tag() == POINTER_TAG
    }

    #[inline(always)]
    pub const fn from_ref(r: ObjectRef) -> Self {
        Self((r.0 as u64) << TAG_BITS)
    }

    pub const fn as_ref(self) -> Result<ObjectRef, ValueError> {
        if self.is_ref() {
            Ok(ObjectRef((self.0 >> TAG_BITS) as u32))
        } else {
            Err(ValueError::WrongTag {
                expected: "reference",
                found: self,
            })
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::NIL
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl From<ObjectRef> for Value {
    fn from(r: ObjectRef) -> Self {
        Self::from_ref(r)
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind() {
            ValueKind::Nil => write!(f, "nil"),
            ValueKind::True => write!(f, "true"),
            ValueKind::False => write!(f, "false"),
            ValueKind::Integer => write!(f, "Integer({})", (self.0 as i64) >> TAG_BITS),
            ValueKind::Float => {
                write!(f, "Float({})", f64::from_bits(self.0 & !TAG_MASK))
            }
            ValueKind::Reference => write!(f, "Ref(#{})", self.0 >> TAG_BITS),
        }
    }
}
