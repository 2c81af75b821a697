//! Fixed-capacity column segments with adaptive physical encodings.
//!
//! A [`Shard`] stores the values of one attribute for up to [`SHARD_SIZE`]
//! consecutive rows. Its physical encoding starts as compact as the column
//! family allows and is widened on demand, one value at a time, through
//! [`Shard::adapt`].
//!
//! # Encodings
//!
//! | Family | Ladder |
//! |--------|--------|
//! | long   | `i16` → `i32` → `i64` |
//! | int    | `i16` → `i32` |
//! | double | fixed-point `i8` (0.5 steps) → `f64` |
//! | bool, text | boxed [`Value`] slots, never promoted |
//!
//! The fixed-point double encoding stores `round(v * 2)` in a signed byte and
//! reads it back as `stored / 2`. A value is only accepted when that round trip
//! reproduces its exact bit pattern, which admits multiples of 0.5 in
//! `[-64, 63.5]` (and rejects `-0.0` and NaN).
//!
//! # Adapting
//!
//! `adapt` is a pure function of the current shard and a candidate value:
//! it returns `Ok(None)` when the shard can already represent the candidate,
//! or `Ok(Some(wider))` holding a **new** shard with identical sizes, values
//! and presence bits. Callers replace their shard with the wider one before
//! writing. The old shard is left untouched.
//!
//! # Presence
//!
//! Primitive encodings keep a presence mask that is only allocated once the
//! shard stops being dense:
//!
//! - writing a value strictly beyond the current size allocates a mask that
//!   marks the previously written prefix present; the skipped gap reads absent;
//! - clearing a slot (at or beyond the current size) on a mask-less shard first
//!   extends the size to cover the slot and then marks **every** slot up to the
//!   new size present before clearing the target. Slots skipped by such a clear
//!   therefore read as present, holding the encoding's zero value.
//!
//! Column builders only ever append, so neither case arises from `add`/`skip`;
//! both are reachable through direct slot writes.

use bitvec::vec::BitVec;
use tracing::trace;

use crate::engine::error::{
    ShardError,
    SlotOutOfRangeError,
    TypeMismatchError,
    UnrepresentableValueError,
};
use crate::engine::types::{AttrType, Value, SHARD_SIZE};


/// Slot storage for one primitive encoding.
///
/// `data.len()` is the shard size. When `mask` is present its length always
/// equals the size and a cleared bit marks an absent slot; without a mask
/// every slot below the size is present.

#[derive(Clone, Debug)]
pub struct Slots<T> {
    data: Vec<T>,
    mask: Option<BitVec>,
}

impl<T: Copy + Default> Slots<T> {
    fn new() -> Self {
        Self { data: Vec::with_capacity(SHARD_SIZE), mask: None }
    }

    #[inline]
    fn check(slot: usize) -> Result<(), SlotOutOfRangeError> {
        if slot < SHARD_SIZE {
            Ok(())
        } else {
            Err(SlotOutOfRangeError { slot, capacity: SHARD_SIZE })
        }
    }

    /// Number of slots written so far, including gaps.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no slot was ever written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once the shard has allocated a presence mask.
    #[inline]
    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// Returns `true` if `slot` holds no value.
    #[inline]
    pub fn is_null(&self, slot: usize) -> bool {
        if slot >= self.data.len() {
            return true;
        }
        match &self.mask {
            Some(mask) => !mask[slot],
            None => false,
        }
    }

    /// Returns the raw value at `slot`, or `None` when absent.
    #[inline]
    pub fn get(&self, slot: usize) -> Option<T> {
        if self.is_null(slot) { None } else { Some(self.data[slot]) }
    }

    fn mark(mask: &mut BitVec, slot: usize, present: bool) {
        if mask.len() <= slot {
            mask.resize(slot + 1, false);
        }
        mask.set(slot, present);
    }

    fn put(&mut self, slot: usize, value: T) -> Result<(), SlotOutOfRangeError> {
        Self::check(slot)?;
        let size = self.data.len();
        if slot >= size {
            if slot > size && self.mask.is_none() {
                self.mask = Some(BitVec::repeat(true, size));
            }
            self.data.resize(slot + 1, T::default());
        }
        self.data[slot] = value;
        if let Some(mask) = self.mask.as_mut() {
            Self::mark(mask, slot, true);
        }
        Ok(())
    }

    fn clear(&mut self, slot: usize) -> Result<(), SlotOutOfRangeError> {
        Self::check(slot)?;
        if slot >= self.data.len() {
            self.data.resize(slot + 1, T::default());
        }
        let size = self.data.len();
        let mask = self.mask.get_or_insert_with(|| BitVec::repeat(true, size));
        Self::mark(mask, slot, false);
        Ok(())
    }

    fn compact(&mut self) {
        self.data.shrink_to_fit();
        if let Some(mask) = self.mask.as_mut() {
            mask.shrink_to_fit();
        }
    }

    /// Re-encodes every slot through `f`, keeping size and presence intact.
    fn widen<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Slots<U> {
        let mut data = Vec::with_capacity(SHARD_SIZE.max(self.data.len()));
        data.extend(self.data.iter().map(|&v| f(v)));
        Slots { data, mask: self.mask.clone() }
    }
}

/// Boxed slots for the object family (`bool`, `text`).

#[derive(Clone, Debug)]
pub struct ObjectSlots {
    kind: AttrType,
    data: Vec<Option<Value>>,
}

impl ObjectSlots {
    fn new(kind: AttrType) -> Self {
        Self { kind, data: Vec::new() }
    }

    fn put(&mut self, slot: usize, value: Option<Value>) -> Result<(), SlotOutOfRangeError> {
        if slot >= SHARD_SIZE {
            return Err(SlotOutOfRangeError { slot, capacity: SHARD_SIZE });
        }
        if slot >= self.data.len() {
            self.data.resize(slot + 1, None);
        }
        self.data[slot] = value;
        Ok(())
    }
}

/// Physical encoding of a shard, for diagnostics and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShardEncoding {
    /// Long column stored as `i16`.
    LongI16,
    /// Long column stored as `i32`.
    LongI32,
    /// Long column stored as `i64`.
    LongI64,
    /// Int column stored as `i16`.
    IntI16,
    /// Int column stored as `i32`.
    IntI32,
    /// Double column stored as fixed-point `i8` halves.
    DoubleHalf,
    /// Double column stored as `f64`.
    DoubleF64,
    /// Boxed values.
    Object,
}

impl ShardEncoding {
    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ShardEncoding::LongI16 => "i16-backed long",
            ShardEncoding::LongI32 => "i32-backed long",
            ShardEncoding::LongI64 => "long",
            ShardEncoding::IntI16 => "i16-backed int",
            ShardEncoding::IntI32 => "int",
            ShardEncoding::DoubleHalf => "fixed-point double",
            ShardEncoding::DoubleF64 => "double",
            ShardEncoding::Object => "object",
        }
    }

    /// Bytes used per slot by the value payload.
    pub fn slot_bytes(self) -> usize {
        match self {
            ShardEncoding::LongI16 | ShardEncoding::IntI16 => 2,
            ShardEncoding::LongI32 | ShardEncoding::IntI32 => 4,
            ShardEncoding::LongI64 | ShardEncoding::DoubleF64 => 8,
            ShardEncoding::DoubleHalf => 1,
            ShardEncoding::Object => std::mem::size_of::<Option<Value>>(),
        }
    }
}

/// Encodes `value` as a fixed-point half, if that round-trips exactly.
#[inline]
pub fn encode_half(value: f64) -> Option<i8> {
    let scaled = (value * 2.0).round();
    if !(f64::from(i8::MIN)..=f64::from(i8::MAX)).contains(&scaled) {
        return None;
    }
    let stored = scaled as i8;
    if decode_half(stored).to_bits() == value.to_bits() {
        Some(stored)
    } else {
        None
    }
}

/// Decodes a fixed-point half.
#[inline]
pub fn decode_half(stored: i8) -> f64 {
    f64::from(stored) / 2.0
}

/// One column segment holding up to [`SHARD_SIZE`] values.
///
/// The variant encodes both the column family and the current physical
/// encoding; see the module docs for the promotion ladder.

#[derive(Clone, Debug)]
pub enum Shard {
    /// Long column, `i16` payload.
    LongI16(Slots<i16>),
    /// Long column, `i32` payload.
    LongI32(Slots<i32>),
    /// Long column, `i64` payload.
    LongI64(Slots<i64>),
    /// Int column, `i16` payload.
    IntI16(Slots<i16>),
    /// Int column, `i32` payload.
    IntI32(Slots<i32>),
    /// Double column, fixed-point `i8` payload.
    DoubleHalf(Slots<i8>),
    /// Double column, `f64` payload.
    DoubleF64(Slots<f64>),
    /// Bool or text column.
    Object(ObjectSlots),
}

impl Shard {
    /// Creates an empty shard using the most compact encoding of `kind`.
    pub fn create(kind: AttrType) -> Self {
        match kind {
            AttrType::Long => Shard::LongI16(Slots::new()),
            AttrType::Int => Shard::IntI16(Slots::new()),
            AttrType::Double => Shard::DoubleHalf(Slots::new()),
            AttrType::Bool | AttrType::Text => Shard::Object(ObjectSlots::new(kind)),
        }
    }

    /// Creates an empty shard using the widest encoding of `kind`.
    pub fn create_full(kind: AttrType) -> Self {
        match kind {
            AttrType::Long => Shard::LongI64(Slots::new()),
            AttrType::Int => Shard::IntI32(Slots::new()),
            AttrType::Double => Shard::DoubleF64(Slots::new()),
            AttrType::Bool | AttrType::Text => Shard::Object(ObjectSlots::new(kind)),
        }
    }

    /// Current physical encoding.
    pub fn encoding(&self) -> ShardEncoding {
        match self {
            Shard::LongI16(_) => ShardEncoding::LongI16,
            Shard::LongI32(_) => ShardEncoding::LongI32,
            Shard::LongI64(_) => ShardEncoding::LongI64,
            Shard::IntI16(_) => ShardEncoding::IntI16,
            Shard::IntI32(_) => ShardEncoding::IntI32,
            Shard::DoubleHalf(_) => ShardEncoding::DoubleHalf,
            Shard::DoubleF64(_) => ShardEncoding::DoubleF64,
            Shard::Object(_) => ShardEncoding::Object,
        }
    }

    /// Column family of this shard.
    pub fn family(&self) -> AttrType {
        match self {
            Shard::LongI16(_) | Shard::LongI32(_) | Shard::LongI64(_) => AttrType::Long,
            Shard::IntI16(_) | Shard::IntI32(_) => AttrType::Int,
            Shard::DoubleHalf(_) | Shard::DoubleF64(_) => AttrType::Double,
            Shard::Object(slots) => slots.kind,
        }
    }

    /// Number of slots written so far, including gaps.
    pub fn len(&self) -> usize {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.len(),
            Shard::LongI32(s) | Shard::IntI32(s) => s.len(),
            Shard::LongI64(s) => s.len(),
            Shard::DoubleHalf(s) => s.len(),
            Shard::DoubleF64(s) => s.len(),
            Shard::Object(s) => s.data.len(),
        }
    }

    /// Returns `true` if no slot was ever written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the shard holds no further free slots.
    pub fn is_full(&self) -> bool {
        self.len() >= SHARD_SIZE
    }

    /// Returns `true` once a primitive shard has allocated its presence mask.
    ///
    /// Object shards never allocate one; they box absence directly.
    pub fn has_mask(&self) -> bool {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.has_mask(),
            Shard::LongI32(s) | Shard::IntI32(s) => s.has_mask(),
            Shard::LongI64(s) => s.has_mask(),
            Shard::DoubleHalf(s) => s.has_mask(),
            Shard::DoubleF64(s) => s.has_mask(),
            Shard::Object(_) => false,
        }
    }

    /// Returns `true` if `slot` is unset or cleared.
    pub fn is_null(&self, slot: usize) -> bool {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.is_null(slot),
            Shard::LongI32(s) | Shard::IntI32(s) => s.is_null(slot),
            Shard::LongI64(s) => s.is_null(slot),
            Shard::DoubleHalf(s) => s.is_null(slot),
            Shard::DoubleF64(s) => s.is_null(slot),
            Shard::Object(s) => s.data.get(slot).map_or(true, Option::is_none),
        }
    }

    /// Reads `slot`, or `None` when absent.
    pub fn get(&self, slot: usize) -> Option<Value> {
        match self {
            Shard::LongI16(s) => s.get(slot).map(|v| Value::Long(i64::from(v))),
            Shard::LongI32(s) => s.get(slot).map(|v| Value::Long(i64::from(v))),
            Shard::LongI64(s) => s.get(slot).map(Value::Long),
            Shard::IntI16(s) => s.get(slot).map(|v| Value::Int(i32::from(v))),
            Shard::IntI32(s) => s.get(slot).map(Value::Int),
            Shard::DoubleHalf(s) => s.get(slot).map(|v| Value::Double(decode_half(v))),
            Shard::DoubleF64(s) => s.get(slot).map(Value::Double),
            Shard::Object(s) => s.data.get(slot).cloned().flatten(),
        }
    }

    /// Reads an integer slot without boxing; `None` for absent slots and for
    /// non-integer families.
    pub fn get_long(&self, slot: usize) -> Option<i64> {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.get(slot).map(i64::from),
            Shard::LongI32(s) | Shard::IntI32(s) => s.get(slot).map(i64::from),
            Shard::LongI64(s) => s.get(slot),
            _ => None,
        }
    }

    /// Reads a numeric slot as `f64`; `None` for absent slots and for object
    /// shards.
    pub fn get_f64(&self, slot: usize) -> Option<f64> {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.get(slot).map(f64::from),
            Shard::LongI32(s) | Shard::IntI32(s) => s.get(slot).map(f64::from),
            Shard::LongI64(s) => s.get(slot).map(|v| v as f64),
            Shard::DoubleHalf(s) => s.get(slot).map(decode_half),
            Shard::DoubleF64(s) => s.get(slot),
            Shard::Object(_) => None,
        }
    }

    fn mismatch(&self, value: &Value) -> ShardError {
        TypeMismatchError { value: value.clone(), shard: self.encoding().name() }.into()
    }

    fn unrepresentable(&self, value: &Value) -> ShardError {
        UnrepresentableValueError { value: value.clone(), shard: self.encoding().name() }.into()
    }

    /// Returns a wider shard able to hold `candidate`, or `Ok(None)` when this
    /// shard can already represent it (absent candidates always fit).
    ///
    /// The returned shard is a faithful copy: same size, same values, same
    /// presence bits.
    ///
    /// # Errors
    /// [`ShardError::TypeMismatch`] if the candidate belongs to another family.

    pub fn adapt(&self, candidate: Option<&Value>) -> Result<Option<Shard>, ShardError> {
        let Some(value) = candidate else { return Ok(None) };
        if !self.family().accepts(value) {
            return Err(self.mismatch(value));
        }

        let wider = match (self, value) {
            (Shard::LongI16(s), Value::Long(v)) => {
                if i16::try_from(*v).is_ok() {
                    None
                } else if i32::try_from(*v).is_ok() {
                    Some(Shard::LongI32(s.widen(i32::from)))
                } else {
                    Some(Shard::LongI64(s.widen(i64::from)))
                }
            }
            (Shard::LongI32(s), Value::Long(v)) => {
                if i32::try_from(*v).is_ok() {
                    None
                } else {
                    Some(Shard::LongI64(s.widen(i64::from)))
                }
            }
            (Shard::IntI16(s), Value::Int(v)) => {
                if i16::try_from(*v).is_ok() {
                    None
                } else {
                    Some(Shard::IntI32(s.widen(i32::from)))
                }
            }
            (Shard::DoubleHalf(s), Value::Double(v)) => {
                if encode_half(*v).is_some() {
                    None
                } else {
                    Some(Shard::DoubleF64(s.widen(decode_half)))
                }
            }
            _ => None,
        };

        if let Some(shard) = &wider {
            trace!(
                from = self.encoding().name(),
                to = shard.encoding().name(),
                slots = self.len(),
                "promoting shard"
            );
        }
        Ok(wider)
    }

    /// Writes `value` into `slot`; `None` clears the slot.
    ///
    /// # Errors
    /// - [`ShardError::TypeMismatch`] for a value of another family,
    /// - [`ShardError::Unrepresentable`] when the value needs [`Shard::adapt`] first,
    /// - [`ShardError::SlotOutOfRange`] for `slot >= SHARD_SIZE`.

    pub fn put(&mut self, slot: usize, value: Option<&Value>) -> Result<(), ShardError> {
        let Some(value) = value else { return self.clear(slot) };
        if !self.family().accepts(value) {
            return Err(self.mismatch(value));
        }

        // `None` means the value needs a wider encoding.
        let written = match (&mut *self, value) {
            (Shard::LongI16(s), Value::Long(v)) => i16::try_from(*v).ok().map(|v| s.put(slot, v)),
            (Shard::LongI32(s), Value::Long(v)) => i32::try_from(*v).ok().map(|v| s.put(slot, v)),
            (Shard::LongI64(s), Value::Long(v)) => Some(s.put(slot, *v)),
            (Shard::IntI16(s), Value::Int(v)) => i16::try_from(*v).ok().map(|v| s.put(slot, v)),
            (Shard::IntI32(s), Value::Int(v)) => Some(s.put(slot, *v)),
            (Shard::DoubleHalf(s), Value::Double(v)) => encode_half(*v).map(|v| s.put(slot, v)),
            (Shard::DoubleF64(s), Value::Double(v)) => Some(s.put(slot, *v)),
            (Shard::Object(s), _) => Some(s.put(slot, Some(value.clone()))),
            _ => None,
        };
        match written {
            Some(result) => result?,
            None => return Err(self.unrepresentable(value)),
        }
        Ok(())
    }

    /// Marks `slot` absent, extending the size to cover it if needed.
    pub fn clear(&mut self, slot: usize) -> Result<(), ShardError> {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.clear(slot)?,
            Shard::LongI32(s) | Shard::IntI32(s) => s.clear(slot)?,
            Shard::LongI64(s) => s.clear(slot)?,
            Shard::DoubleHalf(s) => s.clear(slot)?,
            Shard::DoubleF64(s) => s.clear(slot)?,
            Shard::Object(s) => s.put(slot, None)?,
        }
        Ok(())
    }

    /// Shrinks backing storage to exactly the written size.
    pub fn compact(&mut self) {
        match self {
            Shard::LongI16(s) | Shard::IntI16(s) => s.compact(),
            Shard::LongI32(s) | Shard::IntI32(s) => s.compact(),
            Shard::LongI64(s) => s.compact(),
            Shard::DoubleHalf(s) => s.compact(),
            Shard::DoubleF64(s) => s.compact(),
            Shard::Object(s) => s.data.shrink_to_fit(),
        }
    }

    /// Iterates over every slot in order, yielding `None` for absent slots.
    pub fn iter(&self) -> impl Iterator<Item = Option<Value>> + '_ {
        (0..self.len()).map(move |slot| self.get(slot))
    }
}
