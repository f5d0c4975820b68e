//! Field operation set and compound marshallers (spec §4.4-§4.8).
//!
//! [`WireMarshal`]/[`WireUnmarshal`] are whole-value traits: every scalar,
//! `String`, slice, map, pointer and registered struct implements them, and
//! they're what a generic context (a slice element, a map value, a pointer
//! target, an `Any` payload) encodes through.
//!
//! Fixed-vs-compact width selection (spec §4.4) is a property of how a
//! *struct field* is attributed, not of the Rust type, so it can't be
//! expressed as competing trait impls on `u32` itself without wrapper types
//! the generated code would just have to unwrap again. `tagwire-macro`
//! instead calls the raw `ops` helpers below directly when laying out a
//! struct's fields; the blanket impls here are the default (compact for
//! multi-byte ints, fixed for 8-bit and floats) used everywhere else:
//! slice elements, map keys/values, pointer targets, `Any` payloads.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::registry::{ErasedValue, Registry, TypeId};
use crate::value::{ToValue, ToValueKey, Value, ValueKey};
use crate::varint::{size_uvarint, size_varint};

/// Associates a Rust type with its wire TypeID, the way `tagwire-macro`
/// generates it for every `#[tagwire::wire(type_id = ..)]` struct.
pub trait GobType {
    const TYPE_ID: TypeId;
    const TYPE_NAME: &'static str;
}

/// Declares a `TypeId` constant for a type without pulling in the full
/// attribute macro. Handy for scalar wrappers and tests.
#[macro_export]
macro_rules! define_type_id {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::marshal::GobType for $ty {
            const TYPE_ID: $crate::registry::TypeId = $id;
            const TYPE_NAME: &'static str = $name;
        }
    };
}

/// A value that knows its own encoded length and can write its body (no
/// TypeID, no framing — callers that need that wrap this).
pub trait WireMarshal {
    fn wire_size(&self) -> usize;
    fn write_body(&self, w: &mut Writer);
}

pub trait WireUnmarshal: Sized {
    fn read_body(r: &mut Reader) -> Result<Self>;
}

/// Whether a value is the zero value for its type, used by struct encoding
/// to skip fields that would just be reconstructed as zero on decode.
pub trait IsZero {
    fn is_zero(&self) -> bool;
}

/// Raw field operations the attribute macro dispatches to directly, keyed by
/// the field's declared width and its `fixed`/compact choice rather than by
/// Rust type identity.
pub mod ops {
    use super::*;

    pub fn size_fixed16(_: u16) -> usize {
        2
    }
    pub fn write_fixed_u16(w: &mut Writer, v: u16) {
        w.u16(v);
    }
    pub fn read_fixed_u16(r: &mut Reader) -> Result<u16> {
        r.u16()
    }
    pub fn write_fixed_i16(w: &mut Writer, v: i16) {
        w.i16(v);
    }
    pub fn read_fixed_i16(r: &mut Reader) -> Result<i16> {
        r.i16()
    }

    pub fn size_fixed32(_: u32) -> usize {
        4
    }
    pub fn write_fixed_u32(w: &mut Writer, v: u32) {
        w.u32(v);
    }
    pub fn read_fixed_u32(r: &mut Reader) -> Result<u32> {
        r.u32()
    }
    pub fn write_fixed_i32(w: &mut Writer, v: i32) {
        w.i32(v);
    }
    pub fn read_fixed_i32(r: &mut Reader) -> Result<i32> {
        r.i32()
    }

    pub fn size_fixed64(_: u64) -> usize {
        8
    }
    pub fn write_fixed_u64(w: &mut Writer, v: u64) {
        w.u64(v);
    }
    pub fn read_fixed_u64(r: &mut Reader) -> Result<u64> {
        r.u64()
    }
    pub fn write_fixed_i64(w: &mut Writer, v: i64) {
        w.i64(v);
    }
    pub fn read_fixed_i64(r: &mut Reader) -> Result<i64> {
        r.i64()
    }

    pub fn size_compact_u16(v: u16) -> usize {
        size_uvarint(v as u64)
    }
    pub fn write_compact_u16(w: &mut Writer, v: u16) {
        w.varuint(v as u64);
    }
    pub fn read_compact_u16(r: &mut Reader) -> Result<u16> {
        Ok(r.varuint()? as u16)
    }
    pub fn size_compact_i16(v: i16) -> usize {
        size_varint(v as i64)
    }
    pub fn write_compact_i16(w: &mut Writer, v: i16) {
        w.varint(v as i64);
    }
    pub fn read_compact_i16(r: &mut Reader) -> Result<i16> {
        Ok(r.varint()? as i16)
    }

    pub fn size_compact_u32(v: u32) -> usize {
        size_uvarint(v as u64)
    }
    pub fn write_compact_u32(w: &mut Writer, v: u32) {
        w.varuint(v as u64);
    }
    pub fn read_compact_u32(r: &mut Reader) -> Result<u32> {
        Ok(r.varuint()? as u32)
    }
    pub fn size_compact_i32(v: i32) -> usize {
        size_varint(v as i64)
    }
    pub fn write_compact_i32(w: &mut Writer, v: i32) {
        w.varint(v as i64);
    }
    pub fn read_compact_i32(r: &mut Reader) -> Result<i32> {
        Ok(r.varint()? as i32)
    }

    pub fn size_compact_u64(v: u64) -> usize {
        size_uvarint(v)
    }
    pub fn write_compact_u64(w: &mut Writer, v: u64) {
        w.varuint(v);
    }
    pub fn read_compact_u64(r: &mut Reader) -> Result<u64> {
        r.varuint()
    }
    pub fn size_compact_i64(v: i64) -> usize {
        size_varint(v)
    }
    pub fn write_compact_i64(w: &mut Writer, v: i64) {
        w.varint(v);
    }
    pub fn read_compact_i64(r: &mut Reader) -> Result<i64> {
        r.varint()
    }

    /// 8-bit widths have no compact form; this is the only operation either
    /// width offers.
    pub fn write_byte(w: &mut Writer, v: u8) {
        w.u8(v);
    }
    pub fn read_byte(r: &mut Reader) -> Result<u8> {
        r.u8()
    }
}

impl WireMarshal for bool {
    fn wire_size(&self) -> usize {
        1
    }
    fn write_body(&self, w: &mut Writer) {
        w.u8(if *self { 1 } else { 0 });
    }
}
impl WireUnmarshal for bool {
    fn read_body(r: &mut Reader) -> Result<Self> {
        Ok(r.u8()? != 0)
    }
}
impl IsZero for bool {
    fn is_zero(&self) -> bool {
        !*self
    }
}

impl WireMarshal for u8 {
    fn wire_size(&self) -> usize {
        1
    }
    fn write_body(&self, w: &mut Writer) {
        w.u8(*self);
    }
}
impl WireUnmarshal for u8 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        r.u8()
    }
}
impl IsZero for u8 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for i8 {
    fn wire_size(&self) -> usize {
        1
    }
    fn write_body(&self, w: &mut Writer) {
        w.i8(*self);
    }
}
impl WireUnmarshal for i8 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        r.i8()
    }
}
impl IsZero for i8 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for u16 {
    fn wire_size(&self) -> usize {
        size_uvarint(*self as u64)
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(*self as u64);
    }
}
impl WireUnmarshal for u16 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        Ok(r.varuint()? as u16)
    }
}
impl IsZero for u16 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for i16 {
    fn wire_size(&self) -> usize {
        size_varint(*self as i64)
    }
    fn write_body(&self, w: &mut Writer) {
        w.varint(*self as i64);
    }
}
impl WireUnmarshal for i16 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        Ok(r.varint()? as i16)
    }
}
impl IsZero for i16 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for u32 {
    fn wire_size(&self) -> usize {
        size_uvarint(*self as u64)
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(*self as u64);
    }
}
impl WireUnmarshal for u32 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        Ok(r.varuint()? as u32)
    }
}
impl IsZero for u32 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for i32 {
    fn wire_size(&self) -> usize {
        size_varint(*self as i64)
    }
    fn write_body(&self, w: &mut Writer) {
        w.varint(*self as i64);
    }
}
impl WireUnmarshal for i32 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        Ok(r.varint()? as i32)
    }
}
impl IsZero for i32 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for u64 {
    fn wire_size(&self) -> usize {
        size_uvarint(*self)
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(*self);
    }
}
impl WireUnmarshal for u64 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        r.varuint()
    }
}
impl IsZero for u64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for i64 {
    fn wire_size(&self) -> usize {
        size_varint(*self)
    }
    fn write_body(&self, w: &mut Writer) {
        w.varint(*self);
    }
}
impl WireUnmarshal for i64 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        r.varint()
    }
}
impl IsZero for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl WireMarshal for f32 {
    fn wire_size(&self) -> usize {
        4
    }
    fn write_body(&self, w: &mut Writer) {
        w.f32(*self);
    }
}
impl WireUnmarshal for f32 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        r.f32()
    }
}
impl IsZero for f32 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl WireMarshal for f64 {
    fn wire_size(&self) -> usize {
        8
    }
    fn write_body(&self, w: &mut Writer) {
        w.f64(*self);
    }
}
impl WireUnmarshal for f64 {
    fn read_body(r: &mut Reader) -> Result<Self> {
        r.f64()
    }
}
impl IsZero for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl WireMarshal for String {
    fn wire_size(&self) -> usize {
        size_uvarint(self.len() as u64) + self.len()
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(self.len() as u64);
        w.string(self);
    }
}
impl WireUnmarshal for String {
    fn read_body(r: &mut Reader) -> Result<Self> {
        let len = r.varuint()? as usize;
        r.string(len)
    }
}
impl IsZero for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}
impl ToValueKey for bool {
    fn to_value_key(&self) -> ValueKey {
        ValueKey::Bool(*self)
    }
}

macro_rules! to_value_int {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }
            impl ToValueKey for $ty {
                fn to_value_key(&self) -> ValueKey {
                    ValueKey::Int(*self as i64)
                }
            }
        )*
    };
}
to_value_int!(i8, i16, i32, i64);

macro_rules! to_value_uint {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Uint(*self as u64)
                }
            }
            impl ToValueKey for $ty {
                fn to_value_key(&self) -> ValueKey {
                    ValueKey::Uint(*self as u64)
                }
            }
        )*
    };
}
to_value_uint!(u8, u16, u32, u64);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }
}
impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}
impl ToValueKey for String {
    fn to_value_key(&self) -> ValueKey {
        ValueKey::String(self.clone())
    }
}

/// Slice marshaller (spec §4.6): `varuint(len)` followed by each element's
/// body, back to back with no per-element framing. `Vec<u8>` goes through
/// this same generic path (`u8`'s body write is exactly one raw byte, so the
/// result is identical to a dedicated byte-run fast path).
impl<T> WireMarshal for Vec<T>
where
    T: WireMarshal,
{
    fn wire_size(&self) -> usize {
        size_uvarint(self.len() as u64) + self.iter().map(WireMarshal::wire_size).sum::<usize>()
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(self.len() as u64);
        for item in self {
            item.write_body(w);
        }
    }
}

impl<T> WireUnmarshal for Vec<T>
where
    T: WireUnmarshal,
{
    fn read_body(r: &mut Reader) -> Result<Self> {
        let len = r.varuint()? as usize;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(T::read_body(r)?);
        }
        Ok(out)
    }
}

impl<T> IsZero for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T> ToValue for Vec<T>
where
    T: ToValue,
{
    fn to_value(&self) -> Value {
        Value::Slice(self.iter().map(ToValue::to_value).collect())
    }
}

/// Pointer marshaller (spec §4.7): a one-byte null/present tag, then the
/// inlined value when present.
impl<T> WireMarshal for Option<Box<T>>
where
    T: WireMarshal,
{
    fn wire_size(&self) -> usize {
        1 + self.as_ref().map_or(0, |v| v.wire_size())
    }
    fn write_body(&self, w: &mut Writer) {
        match self {
            None => w.u8(0),
            Some(v) => {
                w.u8(1);
                v.write_body(w);
            }
        }
    }
}

impl<T> WireUnmarshal for Option<Box<T>>
where
    T: WireUnmarshal,
{
    fn read_body(r: &mut Reader) -> Result<Self> {
        match r.u8()? {
            0 => Ok(None),
            _ => Ok(Some(Box::new(T::read_body(r)?))),
        }
    }
}

impl<T> IsZero for Option<Box<T>> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T> ToValue for Option<Box<T>>
where
    T: ToValue,
{
    fn to_value(&self) -> Value {
        match self {
            None => Value::Nil,
            Some(v) => v.to_value(),
        }
    }
}

impl<K, V> WireMarshal for BTreeMap<K, V>
where
    K: WireMarshal,
    V: WireMarshal,
{
    fn wire_size(&self) -> usize {
        size_uvarint(self.len() as u64)
            + self
                .iter()
                .map(|(k, v)| k.wire_size() + v.wire_size())
                .sum::<usize>()
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(self.len() as u64);
        for (k, v) in self {
            k.write_body(w);
            v.write_body(w);
        }
    }
}

impl<K, V> WireUnmarshal for BTreeMap<K, V>
where
    K: WireUnmarshal + Ord,
    V: WireUnmarshal,
{
    fn read_body(r: &mut Reader) -> Result<Self> {
        let len = r.varuint()? as usize;
        let mut out = BTreeMap::new();
        for _ in 0..len {
            let k = K::read_body(r)?;
            let v = V::read_body(r)?;
            out.insert(k, v);
        }
        Ok(out)
    }
}

impl<K, V> IsZero for BTreeMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> ToValue for BTreeMap<K, V>
where
    K: ToValueKey,
    V: ToValue,
{
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value_key(), v.to_value()))
                .collect(),
        )
    }
}

impl<K, V> WireMarshal for HashMap<K, V>
where
    K: WireMarshal,
    V: WireMarshal,
{
    fn wire_size(&self) -> usize {
        size_uvarint(self.len() as u64)
            + self
                .iter()
                .map(|(k, v)| k.wire_size() + v.wire_size())
                .sum::<usize>()
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(self.len() as u64);
        for (k, v) in self {
            k.write_body(w);
            v.write_body(w);
        }
    }
}

impl<K, V> WireUnmarshal for HashMap<K, V>
where
    K: WireUnmarshal + std::hash::Hash + Eq,
    V: WireUnmarshal,
{
    fn read_body(r: &mut Reader) -> Result<Self> {
        let len = r.varuint()? as usize;
        let mut out = HashMap::with_capacity(len);
        for _ in 0..len {
            let k = K::read_body(r)?;
            let v = V::read_body(r)?;
            out.insert(k, v);
        }
        Ok(out)
    }
}

impl<K, V> IsZero for HashMap<K, V> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> ToValue for HashMap<K, V>
where
    K: ToValueKey,
    V: ToValue,
{
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_value_key(), v.to_value()))
                .collect(),
        )
    }
}

/// Polymorphic ("Any"/interface) field wrapper (spec §4.8): a `varuint`
/// TypeID followed by the body the registered plan for that id writes.
pub struct Any(pub Box<dyn ErasedValue>);

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Any").field(&self.0).finish()
    }
}

impl Any {
    /// Wraps `value` for use in a polymorphic field. Fails with
    /// `Error::NotRegistered` if `T`'s TypeID hasn't been registered yet: an
    /// `Any` can only ever hold a payload whose TypeID a reader will be able
    /// to look up again, so the check happens once here rather than on every
    /// write.
    pub fn new<T>(value: T) -> Result<Self>
    where
        T: ErasedValue + 'static,
    {
        let id = value.erased_type_id();
        if !Registry::global().is_registered(id) {
            return Err(Error::NotRegistered(id));
        }
        Ok(Any(Box::new(value)))
    }

    pub fn type_id(&self) -> TypeId {
        self.0.erased_type_id()
    }
}

impl WireMarshal for Any {
    fn wire_size(&self) -> usize {
        size_uvarint(self.0.erased_type_id()) + self.0.erased_wire_size()
    }
    fn write_body(&self, w: &mut Writer) {
        w.varuint(self.0.erased_type_id());
        self.0.erased_write_body(w);
    }
}

impl IsZero for Any {
    fn is_zero(&self) -> bool {
        false
    }
}

/// There's no compiled plan available for an erased payload's concrete type
/// here, so this re-serializes the payload's body and reports it as raw
/// bytes under its TypeID rather than walking its fields the way a
/// `#[tagwire::wire]` struct's own `ToValue` impl does.
impl ToValue for Any {
    fn to_value(&self) -> Value {
        let mut w = Writer::with_size(self.0.erased_wire_size());
        self.0.erased_write_body(&mut w);
        Value::Any(self.0.erased_type_id(), Box::new(Value::Bytes(w.into_bytes())))
    }
}

/// `Any` has no static `WireUnmarshal` impl: decoding it requires a TypeID
/// lookup against a [`Registry`], which isn't available from a bare `Reader`.
/// Struct codegen for a polymorphic field calls this directly instead of
/// going through the `WireUnmarshal` trait.
pub fn read_any(r: &mut Reader, registry: &Registry) -> Result<Any> {
    let id = r.varuint()?;
    let value = registry.decode(id, r)?;
    Ok(Any(value))
}

/// [`read_any`] against the process-wide [`Registry::global`]. What
/// `tagwire-macro` calls for a `#[wire(id = .., any)]` field, since generated
/// `read_body` methods only take a `Reader`.
pub fn read_any_global(r: &mut Reader) -> Result<Any> {
    read_any(r, Registry::global())
}
