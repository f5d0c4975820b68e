//! Untyped diagnostic value.
//!
//! The core codec never produces or consumes a [`Value`] on its own; a
//! registered type reaches it through [`ToValue`], implemented on every
//! scalar, slice, map, pointer and `#[tagwire::wire]`-compiled struct. It
//! exists for tooling that wants to poke at an envelope's payload without a
//! compiled plan for the concrete type on hand (a dump tool, a test
//! assertion, a log line). It mirrors the wire's own shape rather than
//! trying to be a general-purpose JSON-like value.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::registry::{Registry, TypeId};
use crate::cursor::Reader;

/// An untyped view of a decoded value, structured the way the wire format
/// itself is structured (scalar, bytes, slice, map, struct-as-fields) rather
/// than coerced into a generic data-interchange shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    Slice(Vec<Value>),
    Map(BTreeMap<ValueKey, Value>),
    /// A struct's fields as `(FieldID, value)` pairs, in wire order.
    Struct(Vec<(u64, Value)>),
    /// A polymorphic field's payload, tagged with the TypeID it was read
    /// back as.
    Any(u64, Box<Value>),
    Nil,
}

/// Map keys need a total order to live in a `BTreeMap`; this covers the
/// scalar kinds the wire format allows as a map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

/// Converts an already-decoded value to its untyped [`Value`] view. Every
/// scalar, `String`, `Vec<T>`, `Option<Box<T>>`, map and `#[tagwire::wire]`
/// struct implements this; it never reads from the wire itself, it just
/// restates a value that `WireUnmarshal::read_body` already produced.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Converts an already-decoded map key to its [`ValueKey`] view, the way
/// [`ToValue`] does for values.
pub trait ToValueKey {
    fn to_value_key(&self) -> ValueKey;
}

/// Decodes `id`'s registered payload from `r` through that type's own wire
/// plan, then converts the result to a [`Value`]. The framing (which bytes
/// belong to which field, fixed vs compact widths) still comes entirely from
/// the registered type's `WireUnmarshal::read_body` — this just restates the
/// result untyped, for a caller with no compiled plan for that TypeID on
/// hand.
pub fn decode(id: TypeId, r: &mut Reader) -> Result<Value> {
    Registry::global().decode_value(id, r)
}

/// [`decode`] for a full envelope buffer: reads the leading TypeID varuint,
/// then dispatches on it.
pub fn decode_envelope(data: &[u8]) -> Result<Value> {
    let mut r = Reader::new(data);
    let id = r.varuint()?;
    decode(id, &mut r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_field_lookup() {
        let v = Value::Struct(vec![(1, Value::String("a".into())), (3, Value::Int(-7))]);
        if let Value::Struct(fields) = &v {
            let found = fields.iter().find(|(id, _)| *id == 3).map(|(_, v)| v);
            assert_eq!(found.and_then(Value::as_i64), Some(-7));
        } else {
            panic!("expected struct");
        }
    }

    #[tagwire::wire(type_id = 950)]
    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        #[wire(id = 1)]
        name: String,
        #[wire(id = 2)]
        count: i64,
    }

    #[test]
    fn decode_envelope_restates_registered_struct() {
        Sample::register().unwrap();
        let s = Sample {
            name: "x".to_string(),
            count: 5,
        };
        let bytes = crate::envelope::marshal(&s);

        let value = decode_envelope(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Struct(vec![(1, Value::String("x".to_string())), (2, Value::Int(5))])
        );
    }
}
