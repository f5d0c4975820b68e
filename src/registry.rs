//! Runtime TypeID registry (spec §5).
//!
//! Per-type wire plans are generated at compile time by the `tagwire-macro`
//! attribute; nothing here walks a type's structure. What remains genuinely
//! dynamic, and so genuinely needs a runtime table, is TypeID dispatch: the
//! envelope's outer `marshal`/`unmarshal` and polymorphic (`Any`) fields both
//! need to go from a TypeID on the wire to "which compiled plan do I run".
//!
//! One process-wide [`Registry`] backs both. Types normally register once via
//! `tagwire_macro`-generated `inventory`-free static registration calls, or
//! explicitly through [`register`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::marshal::{GobType, WireMarshal, WireUnmarshal};
use crate::value::{ToValue, Value};

/// Wire identifier for a registered type. Assigned by spec authors, not
/// derived from any Rust-side type identity.
pub type TypeId = u64;

/// Type-erased handle to a registered value, used for polymorphic fields and
/// the envelope's top-level payload.
pub trait ErasedValue: fmt::Debug {
    fn erased_type_id(&self) -> TypeId;
    fn erased_wire_size(&self) -> usize;
    fn erased_write_body(&self, w: &mut Writer);
}

impl<T> ErasedValue for T
where
    T: GobType + WireMarshal + fmt::Debug,
{
    fn erased_type_id(&self) -> TypeId {
        T::TYPE_ID
    }

    fn erased_wire_size(&self) -> usize {
        self.wire_size()
    }

    fn erased_write_body(&self, w: &mut Writer) {
        self.write_body(w)
    }
}

type DecodeFn = fn(&mut Reader) -> Result<Box<dyn ErasedValue>>;
type DecodeValueFn = fn(&mut Reader) -> Result<Value>;

struct Entry {
    name: &'static str,
    decode: DecodeFn,
    decode_value: DecodeValueFn,
}

/// The process-wide TypeID table.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<TypeId, Entry>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::default)
    }

    /// Registers `T` under its `GobType::TYPE_ID`. Re-registering the same
    /// type (same id, same name) is a harmless no-op; a different type
    /// claiming an already-taken id is an error.
    pub fn register<T>(&self) -> Result<()>
    where
        T: GobType + WireUnmarshal + ErasedValue + ToValue + 'static,
    {
        let id = T::TYPE_ID;
        let name = T::TYPE_NAME;
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if let Some(existing) = entries.get(&id) {
            if existing.name != name {
                return Err(Error::RedefinedType(id));
            }
            tracing::debug!(type_id = id, name, "type already registered");
            return Ok(());
        }
        tracing::debug!(type_id = id, name, "registering type");
        entries.insert(
            id,
            Entry {
                name,
                decode: |r| {
                    let v = T::read_body(r)?;
                    Ok(Box::new(v) as Box<dyn ErasedValue>)
                },
                decode_value: |r| {
                    let v = T::read_body(r)?;
                    Ok(v.to_value())
                },
            },
        );
        Ok(())
    }

    /// Looks up `id` and decodes a body from `r` through the registered plan.
    pub fn decode(&self, id: TypeId, r: &mut Reader) -> Result<Box<dyn ErasedValue>> {
        let decode = {
            let entries = self.entries.read().expect("registry lock poisoned");
            match entries.get(&id) {
                Some(e) => e.decode,
                None => {
                    tracing::warn!(type_id = id, "unknown type id during decode");
                    return Err(Error::UnknownType(id));
                }
            }
        };
        decode(r)
    }

    /// Looks up `id` and decodes a body from `r` straight into a [`Value`],
    /// for callers with no compiled plan for the concrete type on hand.
    pub fn decode_value(&self, id: TypeId, r: &mut Reader) -> Result<Value> {
        let decode_value = {
            let entries = self.entries.read().expect("registry lock poisoned");
            match entries.get(&id) {
                Some(e) => e.decode_value,
                None => {
                    tracing::warn!(type_id = id, "unknown type id during decode");
                    return Err(Error::UnknownType(id));
                }
            }
        };
        decode_value(r)
    }

    pub fn name_of(&self, id: TypeId) -> Option<&'static str> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .map(|e| e.name)
    }

    pub fn is_registered(&self, id: TypeId) -> bool {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .contains_key(&id)
    }
}

/// Registers `T` with the global registry. Called by `tagwire_macro`-derived
/// `register()` functions, or directly for types assembled by hand.
pub fn register<T>() -> Result<()>
where
    T: GobType + WireUnmarshal + ErasedValue + ToValue + 'static,
{
    Registry::global().register::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as WireResult;

    #[derive(Debug, PartialEq, Eq)]
    struct Ping(u64);

    impl GobType for Ping {
        const TYPE_ID: TypeId = 900;
        const TYPE_NAME: &'static str = "registry::tests::Ping";
    }

    impl WireMarshal for Ping {
        fn wire_size(&self) -> usize {
            crate::varint::size_uvarint(self.0)
        }
        fn write_body(&self, w: &mut Writer) {
            w.varuint(self.0);
        }
    }

    impl WireUnmarshal for Ping {
        fn read_body(r: &mut Reader) -> WireResult<Self> {
            Ok(Ping(r.varuint()?))
        }
    }

    impl ToValue for Ping {
        fn to_value(&self) -> Value {
            Value::Uint(self.0)
        }
    }

    #[test]
    fn register_then_decode_by_id() {
        let reg = Registry::default();
        reg.register::<Ping>().unwrap();
        assert!(reg.is_registered(900));

        let mut w = Writer::with_size(crate::varint::size_uvarint(42));
        w.varuint(42);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);

        let decoded = reg.decode(900, &mut r).unwrap();
        assert_eq!(decoded.erased_type_id(), 900);
    }

    #[test]
    fn decode_value_by_id() {
        let reg = Registry::default();
        reg.register::<Ping>().unwrap();

        let mut w = Writer::with_size(crate::varint::size_uvarint(42));
        w.varuint(42);
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);

        assert_eq!(reg.decode_value(900, &mut r).unwrap(), Value::Uint(42));
    }

    #[test]
    fn double_register_same_type_is_noop() {
        let reg = Registry::default();
        reg.register::<Ping>().unwrap();
        reg.register::<Ping>().unwrap();
    }

    #[test]
    fn decode_unknown_id_errors() {
        let reg = Registry::default();
        let bytes = Vec::new();
        let mut r = Reader::new(&bytes);
        let err = reg.decode(123456, &mut r).unwrap_err();
        assert!(matches!(err, Error::UnknownType(123456)));
    }
}
