//! Tagged, self-describing envelope (spec §4.9): `varuint(TypeID)` followed
//! by the payload the TypeID's compiled plan writes.
//!
//! The typed [`marshal`]/[`unmarshal`] pair is for the common case, where
//! the caller already knows which type it expects back and just wants the
//! TypeID checked rather than dispatched on. [`unmarshal_any`] is for the
//! genuinely dynamic case — reading an envelope whose payload type is only
//! known by whatever TypeID turns out to be on the wire — and goes through
//! the global [`Registry`].

use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::marshal::{Any, GobType, WireMarshal, WireUnmarshal};
use crate::registry::Registry;
use crate::varint::size_uvarint;

/// Encodes `value` as a complete envelope: TypeID prefix plus body.
pub fn marshal<T>(value: &T) -> Vec<u8>
where
    T: GobType + WireMarshal,
{
    let size = size_uvarint(T::TYPE_ID) + value.wire_size();
    let mut w = Writer::with_size(size);
    w.varuint(T::TYPE_ID);
    value.write_body(&mut w);
    w.into_bytes()
}

/// Decodes an envelope, requiring its TypeID to match `T::TYPE_ID` exactly.
/// A mismatched TypeID is always an error: it is never coerced, since the
/// only thing a TypeID mismatch safely tells the caller is that it asked
/// for the wrong type.
pub fn unmarshal<T>(data: &[u8]) -> Result<T>
where
    T: GobType + WireUnmarshal,
{
    let mut r = Reader::new(data);
    let id = r.varuint()?;
    if id != T::TYPE_ID {
        return Err(Error::TypeMismatch {
            expected: T::TYPE_ID,
            got: id,
        });
    }
    T::read_body(&mut r)
}

/// Decodes an envelope whose payload type is resolved dynamically from the
/// global [`Registry`] by the TypeID actually present on the wire.
pub fn unmarshal_any(data: &[u8]) -> Result<Any> {
    let mut r = Reader::new(data);
    let id = r.varuint()?;
    let value = Registry::global().decode(id, &mut r)?;
    Ok(Any(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[derive(Debug, PartialEq)]
    struct Greeting(String);

    impl GobType for Greeting {
        const TYPE_ID: registry::TypeId = 42;
        const TYPE_NAME: &'static str = "envelope::tests::Greeting";
    }

    impl WireMarshal for Greeting {
        fn wire_size(&self) -> usize {
            self.0.wire_size()
        }
        fn write_body(&self, w: &mut Writer) {
            self.0.write_body(w);
        }
    }

    impl WireUnmarshal for Greeting {
        fn read_body(r: &mut Reader) -> Result<Self> {
            Ok(Greeting(String::read_body(r)?))
        }
    }

    #[test]
    fn typed_roundtrip() {
        let g = Greeting("hello".to_string());
        let bytes = marshal(&g);
        let back: Greeting = unmarshal(&bytes).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn typed_mismatch_errors() {
        #[derive(Debug)]
        struct Other;
        impl GobType for Other {
            const TYPE_ID: registry::TypeId = 43;
            const TYPE_NAME: &'static str = "envelope::tests::Other";
        }
        impl WireUnmarshal for Other {
            fn read_body(_: &mut Reader) -> Result<Self> {
                Ok(Other)
            }
        }

        let bytes = marshal(&Greeting("x".to_string()));
        let err = unmarshal::<Other>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: 43,
                got: 42
            }
        ));
    }

    #[test]
    fn dynamic_roundtrip_via_registry() {
        registry::register::<Greeting>().unwrap();
        let bytes = marshal(&Greeting("dyn".to_string()));
        let any = unmarshal_any(&bytes).unwrap();
        assert_eq!(any.type_id(), 42);
    }
}
