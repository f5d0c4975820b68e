//! A tagged, self-describing binary serialization engine tuned for
//! skewed-small values: most integers encode in one byte, strings and
//! slices carry no padding, and every payload is framed behind a TypeID so
//! a reader never needs an out-of-band schema to find where one value ends
//! and the next begins.
//!
//! Wire primitives live in [`varint`] and [`cursor`]; [`prefixer`] frames
//! raw byte runs for callers with no structure of their own. [`marshal`]
//! holds the field operation set and the compound marshallers (pointers,
//! slices, maps, polymorphic `Any` values) built on top of it — most of
//! these are implemented once here as blanket impls and never need to be
//! touched by generated code. [`registry`] is the one genuinely dynamic
//! piece: a process-wide TypeID table used for polymorphic fields and for
//! decoding an envelope whose payload type isn't known ahead of time.
//! [`envelope`] is the top-level `marshal`/`unmarshal` entry point.
//!
//! `#[tagwire::wire(type_id = N)]` is the usual way to implement
//! [`marshal::GobType`]/[`marshal::WireMarshal`]/[`marshal::WireUnmarshal`]
//! for a struct — see `tagwire_macro::wire` for its field attributes.

// Lets `tagwire-macro`'s generated `::tagwire::...` paths resolve whether
// the attribute is used downstream or on a type defined inside this crate's
// own tests.
extern crate self as tagwire;

pub mod cursor;
pub mod envelope;
pub mod error;
pub mod marshal;
pub mod prefixer;
pub mod registry;
pub mod varint;
pub mod value;

pub use envelope::{marshal, unmarshal, unmarshal_any};
pub use error::{Error, Result};
pub use marshal::{Any, GobType, IsZero, WireMarshal, WireUnmarshal};
pub use registry::{Registry, TypeId};
pub use value::Value;

pub use tagwire_macro::wire;
