//! Failure semantics for encode/decode paths (spec §7).
//!
//! Write paths only fail on programmer misuse (a size miscalculation, or
//! an unregistered polymorphic payload). Read paths fail on truncation,
//! unknown ids, illegal tags, or buffer overrun. Nothing here is retried;
//! a failure is final and propagates to the caller.

use crate::registry::TypeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of buffer")]
    UnexpectedEnd,

    #[error("unknown type id {0}")]
    UnknownType(TypeId),

    #[error("envelope type id mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: TypeId, got: TypeId },

    #[error("unknown field id {field_id} for type {type_id}")]
    UnknownField { type_id: TypeId, field_id: u64 },

    #[error("corrupt pointer tag byte {0:#04x}")]
    CorruptPointerTag(u8),

    #[error("prefixer size mismatch: expected {expected} runs, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("type id {0} redefined")]
    RedefinedType(TypeId),

    #[error("field id {field_id} redefined on type {type_id}")]
    RedefinedField { type_id: TypeId, field_id: u64 },

    #[error("type id {0} is not registered")]
    NotRegistered(TypeId),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
