//! Core data types shared by the backend and the inspection layers.

pub mod address;
pub mod stack;
pub mod symbols;
pub mod ty;

pub use address::Address;
pub use stack::{FrameId, StackFrame};
pub use symbols::{SourceLocation, SymbolLanguage, SymbolName};
pub use ty::{Field, Type, TypeCode, TypeKind, POINTER_SIZE};
