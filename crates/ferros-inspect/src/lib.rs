//! # ferros-inspect
//!
//! Variable inspection for Ferros front-ends.
//!
//! This crate turns values in a stopped program into the tree a debugger UI
//! shows in its variables view:
//! - Listing the variables visible in the selected frame
//! - Variable objects with stable integer ids
//! - Pluggable renderers for library types (vectors, maps, smart pointers)
//! - Lazy, paged children, so huge or endless containers stay cheap
//! - Synthetic group nodes for renderers that need intermediate levels
//!
//! ## Layers
//!
//! ```text
//! VariableRegistry        ids, pages, raw-mode fallback
//!   render::resolve       display / children renderer per value
//!     RendererSet         group values, user lookups, built-ins
//!     render::fallback    structural renderers from the type alone
//!   cursor::ChildCursor   forward-only position in a child stream
//! Inferior                memory, frames and expressions of the target
//! ```
//!
//! The target is reached only through the [`Inferior`] trait. The in-memory
//! [`backend::MemoryInferior`] implements it for tests and demos.

pub mod backend;
pub mod config;
pub mod cursor;
pub mod error;
pub mod events;
pub mod format;
pub mod group;
pub mod inferior;
pub mod prelude;
pub mod registry;
pub mod render;
pub mod scope;
pub mod types;
pub mod value;

pub use config::InspectorConfig;
pub use error::{InspectError, InspectResult};
pub use inferior::Inferior;
pub use registry::{ChildrenPage, VarId, VarRecord, VariableRegistry};
pub use scope::ScopeListing;
pub use value::RawValue;
