//! Backends implementing [`crate::inferior::Inferior`].

pub mod memory;

pub use memory::MemoryInferior;
