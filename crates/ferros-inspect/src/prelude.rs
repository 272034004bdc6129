//! Common module for library exports

pub use crate::config::InspectorConfig;
pub use crate::error::{InspectError, InspectResult};
pub use crate::events::{event_channel, InferiorEvent, StopReason};
pub use crate::group::{EncodedText, Encoding, GroupChild};
pub use crate::inferior::{AddressClass, BlockSymbol, Inferior, LexicalBlock};
pub use crate::registry::{ChildrenPage, VarId, VarRecord, VariableRegistry};
pub use crate::render::{Capability, Child, ChildStream, DisplayValue, RenderContext, Renderer, RendererLookup, RendererSet};
pub use crate::types::{Address, Field, StackFrame, SymbolLanguage, Type, TypeCode};
pub use crate::value::RawValue;
