//! Stack frame types.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::symbols::{SourceLocation, SymbolLanguage, SymbolName};
use super::Address;

/// Stable identifier for a stack frame within one stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

impl FrameId
{
    /// Build an identifier from thread, depth and program counter.
    pub fn new(thread: u64, depth: u32, pc: Address) -> Self
    {
        let mut hasher = DefaultHasher::new();
        thread.hash(&mut hasher);
        depth.hash(&mut hasher);
        pc.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Raw representation suitable for logging.
    pub fn raw(self) -> u64
    {
        self.0
    }
}

/// Stack frame as reported by the backend.
///
/// Only what variable inspection needs: where the frame is stopped, in which
/// function and language. Block and symbol enumeration goes through
/// [`crate::inferior::Inferior::frame_blocks`].
#[derive(Debug, Clone)]
pub struct StackFrame
{
    /// Identifier the backend uses to find the frame again.
    pub id: FrameId,
    /// Depth within the thread's stack (0 = innermost).
    pub depth: u32,
    /// Program counter corresponding to this frame.
    pub pc: Address,
    /// Best-effort symbol for the frame.
    pub function: Option<SymbolName>,
    /// Source position of `pc`, if the line table covers it.
    pub location: Option<SourceLocation>,
    /// Language of the compilation unit.
    pub language: SymbolLanguage,
}

impl StackFrame
{
    /// Frame with no symbol or line information.
    pub fn new(thread: u64, depth: u32, pc: Address) -> Self
    {
        Self {
            id: FrameId::new(thread, depth, pc),
            depth,
            pc,
            function: None,
            location: None,
            language: SymbolLanguage::Unknown,
        }
    }

    /// Attach the function symbol; the frame language follows the symbol.
    #[must_use]
    pub fn with_function(mut self, function: SymbolName) -> Self
    {
        self.language = function.language();
        self.function = Some(function);
        self
    }

    /// Attach the source position of `pc`.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self
    {
        self.location = Some(location);
        self
    }

    /// Override the language (compile-unit language wins over mangling).
    #[must_use]
    pub fn with_language(mut self, language: SymbolLanguage) -> Self
    {
        self.language = language;
        self
    }
}
