//! Debug-info backend contract
//!
//! Everything the inspection core knows about the stopped process comes
//! through [`Inferior`]. The core never parses debug info or touches the
//! process itself; a backend (ptrace + DWARF, a core file, a remote stub, or
//! [`crate::backend::memory::MemoryInferior`] in tests) answers these
//! questions.
//!
//! ## Lexical blocks
//!
//! [`Inferior::frame_blocks`] returns the blocks that contain the frame's pc,
//! innermost first, up to and including the function's outermost block. Each
//! block lists its symbols in declaration order. The scope resolver decides
//! which of them are shown.

use crate::error::InspectResult;
use crate::types::{Address, StackFrame, SymbolName, Type};
use crate::value::RawValue;

/// Storage class of a block symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressClass
{
    Undefined,
    Const,
    Static,
    Register,
    Argument,
    RefArgument,
    RegParmAddr,
    Local,
    Typedef,
    Label,
    Block,
    ConstBytes,
    Unresolved,
    OptimizedOut,
    Computed,
}

impl AddressClass
{
    /// Storage classes that denote something a user thinks of as a variable.
    #[must_use]
    pub const fn is_frame_variable(self) -> bool
    {
        matches!(
            self,
            AddressClass::Argument
                | AddressClass::RefArgument
                | AddressClass::RegParmAddr
                | AddressClass::Local
                | AddressClass::Static
                | AddressClass::Register
                | AddressClass::Computed
        )
    }
}

/// A symbol declared in a lexical block.
#[derive(Debug, Clone)]
pub struct BlockSymbol
{
    pub name: String,
    pub address_class: AddressClass,
    pub is_variable: bool,
    pub is_argument: bool,
    /// Declaration line; `0` when the debug info has none.
    pub line: u32,
    /// Declaring file; `None` when the symbol has no symbol table.
    pub file: Option<String>,
    pub valid: bool,
}

impl BlockSymbol
{
    /// A valid local variable declared at `file:line`.
    pub fn local(name: impl Into<String>, file: impl Into<String>, line: u32) -> Self
    {
        Self {
            name: name.into(),
            address_class: AddressClass::Local,
            is_variable: true,
            is_argument: false,
            line,
            file: Some(file.into()),
            valid: true,
        }
    }

    /// A valid function argument declared at `file:line`.
    pub fn argument(name: impl Into<String>, file: impl Into<String>, line: u32) -> Self
    {
        Self {
            address_class: AddressClass::Argument,
            is_variable: false,
            is_argument: true,
            ..Self::local(name, file, line)
        }
    }

    #[must_use]
    pub fn with_class(mut self, address_class: AddressClass) -> Self
    {
        self.address_class = address_class;
        self
    }

    /// Drop the declaring file (symbol without a symbol table).
    #[must_use]
    pub fn without_file(mut self) -> Self
    {
        self.file = None;
        self
    }
}

/// A lexical block containing the frame's pc.
#[derive(Debug, Clone, Default)]
pub struct LexicalBlock
{
    pub symbols: Vec<BlockSymbol>,
    /// Set on the function's outermost block.
    pub function: Option<SymbolName>,
    pub valid: bool,
}

impl LexicalBlock
{
    /// An inner (non-function) block.
    pub fn new(symbols: Vec<BlockSymbol>) -> Self
    {
        Self {
            symbols,
            function: None,
            valid: true,
        }
    }

    /// The outermost block of `function`.
    pub fn function(function: SymbolName, symbols: Vec<BlockSymbol>) -> Self
    {
        Self {
            symbols,
            function: Some(function),
            valid: true,
        }
    }
}

/// Read-only view of a stopped process.
///
/// Implementations should be cheap to call repeatedly; the core does not
/// cache memory reads.
pub trait Inferior
{
    /// Read `len` bytes at `address`.
    ///
    /// # Errors
    /// [`crate::InspectError::Memory`] when any byte is unreadable.
    fn read_memory(&self, address: Address, len: usize) -> InspectResult<Vec<u8>>;

    /// Byte order of the target.
    fn is_little_endian(&self) -> bool
    {
        true
    }

    /// Frame selected by the user (usually the innermost frame of the
    /// stopped thread).
    ///
    /// # Errors
    /// [`crate::InspectError::Frame`] when no thread is stopped.
    fn selected_frame(&self) -> InspectResult<StackFrame>;

    /// Whether `frame` still exists (the process has not run since).
    fn is_frame_valid(&self, frame: &StackFrame) -> bool;

    /// Lexical blocks for `frame`, innermost first.
    ///
    /// # Errors
    /// [`crate::InspectError::Frame`] when no block contains the frame's pc.
    fn frame_blocks(&self, frame: &StackFrame) -> InspectResult<Vec<LexicalBlock>>;

    /// Evaluate an expression in the context of the selected frame.
    fn evaluate(&self, expression: &str) -> InspectResult<RawValue>;

    /// Most-derived type of the object a pointer or reference refers to,
    /// expressed as the matching pointer/reference type.
    ///
    /// `Ok(None)` when the value has no richer dynamic type.
    fn dynamic_type(&self, value: &RawValue) -> InspectResult<Option<Type>>;
}
