//! Symbol names, source languages and source locations.

use std::fmt;
use std::str::FromStr;

use rustc_demangle::try_demangle;

/// Source language of a frame or symbol.
///
/// Variables inherit the language of the frame they were created in; child
/// variables inherit it from their parent. A few presentation rules only
/// apply to the C family (see [`SymbolLanguage::is_c_family`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SymbolLanguage
{
    /// `_R` or legacy `_ZN...17h<hash>E` names.
    Rust,
    /// Other Itanium `_Z` names.
    Cpp,
    C,
    /// No frame, or a name we could not classify.
    #[default]
    Unknown,
}

impl SymbolLanguage
{
    /// C and C++ get the native presentation tweaks (`{...}` for empty
    /// struct displays, `true`/`false` for booleans).
    #[must_use]
    pub const fn is_c_family(self) -> bool
    {
        matches!(self, SymbolLanguage::C | SymbolLanguage::Cpp)
    }
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::C => "c",
            SymbolLanguage::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

impl FromStr for SymbolLanguage
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "rust" => Ok(SymbolLanguage::Rust),
            "c++" | "cpp" | "cxx" => Ok(SymbolLanguage::Cpp),
            "c" => Ok(SymbolLanguage::C),
            "unknown" | "auto" => Ok(SymbolLanguage::Unknown),
            _ => Err(format!("Unknown language: {s}")),
        }
    }
}

/// A function name with demangling metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
    language: SymbolLanguage,
}

impl SymbolName
{
    /// Construct from parts.
    pub fn new(raw: String, demangled: Option<String>, language: SymbolLanguage) -> Self
    {
        Self {
            raw,
            demangled,
            language,
        }
    }

    /// Build a name from a linkage (possibly mangled) symbol, detecting the
    /// language from its mangling.
    ///
    /// - Rust: `_R` (v0), or legacy `_ZN` names that `rustc-demangle` accepts
    /// - C++: any other `_Z` name
    /// - C: everything else
    ///
    /// ```rust
    /// use ferros_inspect::types::{SymbolLanguage, SymbolName};
    ///
    /// assert_eq!(SymbolName::from_linkage("main").language(), SymbolLanguage::C);
    /// assert_eq!(SymbolName::from_linkage("_Z3fooi").language(), SymbolLanguage::Cpp);
    /// ```
    pub fn from_linkage(raw: impl Into<String>) -> Self
    {
        let raw = raw.into();
        let rust = try_demangle(&raw).ok().map(|d| format!("{d:#}"));
        let language = if rust.is_some() && (raw.starts_with("_R") || (raw.ends_with('E') && raw.contains("17h"))) {
            SymbolLanguage::Rust
        } else if raw.starts_with("_Z") {
            SymbolLanguage::Cpp
        } else {
            SymbolLanguage::C
        };
        let demangled = if language == SymbolLanguage::Rust { rust } else { None };
        Self::new(raw, demangled, language)
    }

    /// Linkage name as found in the symbol table.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    pub fn demangled(&self) -> Option<&str>
    {
        self.demangled.as_deref()
    }

    /// Demangled name, or the linkage name when there is none.
    pub fn display_name(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }

    pub fn language(&self) -> SymbolLanguage
    {
        self.language
    }
}

impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}

/// Source position of a frame or symbol declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    /// File name as recorded in the line table.
    pub file: String,
    /// Line number; `0` means the debug info had none.
    pub line: u32,
}

impl SourceLocation
{
    /// Location with a known line.
    pub fn new(file: impl Into<String>, line: u32) -> Self
    {
        Self {
            file: file.into(),
            line,
        }
    }
}
