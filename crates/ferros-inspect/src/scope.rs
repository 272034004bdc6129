//! # Scope Resolution
//!
//! Lists the variables visible in a stack frame.
//!
//! Blocks are walked from the innermost one containing the pc outward,
//! stopping after the function's outermost block. The result is ordered
//! outer block first, and within a block in declaration order. Shadowed
//! names are not removed: `x` declared in two nested blocks appears twice.
//!
//! ## Out-of-scope filtering
//!
//! Debug info puts a block's variables in scope for the whole block, even
//! before their declaration runs. With filtering on, a symbol declared at or
//! after the frame's current line (in the frame's own file) is dropped.
//!
//! That heuristic needs a line for both the symbol and the frame. A symbol
//! with no line, or one declared in another file, is kept but makes the
//! result unreliable: [`ScopeListing::filtered`] comes back `false`.
//!
//! In C and C++ frames two names are special-cased and never affect
//! reliability:
//!
//! - `this` is always kept
//! - range-for helpers (`__for_range`, `__for_begin`, `__for_end` with no
//!   line) are dropped whenever filtering is on
//!
//! The walk ends early at a block the backend reports as invalid.

use smallvec::SmallVec;
use tracing::debug;

use crate::inferior::{BlockSymbol, Inferior};
use crate::types::StackFrame;

const LOOP_HELPERS: [&str; 3] = ["__for_range", "__for_begin", "__for_end"];

/// Variables visible in a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeListing
{
    /// Names, outer block first.
    pub variables: Vec<String>,
    /// Filtering was requested and every symbol could be judged.
    pub filtered: bool,
}

/// List the variables of the selected frame.
pub fn list_scope(inferior: &dyn Inferior, filter: bool) -> ScopeListing
{
    match inferior.selected_frame() {
        Ok(frame) => list_frame_scope(inferior, &frame, filter),
        Err(err) => {
            debug!(%err, "No selected frame, scope is empty");
            ScopeListing::default()
        }
    }
}

/// List the variables of `frame`.
pub fn list_frame_scope(inferior: &dyn Inferior, frame: &StackFrame, filter: bool) -> ScopeListing
{
    if !inferior.is_frame_valid(frame) {
        return ScopeListing::default();
    }

    let mut filter = filter;
    let mut reliable = filter;
    let position = frame.location.as_ref().filter(|location| location.line != 0);
    if filter && position.is_none() {
        debug!(frame = frame.id.raw(), "Frame has no source position, not filtering");
        filter = false;
        reliable = false;
    }

    let blocks = match inferior.frame_blocks(frame) {
        Ok(blocks) => blocks,
        Err(err) => {
            debug!(%err, "Frame has no block");
            return ScopeListing {
                variables: Vec::new(),
                filtered: reliable,
            };
        }
    };

    let special_cased = frame.language.is_c_family();
    let mut per_block: Vec<SmallVec<[String; 8]>> = Vec::new();
    for block in blocks {
        if !block.valid {
            break;
        }
        let mut names = SmallVec::new();
        for symbol in &block.symbols {
            if !is_candidate(symbol) {
                continue;
            }
            if special_cased && symbol.name == "this" {
                names.push(symbol.name.clone());
                continue;
            }
            if filter {
                if special_cased && symbol.line == 0 && LOOP_HELPERS.contains(&symbol.name.as_str()) {
                    continue;
                }
                if let Some(position) = position {
                    match (&symbol.file, symbol.line) {
                        (Some(file), line) if line != 0 && *file == position.file => {
                            if line >= position.line {
                                continue;
                            }
                        }
                        _ => reliable = false,
                    }
                }
            }
            names.push(symbol.name.clone());
        }
        per_block.push(names);
        if block.function.is_some() {
            break;
        }
    }

    ScopeListing {
        variables: per_block.into_iter().rev().flatten().collect(),
        filtered: reliable,
    }
}

fn is_candidate(symbol: &BlockSymbol) -> bool
{
    symbol.valid && (symbol.is_variable || symbol.is_argument) && symbol.address_class.is_frame_variable()
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::backend::memory::MemoryInferior;
    use crate::inferior::{AddressClass, LexicalBlock};
    use crate::types::{Address, SourceLocation, SymbolName};

    fn frame(line: u32) -> StackFrame
    {
        StackFrame::new(1, 0, Address::from(0x401000))
            .with_function(SymbolName::from_linkage("_Z4workv"))
            .with_location(SourceLocation::new("main.cpp", line))
    }

    #[test]
    fn test_storage_classes()
    {
        let mut inferior = MemoryInferior::new();
        let symbols = vec![
            BlockSymbol::local("counter", "main.cpp", 3),
            BlockSymbol::local("LIMIT", "main.cpp", 2).with_class(AddressClass::Const),
            BlockSymbol::local("reg", "main.cpp", 4).with_class(AddressClass::Register),
            BlockSymbol::local("label", "main.cpp", 5).with_class(AddressClass::Label),
        ];
        inferior.select_frame(frame(20), vec![LexicalBlock::function(SymbolName::from_linkage("_Z4workv"), symbols)]);

        let listing = list_scope(&inferior, false);
        assert_eq!(listing.variables, vec!["counter", "reg"]);
        assert!(!listing.filtered);
    }

    #[test]
    fn test_stops_after_function_block()
    {
        let mut inferior = MemoryInferior::new();
        let blocks = vec![
            LexicalBlock::function(SymbolName::from_linkage("_Z4workv"), vec![BlockSymbol::local("a", "main.cpp", 1)]),
            LexicalBlock::new(vec![BlockSymbol::local("global_block", "main.cpp", 1)]),
        ];
        inferior.select_frame(frame(20), blocks);

        assert_eq!(list_scope(&inferior, true).variables, vec!["a"]);
    }

    #[test]
    fn test_this_and_loop_helpers()
    {
        let mut inferior = MemoryInferior::new();
        let symbols = vec![
            BlockSymbol::argument("this", "main.cpp", 0),
            BlockSymbol::local("__for_range", "main.cpp", 0),
            BlockSymbol::local("item", "main.cpp", 8),
        ];
        inferior.select_frame(frame(10), vec![LexicalBlock::function(SymbolName::from_linkage("_Z4workv"), symbols)]);

        let listing = list_scope(&inferior, true);
        assert_eq!(listing.variables, vec!["this", "item"]);
        assert!(listing.filtered);

        let listing = list_scope(&inferior, false);
        assert_eq!(listing.variables, vec!["this", "__for_range", "item"]);
        assert!(!listing.filtered);
    }

    #[test]
    fn test_invalid_block_ends_walk()
    {
        let mut inferior = MemoryInferior::new();
        let mut broken = LexicalBlock::new(vec![BlockSymbol::local("hidden", "main.cpp", 5)]);
        broken.valid = false;
        let blocks = vec![
            LexicalBlock::new(vec![BlockSymbol::local("inner", "main.cpp", 6)]),
            broken,
            LexicalBlock::function(SymbolName::from_linkage("_Z4workv"), vec![BlockSymbol::local("outer", "main.cpp", 2)]),
        ];
        inferior.select_frame(frame(20), blocks);

        assert_eq!(list_scope(&inferior, false).variables, vec!["inner"]);
    }

    #[test]
    fn test_other_file_is_unreliable()
    {
        let mut inferior = MemoryInferior::new();
        let symbols = vec![BlockSymbol::local("inlined", "header.h", 3), BlockSymbol::local("x", "main.cpp", 4)];
        inferior.select_frame(frame(10), vec![LexicalBlock::function(SymbolName::from_linkage("_Z4workv"), symbols)]);

        let listing = list_scope(&inferior, true);
        assert_eq!(listing.variables, vec!["inlined", "x"]);
        assert!(!listing.filtered);
    }

    #[test]
    fn test_no_position_disables_filtering()
    {
        let mut inferior = MemoryInferior::new();
        let frame = StackFrame::new(1, 0, Address::from(0x401000));
        let symbols = vec![BlockSymbol::local("late", "main.c", 99)];
        inferior.select_frame(frame, vec![LexicalBlock::function(SymbolName::from_linkage("work"), symbols)]);

        let listing = list_scope(&inferior, true);
        assert_eq!(listing.variables, vec!["late"]);
        assert!(!listing.filtered);
    }

    #[test]
    fn test_invalid_frame_and_missing_block()
    {
        let mut inferior = MemoryInferior::new();
        inferior.select_frame_without_blocks(frame(10));
        assert_eq!(list_scope(&inferior, true), ScopeListing {
            variables: vec![],
            filtered: true
        });

        inferior.invalidate_frame();
        assert_eq!(list_scope(&inferior, true), ScopeListing::default());
    }
}
