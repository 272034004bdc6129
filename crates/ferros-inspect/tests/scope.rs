//! Tests for frame scope listing

use ferros_inspect::backend::MemoryInferior;
use ferros_inspect::inferior::{BlockSymbol, LexicalBlock};
use ferros_inspect::scope::list_scope;
use ferros_inspect::types::{Address, SourceLocation, StackFrame, SymbolName};

const FUNCTION: &str = "_ZN4demo4main17h0123456789abcdefE";

fn frame(line: u32) -> StackFrame
{
    StackFrame::new(1, 0, Address::from(0x5000)).with_function(SymbolName::from_linkage(FUNCTION)).with_location(SourceLocation::new("src/main.rs", line))
}

/// `fn main(argc) { let total; { let i; let later; } }`, innermost block first.
fn nested_blocks() -> Vec<LexicalBlock>
{
    vec![
        LexicalBlock::new(vec![BlockSymbol::local("i", "src/main.rs", 6), BlockSymbol::local("later", "src/main.rs", 9)]),
        LexicalBlock::function(
            SymbolName::from_linkage(FUNCTION),
            vec![BlockSymbol::argument("argc", "src/main.rs", 1), BlockSymbol::local("total", "src/main.rs", 3)],
        ),
    ]
}

#[test]
fn test_outer_block_first()
{
    let mut inferior = MemoryInferior::new();
    inferior.select_frame(frame(8), nested_blocks());

    let listing = list_scope(&inferior, false);
    assert_eq!(listing.variables, vec!["argc", "total", "i", "later"]);
    assert!(!listing.filtered);
}

#[test]
fn test_filter_drops_later_declarations()
{
    let mut inferior = MemoryInferior::new();
    inferior.select_frame(frame(8), nested_blocks());

    let listing = list_scope(&inferior, true);
    assert_eq!(listing.variables, vec!["argc", "total", "i"]);
    assert!(listing.filtered);
}

#[test]
fn test_symbol_without_file_makes_filter_unreliable()
{
    let mut inferior = MemoryInferior::new();
    let blocks = vec![LexicalBlock::function(
        SymbolName::from_linkage(FUNCTION),
        vec![BlockSymbol::local("tmp", "src/main.rs", 2).without_file()],
    )];
    inferior.select_frame(frame(8), blocks);

    let listing = list_scope(&inferior, true);
    assert_eq!(listing.variables, vec!["tmp"]);
    assert!(!listing.filtered);
}

#[test]
fn test_stale_or_missing_frame()
{
    let mut inferior = MemoryInferior::new();
    assert!(list_scope(&inferior, true).variables.is_empty());

    inferior.select_frame(frame(8), nested_blocks()).invalidate_frame();
    let listing = list_scope(&inferior, true);
    assert!(listing.variables.is_empty());
    assert!(!listing.filtered);
}

#[test]
fn test_frame_without_blocks()
{
    let mut inferior = MemoryInferior::new();
    inferior.select_frame_without_blocks(frame(8));

    let listing = list_scope(&inferior, true);
    assert!(listing.variables.is_empty());
    assert!(listing.filtered);
}
