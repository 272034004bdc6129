//! Demo program for the inspector.
//!
//! A stopped C++ `main` whose frame holds a few typical locals, built in an
//! in-memory backend:
//!
//! ```text
//! int main(int argc)
//! {
//!     std::vector<int> values = {1, 1, 2, 3, 5, 8, 13, 21};
//!     std::map<int, int> scores = {{1, 90}, {2, 75}, {3, 60}};
//!     Shape *shape = new Circle(4);
//!     Point origin = {0, 0};
//!     char name[8] = "ferros";
//!     bool ready = true;
//!     for (int i = 0; ...) {      // stopped here, line 20
//!         int later = 0;
//!     }
//! }
//! ```
//!
//! `std::vector<int>` and `std::map<int, int>` get specialized renderers;
//! everything else is rendered structurally.

use ferros_inspect::backend::MemoryInferior;
use ferros_inspect::group::{group_stream, EncodedText, Encoding, GroupChild};
use ferros_inspect::inferior::{BlockSymbol, LexicalBlock};
use ferros_inspect::render::{Capability, Child, ChildStream, DisplayValue, RenderContext, Renderer, RendererSet};
use ferros_inspect::types::{Address, Field, SourceLocation, StackFrame, SymbolName, Type};
use ferros_inspect::{InspectResult, RawValue};

const VECTOR: &str = "std::vector<int>";
const MAP: &str = "std::map<int, int>";
const MAIN: &str = "_Z4mainv";

/// Build the stopped demo process.
pub fn program() -> MemoryInferior
{
    let int = Type::int("int", 4, true);
    let ch = Type::char("char", 1, true);
    let vector = Type::structure(
        VECTOR,
        24,
        vec![
            Field::new("_M_start", int.pointer_to(), 0),
            Field::new("_M_finish", int.pointer_to(), 8),
            Field::new("_M_end_of_storage", int.pointer_to(), 16),
        ],
    );
    let node = Type::structure("_Rb_tree_node", 8, vec![Field::new("first", int.clone(), 0), Field::new("second", int.clone(), 4)]);
    let map = Type::structure(MAP, 16, vec![Field::new("_M_node_count", int.clone(), 0), Field::new("_M_nodes", node.pointer_to(), 8)]);
    let shape = Type::structure(
        "Shape",
        12,
        vec![
            Field::artificial("_vptr.Shape", int.pointer_to(), 0),
            Field::new("id", int.clone(), 8),
        ],
    );
    let circle = Type::structure(
        "Circle",
        16,
        vec![
            Field::artificial("_vptr.Shape", int.pointer_to(), 0),
            Field::new("id", int.clone(), 8),
            Field::new("radius", int.clone(), 12),
        ],
    );
    let point = Type::structure("Point", 8, vec![Field::new("x", int.clone(), 0), Field::new("y", int.clone(), 4)]);

    let mut inferior = MemoryInferior::new();

    // Heap
    for (i, n) in [1, 1, 2, 3, 5, 8, 13, 21].into_iter().enumerate() {
        inferior.write_i32(0x10_000 + i as u64 * 4, n);
    }
    for (i, (key, score)) in [(1, 90), (2, 75), (3, 60)].into_iter().enumerate() {
        inferior.write_i32(0x11_000 + i as u64 * 8, key).write_i32(0x11_004 + i as u64 * 8, score);
    }
    inferior.write_u64(0x12_000, 0x40_1000).write_i32(0x12_008, 7).write_i32(0x12_00c, 4);
    inferior.set_dynamic_type(0x12_000, circle);

    // Frame of main
    inferior
        .write_i32(0x7000, 1)
        .write_u64(0x7008, 0x10_000)
        .write_u64(0x7010, 0x10_020)
        .write_u64(0x7018, 0x10_020)
        .write_i32(0x7020, 3)
        .write_u64(0x7028, 0x11_000)
        .write_u64(0x7030, 0x12_000)
        .write_i32(0x7038, 0)
        .write_i32(0x703c, 0)
        .write_c_string(0x7040, "ferros")
        .write_u8(0x7047, 0)
        .write_u8(0x7048, 1)
        .write_i32(0x704c, 3);
    inferior
        .define("argc", int.clone(), 0x7000)
        .define("values", vector, 0x7008)
        .define("scores", map, 0x7020)
        .define("shape", shape.pointer_to(), 0x7030)
        .define("origin", point, 0x7038)
        .define("name", Type::array(&ch, 8), 0x7040)
        .define("ready", Type::bool(), 0x7048)
        .define("i", int, 0x704c);

    let file = "main.cpp";
    let frame = StackFrame::new(1, 0, Address::from(0x40_1200))
        .with_function(SymbolName::from_linkage(MAIN))
        .with_location(SourceLocation::new(file, 20));
    let blocks = vec![
        LexicalBlock::new(vec![BlockSymbol::local("i", file, 19), BlockSymbol::local("later", file, 21)]),
        LexicalBlock::function(
            SymbolName::from_linkage(MAIN),
            vec![
                BlockSymbol::argument("argc", file, 11),
                BlockSymbol::local("values", file, 13),
                BlockSymbol::local("scores", file, 14),
                BlockSymbol::local("shape", file, 15),
                BlockSymbol::local("origin", file, 16),
                BlockSymbol::local("name", file, 17),
                BlockSymbol::local("ready", file, 18),
            ],
        ),
    ];
    inferior.select_frame(frame, blocks);
    inferior
}

/// Renderers for the demo's library types.
pub fn renderers() -> RendererSet
{
    let mut set = RendererSet::new();
    set.register_fn("libstdc++", |value: &RawValue, cx: &mut RenderContext<'_>| -> InspectResult<Option<Box<dyn Renderer>>> {
        let ty = value.ty().strip_typedefs();
        match ty.name() {
            Some(VECTOR) => Ok(Some(Box::new(VectorRenderer::new(value, cx)?))),
            Some(MAP) => Ok(Some(Box::new(MapRenderer { value: value.clone() }))),
            _ => Ok(None),
        }
    });
    set
}

/// `std::vector<int>`: elements are computed from `_M_start` on demand.
struct VectorRenderer
{
    start: RawValue,
    len: u64,
}

impl VectorRenderer
{
    fn new(value: &RawValue, cx: &RenderContext<'_>) -> InspectResult<Self>
    {
        let start = value.field_named("_M_start")?;
        let begin = start.pointer_value(cx.inferior())?.value();
        let end = value.field_named("_M_finish")?.pointer_value(cx.inferior())?.value();
        Ok(Self {
            start,
            len: end.saturating_sub(begin) / 4,
        })
    }
}

impl Renderer for VectorRenderer
{
    fn name(&self) -> &str
    {
        "std::vector"
    }

    fn supports(&self, _capability: Capability) -> bool
    {
        true
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Text(format!("std::vector of length {}", self.len)))
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let start = self.start.clone();
        let len = self.len;
        let mut index = 0;
        Ok(Box::new(move |cx: &mut RenderContext<'_>| -> InspectResult<Option<Child>> {
            if index >= len {
                return Ok(None);
            }
            let element = start.dereference(cx.inferior())?;
            let address = element.address().map(|base| base + index * 4);
            let child = match address {
                Some(address) => RawValue::at(element.ty().clone(), address),
                None => element,
            };
            index += 1;
            Ok(Some(Child::new(format!("[{}]", index - 1), child)))
        }))
    }

    fn child_count(&self, _cx: &mut RenderContext<'_>) -> InspectResult<usize>
    {
        Ok(usize::try_from(self.len).unwrap_or(usize::MAX))
    }

    fn display_hint(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        Ok(Some("array".to_string()))
    }
}

/// `std::map<int, int>`: one keyed group per node.
struct MapRenderer
{
    value: RawValue,
}

impl Renderer for MapRenderer
{
    fn name(&self) -> &str
    {
        "std::map"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability != Capability::ChildCount
    }

    fn display(&self, cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        let count = self.value.field_named("_M_node_count")?.read_signed(cx.inferior())?;
        Ok(DisplayValue::Text(EncodedText::encoded(count.to_string(), Encoding::ItemCount).decode()))
    }

    fn children(&self, cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let count = self.value.field_named("_M_node_count")?.read_unsigned(cx.inferior())?;
        let nodes = self.value.field_named("_M_nodes")?;
        let first = nodes.dereference(cx.inferior())?;
        let mut entries = Vec::new();
        for i in 0..count {
            let node = match first.address() {
                Some(address) => RawValue::at(first.ty().clone(), address + i * first.ty().size()),
                None => first.clone(),
            };
            let key = node.field_named("first")?;
            let mapped = node.field_named("second")?;
            let summary = cx.format(&mapped);
            entries.push(
                GroupChild::keyed(EncodedText::plain(format!("[{}]", cx.format(&key))), vec![GroupChild::value("first", key), GroupChild::value("second", mapped)])
                    .with_summary(EncodedText::plain(summary)),
            );
        }
        Ok(group_stream(entries))
    }

    fn display_hint(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        Ok(Some("map".to_string()))
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashSet;

    use ferros_inspect::group::GROUP_NAME_PREFIX;
    use ferros_inspect::{InspectorConfig, VariableRegistry};

    use super::*;

    fn registry() -> VariableRegistry
    {
        VariableRegistry::with_renderers(renderers(), InspectorConfig::default())
    }

    #[test]
    fn test_scope_hides_later_locals()
    {
        let inferior = program();
        let listing = registry().list_scope(&inferior, true);
        assert_eq!(listing.variables, vec!["argc", "values", "scores", "shape", "origin", "name", "ready", "i"]);
        assert!(listing.filtered);
    }

    #[test]
    fn test_vector_pages()
    {
        let inferior = program();
        let mut registry = registry();
        let values = registry.create(&inferior, "values", false).unwrap();
        assert_eq!(values.value.as_deref(), Some("std::vector of length 8"));
        assert_eq!(values.has_more, Some(true));

        let page = registry.list_children(&inferior, values.id, 5, 8, &HashSet::new()).unwrap();
        let shown: Vec<_> = page.children.iter().map(|c| c.value.clone().unwrap_or_default()).collect();
        assert_eq!(shown, vec!["8", "13", "21"]);
        assert!(!page.has_more);
    }

    #[test]
    fn test_map_entries_are_groups()
    {
        let inferior = program();
        let mut registry = registry();
        let scores = registry.create(&inferior, "scores", false).unwrap();
        assert_eq!(scores.value.as_deref(), Some("<3 items>"));

        let page = registry.list_children(&inferior, scores.id, 0, 1, &HashSet::new()).unwrap();
        assert_eq!(page.children[0].expression, format!("{GROUP_NAME_PREFIX}[1] = 90"));
        assert!(page.has_more);

        let entry = registry.list_children(&inferior, page.children[0].id, -1, -1, &HashSet::new()).unwrap();
        let fields: Vec<_> = entry.children.iter().map(|c| (c.expression.as_str(), c.value.as_deref())).collect();
        assert_eq!(fields, vec![("first", Some("1")), ("second", Some("90"))]);
    }

    #[test]
    fn test_shape_uses_dynamic_type()
    {
        let inferior = program();
        let mut registry = registry();
        let shape = registry.create(&inferior, "shape", false).unwrap();
        assert_eq!(shape.type_name, "Circle *");
        assert_eq!(shape.child_count, Some(2));

        let page = registry.list_children(&inferior, shape.id, -1, -1, &HashSet::new()).unwrap();
        let members: Vec<_> = page.children.iter().map(|c| c.expression.as_str()).collect();
        assert_eq!(members, vec!["id", "radius"]);
    }

    #[test]
    fn test_scalars()
    {
        let inferior = program();
        let mut registry = registry();
        assert_eq!(registry.create(&inferior, "name", false).unwrap().value.as_deref(), Some("\"ferros\""));
        assert_eq!(registry.create(&inferior, "ready", false).unwrap().value.as_deref(), Some("true"));
        assert_eq!(registry.create(&inferior, "origin", false).unwrap().value.as_deref(), Some("{...}"));
    }
}
