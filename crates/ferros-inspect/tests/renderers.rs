//! Tests for specialized renderers seen through the registry

use std::collections::HashSet;

use ferros_inspect::backend::MemoryInferior;
use ferros_inspect::prelude::*;
use ferros_inspect::render::iter_stream;
use ferros_inspect::types::SymbolName;

fn no_raw() -> HashSet<String>
{
    HashSet::new()
}

fn type_name_is(value: &RawValue, name: &str) -> bool
{
    value.ty().strip_typedefs().code() == TypeCode::Struct && value.ty().strip_typedefs().name() == Some(name)
}

/// Shows a `Circle` as `circle r=<radius>` with a single `radius` child.
struct CircleRenderer
{
    value: RawValue,
}

impl Renderer for CircleRenderer
{
    fn name(&self) -> &str
    {
        "circle"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        matches!(capability, Capability::Display | Capability::Children)
    }

    fn display(&self, cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        let radius = self.value.field_named("radius")?.read_signed(cx.inferior())?;
        Ok(DisplayValue::Text(format!("circle r={radius}")))
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let radius = self.value.field_named("radius")?;
        Ok(iter_stream(std::iter::once(Child::new("radius", radius))))
    }
}

/// Yields two members, then fails.
struct FaultyRenderer
{
    value: RawValue,
}

impl Renderer for FaultyRenderer
{
    fn name(&self) -> &str
    {
        "faulty"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        matches!(capability, Capability::Display | Capability::Children)
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Text("faulty".to_string()))
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let value = self.value.clone();
        let mut index = 0;
        Ok(Box::new(move |_cx: &mut RenderContext<'_>| -> InspectResult<Option<Child>> {
            index += 1;
            if index > 2 {
                return Err(InspectError::renderer("faulty", "iterator exploded"));
            }
            Ok(Some(Child::new(format!("item{index}"), value.field_named("a")?)))
        }))
    }
}

/// Fails on display.
struct BrokenRenderer;

impl Renderer for BrokenRenderer
{
    fn name(&self) -> &str
    {
        "broken"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability == Capability::Display
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Err(InspectError::renderer("broken", "cannot read header"))
    }
}

/// Looks up a helper symbol the program does not have.
struct WidgetRenderer;

impl Renderer for WidgetRenderer
{
    fn name(&self) -> &str
    {
        "widget"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability == Capability::Display
    }

    fn display(&self, cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        let helper = cx.inferior().evaluate("widget_helper")?;
        Ok(DisplayValue::Value(helper))
    }
}

/// Displays a boolean.
struct FlagRenderer;

impl Renderer for FlagRenderer
{
    fn name(&self) -> &str
    {
        "flag"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability == Capability::Display
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Bool(true))
    }
}

fn renderers() -> RendererSet
{
    let mut set = RendererSet::new();
    set.register_fn("shapes", |value: &RawValue, _cx: &mut RenderContext<'_>| -> InspectResult<Option<Box<dyn Renderer>>> {
        if type_name_is(value, "Circle") {
            return Ok(Some(Box::new(CircleRenderer { value: value.clone() })));
        }
        Ok(None)
    });
    set.register_fn("misc", |value: &RawValue, _cx: &mut RenderContext<'_>| -> InspectResult<Option<Box<dyn Renderer>>> {
        let renderer: Box<dyn Renderer> = if type_name_is(value, "Faulty") {
            Box::new(FaultyRenderer { value: value.clone() })
        } else if type_name_is(value, "Broken") {
            Box::new(BrokenRenderer)
        } else if type_name_is(value, "Flag") {
            Box::new(FlagRenderer)
        } else if type_name_is(value, "Widget") {
            Box::new(WidgetRenderer)
        } else {
            return Ok(None);
        };
        Ok(Some(renderer))
    });
    set
}

/// `Shape *shape` pointing at a `Circle` with radius 5, plus a few
/// aggregates claimed by the test renderers.
fn program() -> MemoryInferior
{
    let int = Type::int("int", 4, true);
    let shape = Type::structure("Shape", 4, vec![Field::new("kind", int.clone(), 0)]);
    let circle = Type::structure("Circle", 8, vec![Field::new("kind", int.clone(), 0), Field::new("radius", int.clone(), 4)]);
    let pair = |name: &str| Type::structure(name, 8, vec![Field::new("a", int.clone(), 0), Field::new("b", int.clone(), 4)]);

    let mut inferior = MemoryInferior::new();
    inferior
        .write_i32(0x2000, 1)
        .write_i32(0x2004, 5)
        .write_u64(0x3000, 0x2000)
        .write_i32(0x4000, 7)
        .write_i32(0x4004, 8)
        .set_dynamic_type(0x2000, circle.clone())
        .define("shape", shape.pointer_to(), 0x3000)
        .define("ring", circle, 0x2000)
        .define("faulty", pair("Faulty"), 0x4000)
        .define("broken", pair("Broken"), 0x4000)
        .define("flag", pair("Flag"), 0x4000)
        .define("widget", pair("Widget"), 0x4000);
    inferior
}

/// A record with the parts that identify the handle blanked out.
fn presentation(record: &VarRecord) -> VarRecord
{
    VarRecord {
        id: VarId::new(0),
        name: String::new(),
        renderer_failed: false,
        ..record.clone()
    }
}

fn select_frame(inferior: &mut MemoryInferior, linkage: &str)
{
    let frame = StackFrame::new(1, 0, Address::from(0x401000)).with_function(SymbolName::from_linkage(linkage));
    inferior.select_frame(frame, vec![LexicalBlock::function(SymbolName::from_linkage(linkage), Vec::new())]);
}

#[test]
fn test_dynamic_type_and_pointer_delegate()
{
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let var = registry.create(&inferior, "shape", false).unwrap();
    assert_eq!(var.type_name, "Circle *");
    assert!(var.dynamic);
    assert_eq!(var.value.as_deref(), Some("0x2000 circle r=5"));
    assert_eq!(var.has_more, Some(true));
    assert_eq!(var.child_count, None);

    let page = registry.list_children(&inferior, var.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(page.children.len(), 1);
    assert_eq!(page.children[0].expression, "radius");
    assert_eq!(page.children[0].value.as_deref(), Some("5"));
    assert!(!page.has_more);
}

#[test]
fn test_raw_skips_dynamic_type_and_renderers()
{
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let var = registry.create(&inferior, "shape", true).unwrap();
    assert_eq!(var.type_name, "Shape *");
    assert!(!var.dynamic);
    assert_eq!(var.value.as_deref(), Some("0x2000"));
    assert_eq!(var.child_count, Some(1));

    let page = registry.list_children(&inferior, var.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(page.children[0].expression, "kind");
}

#[test]
fn test_set_raw_rebuilds_children()
{
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());
    let ring = registry.create(&inferior, "ring", false).unwrap();
    assert_eq!(ring.value.as_deref(), Some("circle r=5"));

    let page = registry.list_children(&inferior, ring.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(page.children.len(), 1);

    registry.set_raw(ring.id, true).unwrap();
    assert!(registry.handle(ring.id).unwrap().is_raw());
    let page = registry.list_children(&inferior, ring.id, -1, -1, &no_raw()).unwrap();
    let names: Vec<_> = page.children.iter().map(|c| c.expression.as_str()).collect();
    assert_eq!(names, vec!["kind", "radius"]);

    let reread = registry.read(&inferior, ring.id).unwrap();
    assert!(!reread.dynamic);
    assert_eq!(reread.child_count, Some(2));
}

#[test]
fn test_raw_children_by_name()
{
    let mut inferior = program();
    let int = Type::int("int", 4, true);
    let circle = Type::structure("Circle", 8, vec![Field::new("kind", int.clone(), 0), Field::new("radius", int, 4)]);
    let holder = Type::structure("Holder", 16, vec![Field::new("first", circle.clone(), 0), Field::new("second", circle, 8)]);
    inferior.write_i32(0x5000, 0).write_i32(0x5004, 1).write_i32(0x5008, 0).write_i32(0x500c, 2).define("holder", holder, 0x5000);

    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());
    let var = registry.create(&inferior, "holder", false).unwrap();
    let raw: HashSet<String> = ["second".to_string()].into_iter().collect();
    let page = registry.list_children(&inferior, var.id, -1, -1, &raw).unwrap();

    assert_eq!(page.children[0].value.as_deref(), Some("circle r=1"));
    assert!(page.children[0].dynamic);
    assert_eq!(page.children[1].value.as_deref(), Some(""));
    assert!(!page.children[1].dynamic);
    assert!(registry.handle(page.children[1].id).unwrap().is_raw());
}

#[test]
fn test_failing_display_falls_back_to_raw()
{
    ferros_utils::init_test_logging();
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let var = registry.create(&inferior, "broken", false).unwrap();
    assert!(var.renderer_failed);
    assert!(!var.dynamic);
    assert_eq!(var.child_count, Some(2));
    assert_eq!(registry.len(), 1);

    // Raw requests never consult the renderer.
    let raw = registry.create(&inferior, "broken", true).unwrap();
    assert!(!raw.renderer_failed);
}

#[test]
fn test_display_fallback_matches_raw_creation()
{
    ferros_utils::init_test_logging();
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let fallback = registry.create(&inferior, "broken", false).unwrap();
    let raw = registry.create(&inferior, "broken", true).unwrap();
    assert!(fallback.renderer_failed);
    assert_eq!(presentation(&fallback), presentation(&raw));
}

#[test]
fn test_evaluation_inside_renderer_falls_back()
{
    ferros_utils::init_test_logging();
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let fallback = registry.create(&inferior, "widget", false).unwrap();
    assert!(fallback.renderer_failed);
    assert_eq!(fallback.child_count, Some(2));

    let raw = registry.create(&inferior, "widget", true).unwrap();
    assert_eq!(presentation(&fallback), presentation(&raw));

    // Unknown top-level expressions are still reported.
    assert!(matches!(registry.create(&inferior, "widget_helper", false), Err(InspectError::Evaluation { .. })));
}

#[test]
fn test_children_fallback_matches_raw_listing()
{
    ferros_utils::init_test_logging();
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let faulty = registry.create(&inferior, "faulty", false).unwrap();
    let fallback = registry.list_children(&inferior, faulty.id, 0, 10, &no_raw()).unwrap();

    let raw = registry.create(&inferior, "faulty", true).unwrap();
    let direct = registry.list_children(&inferior, raw.id, 0, 10, &no_raw()).unwrap();

    assert!(fallback.renderer_failed);
    assert!(!direct.renderer_failed);
    assert_eq!(fallback.has_more, direct.has_more);
    let fallback: Vec<_> = fallback.children.iter().map(presentation).collect();
    let direct: Vec<_> = direct.children.iter().map(presentation).collect();
    assert_eq!(fallback, direct);
}

#[test]
fn test_failing_children_fall_back_and_discard_partial_page()
{
    ferros_utils::init_test_logging();
    let inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());

    let var = registry.create(&inferior, "faulty", false).unwrap();
    assert!(var.dynamic);
    assert_eq!(var.value.as_deref(), Some("faulty"));

    let page = registry.list_children(&inferior, var.id, 0, 10, &no_raw()).unwrap();
    assert!(page.renderer_failed);
    let names: Vec<_> = page.children.iter().map(|c| c.expression.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    // The two children created before the failure were discarded.
    let ids: Vec<usize> = page.children.iter().map(|c| c.id.raw()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_bool_display_follows_frame_language()
{
    let mut inferior = program();
    let mut registry = VariableRegistry::with_renderers(renderers(), InspectorConfig::default());
    assert_eq!(registry.create(&inferior, "flag", false).unwrap().value.as_deref(), Some("1"));

    select_frame(&mut inferior, "_Z4mainv");
    assert_eq!(registry.create(&inferior, "flag", false).unwrap().value.as_deref(), Some("true"));
}

#[test]
fn test_builtin_renderers_can_be_disabled()
{
    let mut inferior = MemoryInferior::new();
    let int = Type::int("int", 4, true);
    inferior.write_i32(0x1000, 1).write_i32(0x1004, 2).define("pair", Type::array(&int, 2), 0x1000);

    let mut registry = VariableRegistry::new(InspectorConfig::default().without_default_renderers());
    let var = registry.create(&inferior, "pair", false).unwrap();
    assert!(!var.dynamic);
    assert_eq!(var.child_count, Some(2));
    assert_eq!(var.value.as_deref(), Some(""));
}
