//! Tests for variable handles and paging

use std::collections::HashSet;

use ferros_inspect::backend::MemoryInferior;
use ferros_inspect::events::{event_channel, InferiorEvent, StopReason};
use ferros_inspect::inferior::{BlockSymbol, LexicalBlock};
use ferros_inspect::types::{Address, Field, SourceLocation, StackFrame, SymbolName, Type};
use ferros_inspect::{InspectError, InspectorConfig, VarId, VariableRegistry};

fn no_raw() -> HashSet<String>
{
    HashSet::new()
}

/// `int numbers[10]` holding `0, 10, .., 90`.
fn numbers() -> MemoryInferior
{
    let mut inferior = MemoryInferior::new();
    let int = Type::int("int", 4, true);
    for i in 0..10u32 {
        inferior.write_i32(0x1000 + u64::from(i) * 4, i32::try_from(i * 10).unwrap());
    }
    inferior.define("numbers", Type::array(&int, 10), 0x1000);
    inferior
}

fn names(page: &ferros_inspect::ChildrenPage) -> Vec<String>
{
    page.children.iter().map(|child| child.expression.clone()).collect()
}

#[test]
fn test_create_array()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());

    let var = registry.create(&inferior, "numbers", false).unwrap();
    assert_eq!(var.id, VarId::new(0));
    assert_eq!(var.name, "v0");
    assert_eq!(var.expression, "numbers");
    assert_eq!(var.type_name, "int [10]");
    assert_eq!(var.value.as_deref(), Some("{...}"));
    assert_eq!(var.display_hint.as_deref(), Some("array"));
    assert!(var.dynamic);
    assert_eq!(var.has_more, Some(true));
    assert_eq!(var.child_count, None);
    assert!(!var.renderer_failed);
}

#[test]
fn test_pages_continue_where_previous_ended()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();

    let first = registry.list_children(&inferior, root.id, 0, 3, &no_raw()).unwrap();
    assert_eq!(names(&first), vec!["[0]", "[1]", "[2]"]);
    assert!(first.has_more);

    let second = registry.list_children(&inferior, root.id, 3, 10, &no_raw()).unwrap();
    assert_eq!(second.children.len(), 7);
    assert_eq!(second.children[0].expression, "[3]");
    assert_eq!(second.children[6].value.as_deref(), Some("90"));
    assert!(!second.has_more);

    let ids: Vec<usize> = first.children.iter().chain(&second.children).map(|c| c.id.raw()).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
}

#[test]
fn test_page_is_a_slice_of_all_children()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();

    let all = registry.list_children(&inferior, root.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(all.children.len(), 10);
    assert!(!all.has_more);

    // Starts before the cursor position, so the stream is rebuilt.
    let page = registry.list_children(&inferior, root.id, 4, 6, &no_raw()).unwrap();
    assert_eq!(names(&page), names(&all)[4..6].to_vec());
    let values: Vec<_> = page.children.iter().map(|c| c.value.clone()).collect();
    assert_eq!(values, vec![Some("40".to_string()), Some("50".to_string())]);
    assert!(page.has_more);
}

#[test]
fn test_empty_and_past_end_pages()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();

    let empty = registry.list_children(&inferior, root.id, 2, 2, &no_raw()).unwrap();
    assert!(empty.children.is_empty());
    assert!(empty.has_more);

    let past = registry.list_children(&inferior, root.id, 20, 30, &no_raw()).unwrap();
    assert!(past.children.is_empty());
    assert!(!past.has_more);
}

#[test]
fn test_wrong_bounds()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();

    let err = registry.list_children(&inferior, root.id, 5, 2, &no_raw()).unwrap_err();
    assert_eq!(err, InspectError::InvalidRange { from: 5, to: 2 });
    assert_eq!(err.to_string(), "Wrong bounds: from=5, to=2");
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_ids_invalid_after_clear_all()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();
    registry.clear_all();

    let err = registry.read(&inferior, root.id).unwrap_err();
    assert_eq!(err.to_string(), "Var id is out of bounds: 0");
    assert!(registry.list_children(&inferior, root.id, 0, 1, &no_raw()).is_err());

    // Ids restart from zero.
    let again = registry.create(&inferior, "numbers", false).unwrap();
    assert_eq!(again.id, VarId::new(0));
}

#[test]
fn test_read_is_idempotent()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();
    let page = registry.list_children(&inferior, root.id, 0, 2, &no_raw()).unwrap();
    let before = registry.len();

    assert_eq!(registry.read(&inferior, root.id).unwrap(), root);
    assert_eq!(registry.read(&inferior, page.children[1].id).unwrap(), page.children[1]);
    assert_eq!(registry.len(), before);
}

#[test]
fn test_evaluation_error()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let err = registry.create(&inferior, "nope", false).unwrap_err();
    assert!(matches!(err, InspectError::Evaluation { ref expression, .. } if expression == "nope"));
    assert!(registry.is_empty());
}

#[test]
fn test_struct_members_skip_artificial()
{
    let mut inferior = MemoryInferior::new();
    let int = Type::int("int", 4, true);
    let widget = Type::structure(
        "Widget",
        16,
        vec![
            Field::artificial("_vptr.Widget", int.pointer_to(), 0),
            Field::new("width", int.clone(), 8),
            Field::new("height", int, 12),
        ],
    );
    inferior.write_u64(0x1000, 0).write_i32(0x1008, 640).write_i32(0x100c, 480);
    inferior.define("w", widget, 0x1000);

    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let var = registry.create(&inferior, "w", false).unwrap();
    assert!(!var.dynamic);
    assert_eq!(var.child_count, Some(2));
    assert_eq!(var.value.as_deref(), Some(""));

    let page = registry.list_children(&inferior, var.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(names(&page), vec!["width", "height"]);
    assert_eq!(page.children[1].value.as_deref(), Some("480"));
}

#[test]
fn test_c_family_struct_display()
{
    let mut inferior = MemoryInferior::new();
    let int = Type::int("int", 4, true);
    let point = Type::structure("Point", 8, vec![Field::new("x", int.clone(), 0), Field::new("y", int, 4)]);
    inferior.write_i32(0x1000, 1).write_i32(0x1004, 2).define("origin", point, 0x1000);
    let frame = StackFrame::new(1, 0, Address::from(0x401000))
        .with_function(SymbolName::from_linkage("_Z4drawv"))
        .with_location(SourceLocation::new("draw.cpp", 12));
    let blocks = vec![LexicalBlock::function(
        SymbolName::from_linkage("_Z4drawv"),
        vec![BlockSymbol::local("origin", "draw.cpp", 3)],
    )];
    inferior.select_frame(frame, blocks);

    let mut registry = VariableRegistry::new(InspectorConfig::default());
    assert_eq!(registry.list_scope(&inferior, true).variables, vec!["origin"]);

    let var = registry.create(&inferior, "origin", false).unwrap();
    assert_eq!(var.value.as_deref(), Some("{...}"));
    assert_eq!(var.child_count, Some(2));
}

#[test]
fn test_pointer_to_struct_expands_pointee()
{
    let mut inferior = MemoryInferior::new();
    let int = Type::int("int", 4, true);
    let point = Type::structure("Point", 8, vec![Field::new("x", int.clone(), 0), Field::new("y", int, 4)]);
    inferior
        .write_i32(0x2000, 3)
        .write_i32(0x2004, 4)
        .write_u64(0x3000, 0x2000)
        .write_u64(0x3008, 0)
        .define("p", point.pointer_to(), 0x3000)
        .define("none", point.pointer_to(), 0x3008);

    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let p = registry.create(&inferior, "p", false).unwrap();
    assert_eq!(p.type_name, "Point *");
    assert_eq!(p.value.as_deref(), Some("0x2000"));
    assert_eq!(p.child_count, Some(2));

    let page = registry.list_children(&inferior, p.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(names(&page), vec!["x", "y"]);
    assert_eq!(page.children[0].value.as_deref(), Some("3"));

    // A null pointer is not expanded through; it has the pointee as its child.
    let none = registry.create(&inferior, "none", false).unwrap();
    assert_eq!(none.value.as_deref(), Some("0x0"));
    assert_eq!(none.child_count, Some(1));
    let page = registry.list_children(&inferior, none.id, -1, -1, &no_raw()).unwrap();
    assert_eq!(page.children.len(), 1);
    assert_eq!(page.children[0].expression, "*none");
    assert_eq!(page.children[0].type_name, "Point");
}

#[test]
fn test_void_pointer_has_no_children()
{
    let mut inferior = MemoryInferior::new();
    inferior.write_u64(0x3000, 0x2000).define("opaque", Type::void().pointer_to(), 0x3000);

    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let var = registry.create(&inferior, "opaque", false).unwrap();
    assert_eq!(var.child_count, Some(0));
}

#[test]
fn test_stop_and_resume_events()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default().with_clear_handles_on_resume(true));
    registry.create(&inferior, "numbers", false).unwrap();

    let (sender, receiver) = event_channel();
    sender
        .send(InferiorEvent::TargetStopped {
            reason: StopReason::Step,
            thread: Some(1),
        })
        .unwrap();
    assert_eq!(registry.drain_events(&receiver), 1);
    assert_eq!(registry.len(), 1);

    sender.send(InferiorEvent::TargetResumed).unwrap();
    assert_eq!(registry.drain_events(&receiver), 1);
    assert!(registry.is_empty());
    assert_eq!(registry.drain_events(&receiver), 0);
}

#[test]
fn test_handles_survive_resume_by_default()
{
    let inferior = numbers();
    let mut registry = VariableRegistry::new(InspectorConfig::default());
    let root = registry.create(&inferior, "numbers", false).unwrap();

    registry.process_event(&InferiorEvent::TargetResumed);
    assert_eq!(registry.read(&inferior, root.id).unwrap().id, root.id);
}

#[test]
fn test_uninitialized_slice_length()
{
    let mut inferior = MemoryInferior::new();
    let long = Type::int("long", 8, true);
    inferior
        .write_u64(0x6000, 0x2000)
        .write_u64(0x6008, 0x4000_0000_0000_0000)
        .define("s", Type::slice(&long), 0x6000);
    let mut registry = VariableRegistry::new(InspectorConfig::default());

    let var = registry.create(&inferior, "s", false).unwrap();
    let value = var.value.unwrap();
    assert!(value.starts_with("<error: Invalid operation:"), "{value}");
    assert!(!var.dynamic);
    assert_eq!(var.child_count, Some(0));
}

#[test]
fn test_checked_array_rejects_oversized_lengths()
{
    let long = Type::int("long", 8, true);
    assert!(matches!(Type::checked_array(&long, u64::MAX), Err(InspectError::InvalidOperation(_))));
    assert!(matches!(Type::checked_array(&long, 1 << 62), Err(InspectError::InvalidOperation(_))));
    assert_eq!(Type::checked_array(&long, 3).unwrap().size(), 24);
}
