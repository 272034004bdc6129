//! Structural renderers.
//!
//! Used when no specialized renderer claims a value, and for everything in
//! raw mode. They depend on the value's type only:
//!
//! | type | display | children |
//! |---|---|---|
//! | string-like (`char[N]`, `char *`) | formatted text | none |
//! | array, or array-like converted to an array | `""` | `[i]` per element |
//! | struct / union | `""` | non-artificial members |
//! | pointer / reference | address | `value`, the referent |
//! | anything else | formatted value | none |

use tracing::debug;

use super::{Capability, Child, ChildStream, DisplayValue, RenderContext, Renderer, RendererRole};
use crate::error::InspectResult;
use crate::inferior::Inferior;
use crate::types::{Field, TypeCode};
use crate::value::RawValue;

/// Structural renderer for `value`.
pub fn structural_renderer(value: &RawValue, inferior: &dyn Inferior) -> Box<dyn Renderer>
{
    let ty = value.ty().strip_typedefs();
    if ty.is_string_like() {
        return Box::new(ScalarRenderer { value: value.clone() });
    }
    match ty.code() {
        TypeCode::Array => return Box::new(ArrayRenderer::new(value.clone())),
        TypeCode::Slice => match value.to_array(inferior) {
            Ok(array) => return Box::new(ArrayRenderer::new(array)),
            Err(err) => debug!(%err, ty = %value.ty(), "Cannot view value as an array"),
        },
        TypeCode::Struct | TypeCode::Union => return Box::new(StructRenderer { value: value.clone() }),
        TypeCode::Pointer | TypeCode::Reference | TypeCode::RvalueReference => {
            return Box::new(PointerRenderer { value: value.clone() });
        }
        _ => {}
    }
    Box::new(ScalarRenderer { value: value.clone() })
}

struct ScalarRenderer
{
    value: RawValue,
}

impl Renderer for ScalarRenderer
{
    fn name(&self) -> &str
    {
        "structural-scalar"
    }

    fn role(&self) -> RendererRole
    {
        RendererRole::Structural
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability == Capability::Display
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Value(self.value.clone()))
    }
}

struct ArrayRenderer
{
    value: RawValue,
    bounds: Option<(i64, i64)>,
}

impl ArrayRenderer
{
    fn new(value: RawValue) -> Self
    {
        let bounds = value.ty().strip_typedefs().range();
        Self { value, bounds }
    }
}

impl Renderer for ArrayRenderer
{
    fn name(&self) -> &str
    {
        "structural-array"
    }

    fn role(&self) -> RendererRole
    {
        RendererRole::Structural
    }

    fn supports(&self, _capability: Capability) -> bool
    {
        true
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Text(String::new()))
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let (low, high) = self.bounds.unwrap_or((0, -1));
        Ok(Box::new(ElementStream::new(self.value.clone(), low, high)))
    }

    fn child_count(&self, _cx: &mut RenderContext<'_>) -> InspectResult<usize>
    {
        let (low, high) = self.bounds.unwrap_or((0, -1));
        Ok(usize::try_from(high - low + 1).unwrap_or(0))
    }

    fn display_hint(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        Ok(Some("array".to_string()))
    }
}

/// Elements `low..=high` of an array, named `[i]`.
pub(crate) struct ElementStream
{
    value: RawValue,
    next: i64,
    high: i64,
}

impl ElementStream
{
    pub(crate) fn new(value: RawValue, low: i64, high: i64) -> Self
    {
        Self { value, next: low, high }
    }
}

impl ChildStream for ElementStream
{
    fn next_child(&mut self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<Child>>
    {
        if self.next > self.high {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;
        Ok(Some(Child::new(format!("[{index}]"), self.value.element(index)?)))
    }
}

struct StructRenderer
{
    value: RawValue,
}

impl StructRenderer
{
    fn visible_fields(&self) -> Vec<Field>
    {
        let ty = self.value.ty().strip_typedefs();
        ty.fields().iter().filter(|f| !f.artificial).cloned().collect()
    }
}

impl Renderer for StructRenderer
{
    fn name(&self) -> &str
    {
        "structural-struct"
    }

    fn role(&self) -> RendererRole
    {
        RendererRole::StructuralStruct
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability != Capability::DisplayHint
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Text(String::new()))
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let value = self.value.clone();
        let mut fields = self.visible_fields().into_iter();
        Ok(Box::new(move |_cx: &mut RenderContext<'_>| -> InspectResult<Option<Child>> {
            let Some(field) = fields.next() else {
                return Ok(None);
            };
            let name = field.name.clone().unwrap_or_default();
            Ok(Some(Child::new(name, value.field(&field)?)))
        }))
    }

    fn child_count(&self, _cx: &mut RenderContext<'_>) -> InspectResult<usize>
    {
        Ok(self.visible_fields().len())
    }
}

struct PointerRenderer
{
    value: RawValue,
}

impl Renderer for PointerRenderer
{
    fn name(&self) -> &str
    {
        "structural-pointer"
    }

    fn role(&self) -> RendererRole
    {
        RendererRole::Structural
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability != Capability::DisplayHint
    }

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Ok(DisplayValue::Value(self.value.clone()))
    }

    fn children(&self, cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let referent = match self.value.dereference(cx.inferior()) {
            Ok(referent) => referent,
            Err(err) => {
                let target = self.value.ty().strip_typedefs().target().cloned().unwrap_or_else(|| self.value.ty().clone());
                RawValue::unavailable(target, &err)
            }
        };
        Ok(super::iter_stream(std::iter::once(Child::new("value", referent))))
    }

    fn child_count(&self, _cx: &mut RenderContext<'_>) -> InspectResult<usize>
    {
        Ok(1)
    }
}
