//! Built-in renderers, consulted after user lookups.
//!
//! - Arrays get an [`ArrayRenderer`]: children are produced by index
//!   arithmetic, so paging a million-element array costs only the page.
//! - Character arrays additionally display as text.
//! - Pointers to things that have a specialized renderer are shown by
//!   address, with the pointee's children. A `std::vector<int> *` expands
//!   straight into the vector's elements.

use tracing::debug;

use super::fallback::ElementStream;
use super::{Capability, ChildStream, DisplayValue, RenderContext, Renderer, RendererLookup, RendererRole};
use crate::error::InspectResult;
use crate::format::{array_text, FormatOptions};
use crate::types::{Type, TypeCode, TypeKind};
use crate::value::RawValue;

/// Lookup for the built-in renderers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLookup;

impl RendererLookup for DefaultLookup
{
    fn name(&self) -> &str
    {
        "builtin"
    }

    fn lookup(&self, value: &RawValue, cx: &mut RenderContext<'_>) -> InspectResult<Option<Box<dyn Renderer>>>
    {
        let ty = value.ty().untypedef();
        match ty.kind() {
            TypeKind::Array { .. } => {
                let renderer = ArrayRenderer::new(value.clone(), &ty);
                if ty.is_string_like() {
                    return Ok(Some(Box::new(StringLikeArrayRenderer(renderer))));
                }
                Ok(Some(Box::new(renderer)))
            }
            TypeKind::Pointer(target) if delegates_to_pointee(target) => {
                let Ok(pointee) = value.coerce_ref(cx.inferior()).and_then(|pointer| pointer.dereference(cx.inferior())) else {
                    return Ok(None);
                };
                if let Err(err) = pointee.fetch_lazy(cx.inferior()) {
                    debug!(%err, "Pointee is unreadable, no delegate");
                    return Ok(None);
                }
                Ok(cx.find_renderer(&pointee)?.map(|delegate| {
                    Box::new(PointerDelegateRenderer {
                        pointer: value.clone(),
                        delegate,
                    }) as Box<dyn Renderer>
                }))
            }
            _ => Ok(None),
        }
    }
}

fn delegates_to_pointee(target: &Type) -> bool
{
    !matches!(
        target.untypedef().code(),
        TypeCode::Void | TypeCode::Char | TypeCode::Int | TypeCode::Pointer | TypeCode::Array
    )
}

/// Children of an array by index.
///
/// Bounds come from the type; arrays with unknown bounds use
/// `size / element size` starting at zero.
pub struct ArrayRenderer
{
    value: RawValue,
    low: i64,
    high: i64,
}

impl ArrayRenderer
{
    fn new(value: RawValue, ty: &Type) -> Self
    {
        let (low, high) = ty.range().unwrap_or((0, -1));
        Self { value, low, high }
    }
}

impl Renderer for ArrayRenderer
{
    fn name(&self) -> &str
    {
        "array"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        matches!(capability, Capability::Children | Capability::DisplayHint)
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        Ok(Box::new(ElementStream::new(self.value.clone(), self.low, self.high)))
    }

    fn display_hint(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        Ok(Some("array".to_string()))
    }
}

/// [`ArrayRenderer`] that also displays the array as a C string.
pub struct StringLikeArrayRenderer(ArrayRenderer);

impl Renderer for StringLikeArrayRenderer
{
    fn name(&self) -> &str
    {
        "string-array"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        capability == Capability::Display || self.0.supports(capability)
    }

    fn display(&self, cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        let options = FormatOptions::from(cx.config());
        match array_text(cx.inferior(), &self.0.value, &options) {
            Ok(text) => Ok(DisplayValue::Text(text)),
            Err(err) => {
                debug!(%err, "Unreadable character array");
                Ok(DisplayValue::Text("{...}".to_string()))
            }
        }
    }

    fn children(&self, cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        self.0.children(cx)
    }

    fn display_hint(&self, cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        self.0.display_hint(cx)
    }
}

/// A pointer shown by address, expanded through its pointee's renderer.
pub struct PointerDelegateRenderer
{
    pointer: RawValue,
    delegate: Box<dyn Renderer>,
}

impl PointerDelegateRenderer
{
    fn address_text(&self, cx: &RenderContext<'_>) -> InspectResult<String>
    {
        Ok(self.pointer.coerce_ref(cx.inferior())?.pointer_value(cx.inferior())?.to_string())
    }
}

impl Renderer for PointerDelegateRenderer
{
    fn name(&self) -> &str
    {
        "pointer"
    }

    fn role(&self) -> RendererRole
    {
        RendererRole::PointerDelegate
    }

    fn supports(&self, capability: Capability) -> bool
    {
        match capability {
            Capability::Display | Capability::DisplayHint => true,
            Capability::Children => self.delegate.supports(Capability::Children),
            Capability::ChildCount => false,
        }
    }

    fn display(&self, cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        self.address_text(cx).map(DisplayValue::Text)
    }

    fn children(&self, cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        self.delegate.children(cx)
    }

    fn display_hint(&self, cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        let delegate_hint = if self.delegate.supports(Capability::DisplayHint) {
            self.delegate.display_hint(cx).unwrap_or_default()
        } else {
            None
        };
        Ok(Some(format!("{}={}", delegate_hint.unwrap_or_default(), self.address_text(cx)?)))
    }
}
