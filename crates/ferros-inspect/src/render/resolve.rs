//! Renderer resolution.
//!
//! Decides, for one value, which renderer produces its display and which
//! produces its children. The two can differ: a `Shape *` displays as a
//! pointer but expands into the members of the `Circle` it points at.
//!
//! Order of decisions for a value `v` of declared type `T`:
//!
//! 1. Raw mode: structural renderers only (group values excepted), no
//!    dynamic type.
//! 2. `T` (typedefs stripped) is a pointer or reference to a struct and the
//!    backend knows a more-derived type: cast `v` to it.
//! 3. Ask the renderer set; fall back to a structural renderer.
//! 4. Not specialized and `v` is a reference: resolve the referent instead.
//! 5. Otherwise not specialized and `T` is a typedef: resolve `v` with
//!    typedefs stripped, and keep the result only if it is specialized.
//!
//! Children are resolved on `v` with typedefs and references stripped. A
//! non-null pointer to a struct or union is replaced by its pointee.

use tracing::debug;

use super::fallback::structural_renderer;
use super::{RenderContext, Renderer};
use crate::error::InspectResult;
use crate::types::{Type, TypeCode};
use crate::value::RawValue;

/// A renderer together with the value it renders.
#[derive(Debug)]
pub struct RendererChoice
{
    pub renderer: Box<dyn Renderer>,
    /// The renderer is specialized (its output is authoritative).
    pub dynamic: bool,
    pub value: RawValue,
}

/// Pick a renderer for exactly `value`.
pub fn choose_renderer(value: &RawValue, raw: bool, cx: &mut RenderContext<'_>) -> InspectResult<RendererChoice>
{
    // Group values have no structure of their own; raw mode keeps their renderer.
    if !raw || value.is_group_marker() {
        if let Some(renderer) = cx.find_renderer(value)? {
            return Ok(RendererChoice {
                renderer,
                dynamic: true,
                value: value.clone(),
            });
        }
    }
    Ok(RendererChoice {
        renderer: structural_renderer(value, cx.inferior()),
        dynamic: false,
        value: value.clone(),
    })
}

/// Display and children renderers for one node.
#[derive(Debug)]
pub struct Resolution
{
    /// The value after dynamic-type substitution.
    pub value: RawValue,
    pub display: RendererChoice,
    pub children_value: RawValue,
    pub children: RendererChoice,
    /// Either renderer is specialized.
    pub dynamic: bool,
}

impl Resolution
{
    /// Type shown for the node: the dynamic type when one was substituted.
    pub fn ty(&self) -> &Type
    {
        self.value.ty()
    }
}

/// Resolve the display and children renderers for `value`.
///
/// # Errors
/// Failures of specialized renderer lookups, and unreadable pointers while
/// deciding whether to expand through them.
pub fn resolve(value: &RawValue, raw: bool, cx: &mut RenderContext<'_>) -> InspectResult<Resolution>
{
    let value = if raw { value.clone() } else { with_dynamic_type(value, cx) };
    let ty = value.ty().clone();
    let stripped = ty.strip_typedefs();

    let primary = choose_renderer(&value, raw, cx)?;
    let display = if !primary.dynamic && stripped.is_reference() {
        match value.dereference(cx.inferior()) {
            Ok(referent) => {
                let basic = ty.basic_type();
                choose_renderer(&referent.cast(basic), raw, cx)?
            }
            Err(err) => {
                debug!(%err, "Cannot follow reference, rendering it as is");
                primary
            }
        }
    } else if !primary.dynamic && ty.code() == TypeCode::Typedef {
        let unaliased = choose_renderer(&value.cast(stripped.clone()), raw, cx)?;
        if unaliased.dynamic { unaliased } else { primary }
    } else {
        primary
    };

    let basic = ty.basic_type();
    let mut children_value = if stripped.is_reference() {
        match value.dereference(cx.inferior()) {
            Ok(referent) => referent.cast(basic.clone()),
            Err(_) => value.clone(),
        }
    } else {
        value.cast(basic.clone())
    };
    // An unreadable pointer is kept as is, like a null one.
    if basic.code() == TypeCode::Pointer && points_to_aggregate(&basic) {
        if let Ok(false) = children_value.is_null_pointer(cx.inferior()) {
            children_value = children_value.dereference(cx.inferior())?;
        }
    }
    let children = choose_renderer(&children_value, raw, cx)?;

    let dynamic = display.dynamic || children.dynamic;
    Ok(Resolution {
        value,
        display,
        children_value,
        children,
        dynamic,
    })
}

fn points_to_aggregate(pointer: &Type) -> bool
{
    pointer
        .target()
        .is_some_and(|target| matches!(target.basic_type().code(), TypeCode::Struct | TypeCode::Union))
}

fn with_dynamic_type(value: &RawValue, cx: &RenderContext<'_>) -> RawValue
{
    let stripped = value.ty().strip_typedefs();
    let to_struct = stripped
        .target()
        .is_some_and(|target| target.strip_typedefs().code() == TypeCode::Struct);
    if !stripped.is_ptr_or_ref() || !to_struct {
        return value.clone();
    }
    match cx.inferior().dynamic_type(value) {
        Ok(Some(dynamic)) => {
            debug!(declared = %value.ty(), dynamic = %dynamic, "Using dynamic type");
            value.cast(dynamic)
        }
        Ok(None) => value.clone(),
        Err(err) => {
            debug!(%err, "Dynamic type lookup failed");
            value.clone()
        }
    }
}
