//! # Renderers
//!
//! A renderer turns a [`RawValue`] into what a variable view shows: a display
//! string, a list of named children, an optional child count and a display
//! hint. Every capability is optional; callers check
//! [`Renderer::supports`] before calling the matching method.
//!
//! ## Finding a renderer
//!
//! [`RendererSet`] holds [`RendererLookup`]s. Each lookup inspects a value
//! and either claims it (returning a renderer) or passes. They are consulted
//! in this order:
//!
//! 1. synthetic group values (always handled by [`crate::group`])
//! 2. user lookups, in registration order
//! 3. the built-in array and pointer renderers ([`defaults`]), unless
//!    disabled in [`InspectorConfig`]
//!
//! A renderer found this way is *specialized* and its output is
//! authoritative. When nothing claims a value, [`fallback`] builds a
//! structural renderer from the value's type alone.
//!
//! ## Untrusted code
//!
//! Renderers are plugins. Any method may fail; the registry catches the
//! failure and renders the value again with structural renderers only.
//!
//! ## Children
//!
//! [`Renderer::children`] returns a [`ChildStream`]: a pull-based, owned
//! sequence that may be arbitrarily long (or endless). The core pulls only
//! as many children as a page needs. Closures and iterators both make
//! streams:
//!
//! ```rust
//! use ferros_inspect::render::{iter_stream, Child, ChildStream};
//! use ferros_inspect::value::RawValue;
//!
//! let stream: Box<dyn ChildStream> = iter_stream((0..3).map(|i| Child::new(format!("[{i}]"), RawValue::text("x"))));
//! ```

pub mod defaults;
pub mod fallback;
pub mod resolve;

use std::fmt;

use tracing::debug;

use crate::config::InspectorConfig;
use crate::error::{InspectError, InspectResult};
use crate::format::{format_value, FormatOptions};
use crate::group::{self, GroupChild, GroupTable};
use crate::inferior::Inferior;
use crate::value::RawValue;

/// Optional renderer capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability
{
    Display,
    Children,
    ChildCount,
    DisplayHint,
}

/// What a renderer's display capability produced.
#[derive(Debug, Clone)]
pub enum DisplayValue
{
    Text(String),
    /// Shown as `true`/`false` in C-family frames.
    Bool(bool),
    /// Formatted structurally by the core.
    Value(RawValue),
    /// The renderer has nothing to show; the node has no value.
    Absent,
}

/// Kind of renderer, for the few presentation rules that depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererRole
{
    /// A plugin renderer for a particular type family.
    Specialized,
    /// Shows a pointer by address, its pointee's renderer supplies children.
    PointerDelegate,
    /// Structural renderer of a struct or union.
    StructuralStruct,
    /// Any other structural renderer.
    Structural,
}

/// A named child produced by a renderer.
#[derive(Debug, Clone)]
pub struct Child
{
    pub name: String,
    pub value: RawValue,
}

impl Child
{
    pub fn new(name: impl Into<String>, value: RawValue) -> Self
    {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Pull-based sequence of children.
pub trait ChildStream
{
    /// The next child, or `None` at the natural end.
    fn next_child(&mut self, cx: &mut RenderContext<'_>) -> InspectResult<Option<Child>>;
}

impl<F> ChildStream for F
where
    F: FnMut(&mut RenderContext<'_>) -> InspectResult<Option<Child>>,
{
    fn next_child(&mut self, cx: &mut RenderContext<'_>) -> InspectResult<Option<Child>>
    {
        self(cx)
    }
}

/// Stream over an iterator of children.
pub struct IterStream<I>(I);

impl<I> ChildStream for IterStream<I>
where
    I: Iterator<Item = Child>,
{
    fn next_child(&mut self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<Child>>
    {
        Ok(self.0.next())
    }
}

/// Box an iterator of children as a stream.
pub fn iter_stream<I>(iter: I) -> Box<dyn ChildStream>
where
    I: Iterator<Item = Child> + 'static,
{
    Box::new(IterStream(iter))
}

/// A value renderer.
///
/// Unsupported capabilities keep their default methods, which fail.
pub trait Renderer
{
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    fn role(&self) -> RendererRole
    {
        RendererRole::Specialized
    }

    fn supports(&self, capability: Capability) -> bool;

    fn display(&self, _cx: &mut RenderContext<'_>) -> InspectResult<DisplayValue>
    {
        Err(unsupported(self.name(), Capability::Display))
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        Err(unsupported(self.name(), Capability::Children))
    }

    fn child_count(&self, _cx: &mut RenderContext<'_>) -> InspectResult<usize>
    {
        Err(unsupported(self.name(), Capability::ChildCount))
    }

    fn display_hint(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
    {
        Ok(None)
    }
}

fn unsupported(renderer: &str, capability: Capability) -> InspectError
{
    InspectError::renderer(renderer, format!("{capability:?} is not supported"))
}

impl fmt::Debug for dyn Renderer
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "Renderer({})", self.name())
    }
}

/// Chooses a renderer for values it recognises.
pub trait RendererLookup
{
    fn name(&self) -> &str;

    /// A renderer for `value`, or `None` to let later lookups try.
    fn lookup(&self, value: &RawValue, cx: &mut RenderContext<'_>) -> InspectResult<Option<Box<dyn Renderer>>>;
}

type LookupFn = dyn Fn(&RawValue, &mut RenderContext<'_>) -> InspectResult<Option<Box<dyn Renderer>>>;

struct FnLookup
{
    name: String,
    lookup: Box<LookupFn>,
}

impl RendererLookup for FnLookup
{
    fn name(&self) -> &str
    {
        &self.name
    }

    fn lookup(&self, value: &RawValue, cx: &mut RenderContext<'_>) -> InspectResult<Option<Box<dyn Renderer>>>
    {
        (self.lookup)(value, cx)
    }
}

/// Ordered collection of renderer lookups.
pub struct RendererSet
{
    lookups: Vec<Box<dyn RendererLookup>>,
    defaults: defaults::DefaultLookup,
}

impl Default for RendererSet
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl fmt::Debug for RendererSet
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let names: Vec<&str> = self.lookups.iter().map(|l| l.name()).collect();
        f.debug_struct("RendererSet").field("lookups", &names).finish()
    }
}

impl RendererSet
{
    /// No user lookups; built-in renderers only.
    pub fn new() -> Self
    {
        Self {
            lookups: Vec::new(),
            defaults: defaults::DefaultLookup,
        }
    }

    /// Add a lookup after the existing ones.
    pub fn register(&mut self, lookup: impl RendererLookup + 'static) -> &mut Self
    {
        debug!(lookup = lookup.name(), "Registering renderer lookup");
        self.lookups.push(Box::new(lookup));
        self
    }

    /// Add a closure lookup after the existing ones.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, lookup: F) -> &mut Self
    where
        F: Fn(&RawValue, &mut RenderContext<'_>) -> InspectResult<Option<Box<dyn Renderer>>> + 'static,
    {
        self.register(FnLookup {
            name: name.into(),
            lookup: Box::new(lookup),
        })
    }

    /// Number of user lookups.
    pub fn len(&self) -> usize
    {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.lookups.is_empty()
    }

    fn find(&self, value: &RawValue, cx: &mut RenderContext<'_>) -> InspectResult<Option<Box<dyn Renderer>>>
    {
        if value.is_group_marker() {
            return group::lookup(value, cx).map(Some);
        }
        for lookup in &self.lookups {
            if let Some(renderer) = lookup.lookup(value, cx)? {
                debug!(lookup = lookup.name(), renderer = renderer.name(), ty = %value.ty(), "Specialized renderer found");
                return Ok(Some(renderer));
            }
        }
        if cx.config.default_renderers {
            return self.defaults.lookup(value, cx);
        }
        Ok(None)
    }
}

/// Everything a renderer may use while it runs.
pub struct RenderContext<'a>
{
    inferior: &'a dyn Inferior,
    renderers: &'a RendererSet,
    groups: &'a mut GroupTable,
    config: &'a InspectorConfig,
}

impl<'a> RenderContext<'a>
{
    pub fn new(inferior: &'a dyn Inferior, renderers: &'a RendererSet, groups: &'a mut GroupTable, config: &'a InspectorConfig) -> Self
    {
        Self {
            inferior,
            renderers,
            groups,
            config,
        }
    }

    pub fn inferior(&self) -> &'a dyn Inferior
    {
        self.inferior
    }

    pub fn config(&self) -> &InspectorConfig
    {
        self.config
    }

    pub(crate) fn groups(&self) -> &GroupTable
    {
        self.groups
    }

    /// Structural text of `value`.
    pub fn format(&self, value: &RawValue) -> String
    {
        format_value(self.inferior, value, &FormatOptions::from(self.config))
    }

    /// The specialized renderer the full lookup chain picks for `value`.
    pub fn find_renderer(&mut self, value: &RawValue) -> InspectResult<Option<Box<dyn Renderer>>>
    {
        let renderers = self.renderers;
        renderers.find(value, self)
    }

    /// Allocate a synthetic group value over `children`.
    ///
    /// The value is valid until the inferior next stops or resumes.
    pub fn create_group(&mut self, children: Vec<GroupChild>) -> RawValue
    {
        self.groups.create_group(children)
    }
}
