//! # Variable Registry
//!
//! Long-lived variable handles addressed by integer ids, the way a debugger
//! UI addresses the nodes of its variables tree.
//!
//! ## Operations
//!
//! | operation | effect |
//! |---|---|
//! | [`create`](VariableRegistry::create) | evaluate an expression, register a root handle |
//! | [`list_children`](VariableRegistry::list_children) | register and return a page of a handle's children |
//! | [`read`](VariableRegistry::read) | re-render a handle without registering anything |
//! | [`set_raw`](VariableRegistry::set_raw) | switch a handle between specialized and structural rendering |
//! | [`clear_all`](VariableRegistry::clear_all) | forget every handle |
//!
//! Ids are dense and assigned in creation order: the first handle is `0`,
//! and a child always has a larger id than its parent. Ids are never reused
//! until [`clear_all`](VariableRegistry::clear_all).
//!
//! ## Renderer failures
//!
//! Renderers are plugins and may fail. When creating a variable or listing
//! children fails and the request was not raw, the attempt is discarded
//! (including handles it registered) and the request runs again with
//! structural renderers only. The result carries `renderer_failed = true`.
//! A failure in raw mode is returned to the caller.
//!
//! ## Example
//!
//! ```rust
//! use ferros_inspect::backend::MemoryInferior;
//! use ferros_inspect::types::Type;
//! use ferros_inspect::{InspectorConfig, VariableRegistry};
//!
//! let mut inferior = MemoryInferior::new();
//! let int = Type::int("int", 4, true);
//! inferior.write_i32(0x1000, 7).define("answer", int, 0x1000);
//!
//! let mut registry = VariableRegistry::new(InspectorConfig::default());
//! let var = registry.create(&inferior, "answer", false).unwrap();
//! assert_eq!(var.value.as_deref(), Some("7"));
//! assert_eq!(var.type_name, "int");
//! ```

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::config::InspectorConfig;
use crate::cursor::{ChildCursor, PageWindow};
use crate::error::{InspectError, InspectResult};
use crate::events::{InferiorEvent, InferiorEventReceiver};
use crate::format::{format_value, FormatOptions};
use crate::group::GroupTable;
use crate::inferior::Inferior;
use crate::render::resolve::{choose_renderer, resolve, Resolution};
use crate::render::{Capability, DisplayValue, RenderContext, Renderer, RendererRole, RendererSet};
use crate::scope::{list_scope, ScopeListing};
use crate::types::{SymbolLanguage, TypeCode};
use crate::value::RawValue;

/// Identifier of a variable handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId
{
    pub const fn new(raw: usize) -> Self
    {
        VarId(raw)
    }

    pub const fn raw(self) -> usize
    {
        self.0
    }
}

impl fmt::Display for VarId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// A registered variable.
#[derive(Debug)]
pub struct VariableHandle
{
    id: VarId,
    expression: String,
    value: RawValue,
    children_value: RawValue,
    language: SymbolLanguage,
    parent: Option<VarId>,
    cursor: Option<ChildCursor>,
    raw: bool,
}

impl VariableHandle
{
    pub fn id(&self) -> VarId
    {
        self.id
    }

    /// Expression for roots, child name for children.
    pub fn expression(&self) -> &str
    {
        &self.expression
    }

    pub fn value(&self) -> &RawValue
    {
        &self.value
    }

    /// Value whose children this variable lists.
    pub fn children_value(&self) -> &RawValue
    {
        &self.children_value
    }

    pub fn language(&self) -> SymbolLanguage
    {
        self.language
    }

    pub fn parent(&self) -> Option<VarId>
    {
        self.parent
    }

    pub fn is_raw(&self) -> bool
    {
        self.raw
    }
}

/// Rendered state of one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRecord
{
    pub id: VarId,
    /// `v<id>`.
    pub name: String,
    /// Expression a user could type to get this value.
    pub expression: String,
    /// Display text; `None` when the renderer has nothing to show.
    pub value: Option<String>,
    pub type_name: String,
    pub display_hint: Option<String>,
    /// A specialized renderer is involved; use `has_more`, not `child_count`.
    pub dynamic: bool,
    /// Number of children (non-dynamic variables only).
    pub child_count: Option<usize>,
    /// Whether there is at least one child (dynamic variables only).
    pub has_more: Option<bool>,
    /// Rendered structurally after a renderer failed.
    pub renderer_failed: bool,
}

/// A page of children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildrenPage
{
    pub children: Vec<VarRecord>,
    /// Children exist past the page.
    pub has_more: bool,
    /// Listed structurally after a renderer failed.
    pub renderer_failed: bool,
}

/// Where a variable's value comes from when it is (re-)rendered.
struct Origin<'a>
{
    value: RawValue,
    parent: Option<VarId>,
    expression: &'a str,
    language: SymbolLanguage,
}

/// Registry of variable handles for one debugging session.
#[derive(Debug, Default)]
pub struct VariableRegistry
{
    handles: Vec<VariableHandle>,
    groups: GroupTable,
    renderers: RendererSet,
    config: InspectorConfig,
}

impl VariableRegistry
{
    /// Registry with built-in renderers only.
    pub fn new(config: InspectorConfig) -> Self
    {
        Self::with_renderers(RendererSet::new(), config)
    }

    pub fn with_renderers(renderers: RendererSet, config: InspectorConfig) -> Self
    {
        Self {
            handles: Vec::new(),
            groups: GroupTable::default(),
            renderers,
            config,
        }
    }

    pub fn renderers_mut(&mut self) -> &mut RendererSet
    {
        &mut self.renderers
    }

    pub fn config(&self) -> &InspectorConfig
    {
        &self.config
    }

    /// Number of live handles.
    pub fn len(&self) -> usize
    {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.handles.is_empty()
    }

    /// Look up a handle.
    ///
    /// # Errors
    /// [`InspectError::OutOfRange`] for unknown ids.
    pub fn handle(&self, id: VarId) -> InspectResult<&VariableHandle>
    {
        self.handles.get(id.0).ok_or(InspectError::OutOfRange {
            id: id.0,
            len: self.handles.len(),
        })
    }

    /// Variables visible in the selected frame.
    pub fn list_scope(&self, inferior: &dyn Inferior, filter: bool) -> ScopeListing
    {
        list_scope(inferior, filter)
    }

    /// Evaluate `expression` in the selected frame and register it.
    ///
    /// # Errors
    /// [`InspectError::Evaluation`] when the expression cannot be evaluated;
    /// nothing is registered.
    pub fn create(&mut self, inferior: &dyn Inferior, expression: &str, raw: bool) -> InspectResult<VarRecord>
    {
        let value = inferior.evaluate(expression).map_err(|err| InspectError::Evaluation {
            expression: expression.to_string(),
            message: err.to_string(),
        })?;
        let language = match inferior.selected_frame() {
            Ok(frame) if inferior.is_frame_valid(&frame) => frame.language,
            _ => SymbolLanguage::Unknown,
        };
        let origin = Origin {
            value,
            parent: None,
            expression,
            language,
        };
        self.make_var_with_fallback(inferior, &origin, None, raw)
    }

    /// Register and return children `from..to` of `id`.
    ///
    /// A negative bound returns every child. Children whose names appear in
    /// `raw_children` are created in raw mode.
    ///
    /// # Errors
    /// [`InspectError::OutOfRange`] for unknown ids,
    /// [`InspectError::InvalidRange`] when `from > to`.
    pub fn list_children(
        &mut self,
        inferior: &dyn Inferior,
        id: VarId,
        from: i64,
        to: i64,
        raw_children: &HashSet<String>,
    ) -> InspectResult<ChildrenPage>
    {
        let raw = self.handle(id)?.raw;
        let window = PageWindow::from_bounds(from, to)?;
        let checkpoint = self.checkpoint();
        match self.list_children_once(inferior, id, window, raw, raw_children) {
            Ok(page) => Ok(page),
            Err(err) if raw || !err.is_recoverable() => Err(err),
            Err(err) => {
                warn!(%err, var = %id, "Renderer failed while listing children, falling back to raw presentation");
                self.rollback(checkpoint);
                let mut page = self.list_children_once(inferior, id, window, true, raw_children)?;
                page.renderer_failed = true;
                Ok(page)
            }
        }
    }

    /// Render `id` again, as if it were created now.
    pub fn read(&mut self, inferior: &dyn Inferior, id: VarId) -> InspectResult<VarRecord>
    {
        let handle = self.handle(id)?;
        let expression = handle.expression.clone();
        let raw = handle.raw;
        let origin = Origin {
            value: handle.value.clone(),
            parent: handle.parent,
            expression: &expression,
            language: handle.language,
        };
        self.make_var_with_fallback(inferior, &origin, Some(id), raw)
    }

    /// Switch `id` between specialized (`false`) and structural (`true`)
    /// rendering. Takes effect on the next `read` or `list_children`.
    pub fn set_raw(&mut self, id: VarId, raw: bool) -> InspectResult<()>
    {
        let len = self.handles.len();
        let handle = self.handles.get_mut(id.0).ok_or(InspectError::OutOfRange { id: id.0, len })?;
        handle.raw = raw;
        Ok(())
    }

    /// Forget every handle. Ids restart from `0`.
    pub fn clear_all(&mut self)
    {
        debug!(handles = self.handles.len(), "Clearing variable registry");
        self.handles.clear();
    }

    /// React to a stop or resume of the inferior.
    pub fn process_event(&mut self, event: &InferiorEvent)
    {
        trace!(event = %event.describe(), "Inferior event");
        match event {
            InferiorEvent::TargetStopped { .. } => self.groups.clear(),
            InferiorEvent::TargetResumed => {
                self.groups.clear();
                if self.config.clear_handles_on_resume {
                    self.clear_all();
                }
            }
        }
    }

    /// Process every event waiting on `receiver`; returns how many there were.
    pub fn drain_events(&mut self, receiver: &InferiorEventReceiver) -> usize
    {
        let mut processed = 0;
        while let Ok(event) = receiver.try_recv() {
            self.process_event(&event);
            processed += 1;
        }
        processed
    }

    fn checkpoint(&self) -> (usize, usize)
    {
        (self.handles.len(), self.groups.len())
    }

    fn rollback(&mut self, (handles, groups): (usize, usize))
    {
        if self.handles.len() > handles {
            debug!(discarded = self.handles.len() - handles, "Discarding handles of failed attempt");
        }
        self.handles.truncate(handles);
        self.groups.truncate(groups);
    }

    fn context<'a>(&'a mut self, inferior: &'a dyn Inferior) -> RenderContext<'a>
    {
        RenderContext::new(inferior, &self.renderers, &mut self.groups, &self.config)
    }

    fn make_var_with_fallback(&mut self, inferior: &dyn Inferior, origin: &Origin<'_>, existing: Option<VarId>, raw: bool) -> InspectResult<VarRecord>
    {
        let checkpoint = self.checkpoint();
        match self.make_var(inferior, origin, existing, raw) {
            Ok(record) => Ok(record),
            Err(err) if raw || !err.is_recoverable() => Err(err),
            Err(err) => {
                warn!(%err, expression = origin.expression, "Renderer failed, falling back to raw presentation");
                self.rollback(checkpoint);
                let mut record = self.make_var(inferior, origin, existing, true)?;
                record.renderer_failed = true;
                Ok(record)
            }
        }
    }

    /// Resolve and render one variable. Registers it unless `existing` names
    /// the handle being re-read.
    fn make_var(&mut self, inferior: &dyn Inferior, origin: &Origin<'_>, existing: Option<VarId>, raw: bool) -> InspectResult<VarRecord>
    {
        let expression = match origin.parent {
            Some(parent) => {
                let parent_children = self.handle(parent)?.children_value.ty().strip_typedefs();
                if parent_children.code() == TypeCode::Pointer {
                    format!("*{}", self.handle(parent)?.expression)
                } else {
                    origin.expression.to_string()
                }
            }
            None => origin.expression.to_string(),
        };

        let (resolution, rendered) = {
            let mut cx = self.context(inferior);
            let resolution = resolve(&origin.value, raw, &mut cx)?;
            let rendered = render(&resolution, raw, origin.language, &mut cx)?;
            (resolution, rendered)
        };

        let id = match existing {
            Some(id) => id,
            None => {
                let id = VarId(self.handles.len());
                self.handles.push(VariableHandle {
                    id,
                    expression: origin.expression.to_string(),
                    value: origin.value.clone(),
                    children_value: resolution.children_value.clone(),
                    language: origin.language,
                    parent: origin.parent,
                    cursor: None,
                    raw,
                });
                id
            }
        };

        Ok(VarRecord {
            id,
            name: format!("v{id}"),
            expression,
            value: rendered.value,
            type_name: resolution.ty().to_string(),
            display_hint: rendered.display_hint,
            dynamic: resolution.dynamic,
            child_count: rendered.child_count,
            has_more: rendered.has_more,
            renderer_failed: false,
        })
    }

    fn list_children_once(
        &mut self,
        inferior: &dyn Inferior,
        id: VarId,
        window: PageWindow,
        raw: bool,
        raw_children: &HashSet<String>,
    ) -> InspectResult<ChildrenPage>
    {
        let len = self.handles.len();
        let handle = self.handles.get_mut(id.0).ok_or(InspectError::OutOfRange { id: id.0, len })?;
        let cached = handle.cursor.take();
        let children_value = handle.children_value.clone();
        let language = handle.language;

        let mut cursor = match cached.filter(|cursor| cursor.can_serve(window.start(), raw)) {
            Some(cursor) => cursor,
            None => {
                debug!(var = %id, raw, start = window.start(), "Building child cursor");
                let mut cx = self.context(inferior);
                let choice = choose_renderer(&children_value, raw, &mut cx)?;
                if !choice.renderer.supports(Capability::Children) {
                    return Ok(ChildrenPage {
                        children: Vec::new(),
                        has_more: false,
                        renderer_failed: false,
                    });
                }
                let stream = choice.renderer.children(&mut cx)?;
                ChildCursor::new(stream, raw)
            }
        };

        cursor.skip_to(window.start(), &mut self.context(inferior))?;
        let mut children = Vec::new();
        while window.contains(cursor.consumed()) {
            let Some(child) = cursor.next(&mut self.context(inferior))? else {
                break;
            };
            let origin = Origin {
                value: child.value,
                parent: Some(id),
                expression: &child.name,
                language,
            };
            let child_raw = raw_children.contains(&child.name);
            children.push(self.make_var_with_fallback(inferior, &origin, None, child_raw)?);
        }
        let has_more = cursor.has_more(&mut self.context(inferior))?;
        trace!(var = %id, listed = children.len(), has_more, "Listed children");

        if let Some(handle) = self.handles.get_mut(id.0) {
            handle.cursor = Some(cursor);
        }
        Ok(ChildrenPage {
            children,
            has_more,
            renderer_failed: false,
        })
    }
}

/// Display-related fields of a record.
struct Rendered
{
    value: Option<String>,
    display_hint: Option<String>,
    child_count: Option<usize>,
    has_more: Option<bool>,
}

/// Intermediate display before language-specific presentation.
enum Shown
{
    Text(String),
    Bool(bool),
}

fn render(resolution: &Resolution, raw: bool, language: SymbolLanguage, cx: &mut RenderContext<'_>) -> InspectResult<Rendered>
{
    let display = &resolution.display.renderer;
    let children = &resolution.children.renderer;

    let shown = if display.supports(Capability::Display) {
        let mut shown = display_text(display.as_ref(), cx)?;
        if let Some(Shown::Text(text)) = &mut shown {
            if let Some(pointee) = pointee_display(resolution, raw, cx)? {
                text.push(' ');
                text.push_str(&pointee);
            }
        }
        shown
    } else if children.supports(Capability::Children) {
        Some(Shown::Text("{...}".to_string()))
    } else {
        Some(Shown::Text(String::new()))
    };

    let value = shown.map(|shown| match shown {
        Shown::Text(text) if text.is_empty() && language.is_c_family() && display.role() == RendererRole::StructuralStruct => "{...}".to_string(),
        Shown::Text(text) => text,
        Shown::Bool(flag) if language.is_c_family() => flag.to_string(),
        Shown::Bool(flag) => u8::from(flag).to_string(),
    });

    let display_hint = if display.supports(Capability::DisplayHint) {
        display.display_hint(cx).unwrap_or_else(|err| {
            let renderer = display.name();
            debug!(%err, renderer, "Ignoring display hint failure");
            None
        })
    } else {
        None
    };

    let (child_count, has_more) = if resolution.dynamic {
        let has_more = if children.supports(Capability::Children) {
            Some(children.children(cx)?.next_child(cx)?.is_some())
        } else {
            None
        };
        (None, has_more)
    } else {
        (Some(count_children(resolution, cx)?), None)
    };

    Ok(Rendered {
        value,
        display_hint,
        child_count,
        has_more,
    })
}

fn display_text(renderer: &dyn Renderer, cx: &mut RenderContext<'_>) -> InspectResult<Option<Shown>>
{
    Ok(match renderer.display(cx)? {
        DisplayValue::Text(text) => Some(Shown::Text(text)),
        DisplayValue::Bool(flag) => Some(Shown::Bool(flag)),
        DisplayValue::Value(value) => Some(Shown::Text(format_value(cx.inferior(), &value, &FormatOptions::from(cx.config())))),
        DisplayValue::Absent => None,
    })
}

/// Display of a pointee appended after a delegated pointer's address.
fn pointee_display(resolution: &Resolution, raw: bool, cx: &mut RenderContext<'_>) -> InspectResult<Option<String>>
{
    let is_pointer = resolution.value.ty().strip_typedefs().code() == TypeCode::Pointer;
    if raw || !is_pointer || resolution.display.renderer.role() != RendererRole::PointerDelegate {
        return Ok(None);
    }
    let Ok(pointee) = resolution.value.dereference(cx.inferior()) else {
        return Ok(None);
    };
    let choice = choose_renderer(&pointee, raw, cx)?;
    if !choice.dynamic || !choice.renderer.supports(Capability::Display) {
        return Ok(None);
    }
    Ok(match display_text(choice.renderer.as_ref(), cx)? {
        Some(Shown::Text(text)) => Some(text),
        Some(Shown::Bool(flag)) => Some(flag.to_string()),
        None => Some("None".to_string()),
    })
}

fn count_children(resolution: &Resolution, cx: &mut RenderContext<'_>) -> InspectResult<usize>
{
    let ty = resolution.children_value.ty().strip_typedefs();
    if let Some(target) = ty.target().filter(|_| ty.code() == TypeCode::Pointer) {
        let target = target.strip_typedefs().code();
        return Ok(usize::from(!matches!(target, TypeCode::Function | TypeCode::Void)));
    }
    let renderer = &resolution.children.renderer;
    if renderer.supports(Capability::ChildCount) {
        return renderer.child_count(cx);
    }
    if renderer.supports(Capability::Children) {
        let mut stream = renderer.children(cx)?;
        let mut count = 0;
        while stream.next_child(cx)?.is_some() {
            count += 1;
        }
        return Ok(count);
    }
    Ok(0)
}
