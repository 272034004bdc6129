//! Lazy child cursor.
//!
//! Wraps a renderer's [`ChildStream`] with a consumed-count and one child of
//! lookahead. A variable keeps its cursor between page requests so that
//! reading `[0, 50)` then `[50, 100)` pulls each child once.
//!
//! Streams cannot seek backwards. A request starting before the cursor's
//! position needs a fresh stream; see [`ChildCursor::can_serve`].

use tracing::trace;

use crate::error::{InspectError, InspectResult};
use crate::render::{Child, ChildStream, RenderContext};

/// Requested slice of a variable's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWindow
{
    /// Every child from the first.
    All,
    /// Children `start..end`.
    Range
    {
        start: usize,
        end: usize,
    },
}

impl PageWindow
{
    /// Validate a `from`/`to` request. A negative bound asks for everything.
    ///
    /// # Errors
    /// [`InspectError::InvalidRange`] when `from > to`.
    pub fn from_bounds(from: i64, to: i64) -> InspectResult<Self>
    {
        if from > to {
            return Err(InspectError::InvalidRange { from, to });
        }
        match (usize::try_from(from), usize::try_from(to)) {
            (Ok(start), Ok(end)) => Ok(PageWindow::Range { start, end }),
            _ => Ok(PageWindow::All),
        }
    }

    pub fn start(self) -> usize
    {
        match self {
            PageWindow::All => 0,
            PageWindow::Range { start, .. } => start,
        }
    }

    /// Whether a child at `index` falls inside the window.
    pub fn contains(self, index: usize) -> bool
    {
        match self {
            PageWindow::All => true,
            PageWindow::Range { start, end } => index >= start && index < end,
        }
    }
}

/// Forward-only position in a child stream.
pub struct ChildCursor
{
    stream: Box<dyn ChildStream>,
    consumed: usize,
    pending: Option<Child>,
    exhausted: bool,
    raw: bool,
}

impl std::fmt::Debug for ChildCursor
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("ChildCursor")
            .field("consumed", &self.consumed)
            .field("buffered", &self.pending.is_some())
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

impl ChildCursor
{
    /// Cursor at the start of `stream`, built in `raw` mode or not.
    pub fn new(stream: Box<dyn ChildStream>, raw: bool) -> Self
    {
        Self {
            stream,
            consumed: 0,
            pending: None,
            exhausted: false,
            raw,
        }
    }

    /// Children handed out so far.
    pub fn consumed(&self) -> usize
    {
        self.consumed
    }

    /// Mode the stream was built for.
    pub fn is_raw(&self) -> bool
    {
        self.raw
    }

    /// Whether this cursor can serve a page starting at `start` in `raw` mode.
    pub fn can_serve(&self, start: usize, raw: bool) -> bool
    {
        self.raw == raw && self.consumed <= start
    }

    /// Consume the next child.
    pub fn next(&mut self, cx: &mut RenderContext<'_>) -> InspectResult<Option<Child>>
    {
        let child = match self.pending.take() {
            Some(child) => Some(child),
            None => self.pull(cx)?,
        };
        if child.is_some() {
            self.consumed += 1;
        }
        Ok(child)
    }

    /// Whether another child exists, buffering it without consuming it.
    pub fn has_more(&mut self, cx: &mut RenderContext<'_>) -> InspectResult<bool>
    {
        if self.pending.is_none() {
            self.pending = self.pull(cx)?;
        }
        Ok(self.pending.is_some())
    }

    /// Consume children until `index` children have been consumed or the
    /// stream ends.
    pub fn skip_to(&mut self, index: usize, cx: &mut RenderContext<'_>) -> InspectResult<()>
    {
        if self.consumed < index {
            trace!(from = self.consumed, to = index, "Fast-forwarding child cursor");
        }
        while self.consumed < index {
            if self.next(cx)?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn pull(&mut self, cx: &mut RenderContext<'_>) -> InspectResult<Option<Child>>
    {
        if self.exhausted {
            return Ok(None);
        }
        let child = self.stream.next_child(cx)?;
        self.exhausted = child.is_none();
        Ok(child)
    }
}
