//! # Group Values
//!
//! Synthetic nodes that do not correspond to one value in the inferior:
//! the key/value pairs of a hash map, a "Raw View" bucket, a `[0..999]`
//! range of a huge container.
//!
//! A renderer builds [`GroupChild`]ren and calls
//! [`RenderContext::create_group`]. That stores the children in a
//! [`GroupTable`] slot and returns a [`RawValue`] of a reserved marker type
//! that carries the slot number. The renderer yields that value like any
//! other child; when the core later resolves it, the renderer set recognises
//! the marker and serves the slot's children.
//!
//! ## Lifetime
//!
//! Slots are only valid within one stopped interval. The registry clears
//! the table whenever the inferior stops or resumes, and the renderers
//! re-create groups on the next expansion. A marker from an earlier
//! interval fails with [`InspectError::StaleGroupValue`].
//!
//! ## Names
//!
//! Group children are named for display, with keys possibly sent by the
//! renderer in an encoded form (see [`EncodedText`]). Names of nested groups
//! start with [`GROUP_NAME_PREFIX`] so a client can tell them apart from
//! ordinary members.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{InspectError, InspectResult};
use crate::render::{Capability, Child, ChildStream, RenderContext, Renderer};
use crate::types::Type;
use crate::value::RawValue;

/// Prefix marking the display name of a nested group.
pub const GROUP_NAME_PREFIX: &str = "__group_value:";

static GROUP_MARKER_TYPE: Lazy<Type> = Lazy::new(Type::group_marker);

/// Encodings with a fixed `<tag>` presentation.
const SENTINELS: [&str; 11] = [
    "empty",
    "undefined",
    "null",
    "notaccessible",
    "optimizedout",
    "nullreference",
    "emptystructure",
    "uninitialized",
    "invalid",
    "notcallable",
    "outofscope",
];

/// How a key or summary string is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding
{
    Utf8,
    Utf16,
    Latin1,
    /// Decimal item count: `<N items>`.
    ItemCount,
    /// Decimal lower bound on an item count: `<at least N items>`.
    MinimumItemCount,
    /// One of the fixed sentinels, shown as `<tag>`.
    Sentinel(&'static str),
    Other(String),
}

impl FromStr for Encoding
{
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let lower = s.to_lowercase();
        Ok(match lower.as_str() {
            "utf8" => Encoding::Utf8,
            "utf16" => Encoding::Utf16,
            "latin1" => Encoding::Latin1,
            "itemcount" => Encoding::ItemCount,
            "minimumitemcount" => Encoding::MinimumItemCount,
            tag => match SENTINELS.iter().find(|sentinel| **sentinel == tag) {
                Some(sentinel) => Encoding::Sentinel(sentinel),
                None => Encoding::Other(s.to_string()),
            },
        })
    }
}

impl fmt::Display for Encoding
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Encoding::Utf8 => f.write_str("utf8"),
            Encoding::Utf16 => f.write_str("utf16"),
            Encoding::Latin1 => f.write_str("latin1"),
            Encoding::ItemCount => f.write_str("itemcount"),
            Encoding::MinimumItemCount => f.write_str("minimumitemcount"),
            Encoding::Sentinel(tag) => f.write_str(tag),
            Encoding::Other(tag) => f.write_str(tag),
        }
    }
}

/// A string as a renderer produced it, plus its encoding.
///
/// ```rust
/// use ferros_inspect::group::{EncodedText, Encoding};
///
/// assert_eq!(EncodedText::plain("key").decode(), "key");
/// assert_eq!(EncodedText::encoded("3", Encoding::ItemCount).decode(), "<3 items>");
/// assert_eq!(EncodedText::encoded("6869", Encoding::Utf8).decode(), "\"hi\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText
{
    pub raw: String,
    pub encoding: Option<Encoding>,
}

impl EncodedText
{
    pub fn plain(raw: impl Into<String>) -> Self
    {
        Self {
            raw: raw.into(),
            encoding: None,
        }
    }

    pub fn encoded(raw: impl Into<String>, encoding: Encoding) -> Self
    {
        Self {
            raw: raw.into(),
            encoding: Some(encoding),
        }
    }

    /// Display form.
    pub fn decode(&self) -> String
    {
        let Some(encoding) = &self.encoding else {
            return self.raw.clone();
        };
        let decoded = match encoding {
            Encoding::ItemCount => Some(format!("<{} items>", self.raw)),
            Encoding::MinimumItemCount => Some(format!("<at least {} items>", self.raw)),
            Encoding::Utf8 | Encoding::Utf16 | Encoding::Latin1 => decode_text(&self.raw, encoding).map(|text| format!("\"{text}\"")),
            Encoding::Sentinel(tag) => Some(format!("<{tag}>")),
            Encoding::Other(_) => None,
        };
        decoded.unwrap_or_else(|| format!("<{}, encoding={encoding}>", self.raw))
    }
}

fn decode_hex(raw: &str) -> Option<Vec<u8>>
{
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|i| raw.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

fn decode_text(raw: &str, encoding: &Encoding) -> Option<String>
{
    let bytes = decode_hex(raw)?;
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes).ok(),
        Encoding::Utf16 => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
            String::from_utf16(&units).ok()
        }
        Encoding::Latin1 => Some(bytes.into_iter().map(char::from).collect()),
        _ => None,
    }
}

/// What a group child resolves to.
#[derive(Debug, Clone)]
enum GroupEntry
{
    /// An ordinary value.
    Value(RawValue),
    /// A nested group.
    Group(Vec<GroupChild>),
    /// Nothing to show; rendered as an empty string.
    Empty,
}

/// One child of a group value.
#[derive(Debug, Clone)]
pub struct GroupChild
{
    name: String,
    key: Option<EncodedText>,
    key_prefix: String,
    summary: Option<EncodedText>,
    entry: GroupEntry,
}

impl GroupChild
{
    /// A child backed by an ordinary value.
    pub fn value(name: impl Into<String>, value: RawValue) -> Self
    {
        Self::with_entry(name.into(), GroupEntry::Value(value))
    }

    /// A child named `[index]`.
    pub fn indexed(index: usize, value: RawValue) -> Self
    {
        Self::value(format!("[{index}]"), value)
    }

    /// A child with no value.
    pub fn empty(name: impl Into<String>) -> Self
    {
        Self::with_entry(name.into(), GroupEntry::Empty)
    }

    /// A nested group, e.g. one entry of a map with its own children.
    pub fn group(name: impl Into<String>, children: Vec<GroupChild>) -> Self
    {
        Self::with_entry(name.into(), GroupEntry::Group(children))
    }

    /// A nested group named after a key, e.g. `"alice" = 42`.
    pub fn keyed(key: EncodedText, children: Vec<GroupChild>) -> Self
    {
        Self {
            key: Some(key),
            ..Self::group(String::new(), children)
        }
    }

    /// Text shown before a decoded key.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self
    {
        self.key_prefix = prefix.into();
        self
    }

    /// Inline value shown after a key: `key = summary`.
    #[must_use]
    pub fn with_summary(mut self, summary: EncodedText) -> Self
    {
        self.summary = Some(summary);
        self
    }

    fn with_entry(name: String, entry: GroupEntry) -> Self
    {
        Self {
            name,
            key: None,
            key_prefix: String::new(),
            summary: None,
            entry,
        }
    }

    /// Name shown for this child.
    pub fn display_name(&self) -> String
    {
        if !matches!(self.entry, GroupEntry::Group(_)) {
            return self.name.clone();
        }
        let name = match &self.key {
            Some(key) => {
                let mut name = format!("{}{}", self.key_prefix, key.decode());
                if let Some(summary) = &self.summary {
                    name.push_str(" = ");
                    name.push_str(&summary.decode());
                }
                name
            }
            None => self.name.clone(),
        };
        format!("{GROUP_NAME_PREFIX}{name}")
    }

    fn to_value(&self, cx: &mut RenderContext<'_>) -> RawValue
    {
        match &self.entry {
            GroupEntry::Value(value) => value.clone(),
            GroupEntry::Group(children) => cx.create_group(children.clone()),
            GroupEntry::Empty => RawValue::text(""),
        }
    }
}

/// Side table of live group values.
#[derive(Debug, Default)]
pub struct GroupTable
{
    slots: Vec<Arc<[GroupChild]>>,
}

impl GroupTable
{
    /// Store `children` and return the marker value addressing them.
    pub fn create_group(&mut self, children: Vec<GroupChild>) -> RawValue
    {
        let slot = self.slots.len();
        self.slots.push(children.into());
        RawValue::from_u64(GROUP_MARKER_TYPE.clone(), slot as u64)
    }

    /// Children of the group in `slot`.
    ///
    /// # Errors
    /// [`InspectError::StaleGroupValue`] for a slot from an earlier interval.
    pub fn get(&self, slot: usize) -> InspectResult<Arc<[GroupChild]>>
    {
        self.slots.get(slot).cloned().ok_or(InspectError::StaleGroupValue {
            slot,
            bound: self.slots.len(),
        })
    }

    pub fn len(&self) -> usize
    {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.slots.is_empty()
    }

    /// Drop every slot.
    pub fn clear(&mut self)
    {
        if !self.slots.is_empty() {
            debug!(slots = self.slots.len(), "Clearing group values");
        }
        self.slots.clear();
    }

    /// Drop slots allocated after the table had `len` entries.
    pub(crate) fn truncate(&mut self, len: usize)
    {
        self.slots.truncate(len);
    }
}

/// Renderer for a group marker value.
pub(crate) fn lookup(value: &RawValue, cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn Renderer>>
{
    let slot = value.read_unsigned(cx.inferior())?;
    let slot = usize::try_from(slot).unwrap_or(usize::MAX);
    let children = cx.groups().get(slot)?;
    Ok(Box::new(GroupRenderer { children }))
}

struct GroupRenderer
{
    children: Arc<[GroupChild]>,
}

impl Renderer for GroupRenderer
{
    fn name(&self) -> &str
    {
        "group"
    }

    fn supports(&self, capability: Capability) -> bool
    {
        matches!(capability, Capability::Children | Capability::ChildCount)
    }

    fn children(&self, _cx: &mut RenderContext<'_>) -> InspectResult<Box<dyn ChildStream>>
    {
        let children = Arc::clone(&self.children);
        let mut index = 0;
        Ok(Box::new(move |cx: &mut RenderContext<'_>| -> InspectResult<Option<Child>> {
            let Some(child) = children.get(index) else {
                return Ok(None);
            };
            index += 1;
            let value = child.to_value(cx);
            Ok(Some(Child::new(child.display_name(), value)))
        }))
    }

    fn child_count(&self, _cx: &mut RenderContext<'_>) -> InspectResult<usize>
    {
        Ok(self.children.len())
    }
}

/// Children of a plain list, as group children named `[i]`.
pub fn indexed_children(values: impl IntoIterator<Item = RawValue>) -> Vec<GroupChild>
{
    values.into_iter().enumerate().map(|(i, value)| GroupChild::indexed(i, value)).collect()
}

/// Stream over group children without allocating a slot for the parent.
pub fn group_stream(children: Vec<GroupChild>) -> Box<dyn ChildStream>
{
    let mut pending = children.into_iter();
    Box::new(move |cx: &mut RenderContext<'_>| -> InspectResult<Option<Child>> {
        Ok(pending.next().map(|child| {
            let value = child.to_value(cx);
            Child::new(child.display_name(), value)
        }))
    })
}
