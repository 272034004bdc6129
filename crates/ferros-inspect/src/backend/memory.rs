//! In-memory inferior
//!
//! A complete [`Inferior`] over a sparse, byte-addressed memory image. Tests
//! and the CLI demo describe a stopped program with it: write bytes at
//! addresses, bind names to typed values, describe the selected frame and its
//! blocks, and record the most-derived type of polymorphic objects.
//!
//! ## Expressions
//!
//! [`Inferior::evaluate`] understands the subset of C expressions a variable
//! view needs:
//!
//! - a bound name: `shape`
//! - member access: `p.x`, `node->next`
//! - subscripts with integer literals: `numbers[3]`, `ptr[1]`
//! - dereference: `*ptr`
//!
//! Anything else is an evaluation error.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::error::{InspectError, InspectResult};
use crate::inferior::{Inferior, LexicalBlock};
use crate::types::{Address, StackFrame, Type, TypeCode, TypeKind};
use crate::value::RawValue;

/// A stopped program described entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryInferior
{
    /// Non-overlapping regions keyed by start address.
    regions: BTreeMap<u64, Vec<u8>>,
    names: HashMap<String, RawValue>,
    frame: Option<StackFrame>,
    frame_valid: bool,
    blocks: Option<Vec<LexicalBlock>>,
    /// Most-derived struct type of the object at an address.
    dynamic_types: HashMap<u64, Type>,
}

impl MemoryInferior
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Write raw bytes, mapping memory as needed.
    ///
    /// Regions touched or adjoined by the write are merged so later reads may
    /// span what were separate writes.
    pub fn write_bytes(&mut self, address: u64, data: &[u8]) -> &mut Self
    {
        if data.is_empty() {
            return self;
        }
        let start = address;
        let end = address + data.len() as u64;
        let touching: Vec<u64> = self
            .regions
            .range(..=end)
            .filter(|(s, bytes)| **s + bytes.len() as u64 >= start)
            .map(|(s, _)| *s)
            .collect();

        let mut merged_start = start;
        let mut merged_end = end;
        for s in &touching {
            let len = self.regions[s].len() as u64;
            merged_start = merged_start.min(*s);
            merged_end = merged_end.max(*s + len);
        }

        let mut merged = vec![0u8; (merged_end - merged_start) as usize];
        for s in touching {
            if let Some(bytes) = self.regions.remove(&s) {
                let offset = (s - merged_start) as usize;
                merged[offset..offset + bytes.len()].copy_from_slice(&bytes);
            }
        }
        let offset = (start - merged_start) as usize;
        merged[offset..offset + data.len()].copy_from_slice(data);
        self.regions.insert(merged_start, merged);
        self
    }

    pub fn write_u8(&mut self, address: u64, value: u8) -> &mut Self
    {
        self.write_bytes(address, &[value])
    }

    pub fn write_u16(&mut self, address: u64, value: u16) -> &mut Self
    {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, address: u64, value: u32) -> &mut Self
    {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_i32(&mut self, address: u64, value: i32) -> &mut Self
    {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(&mut self, address: u64, value: u64) -> &mut Self
    {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_f64(&mut self, address: u64, value: f64) -> &mut Self
    {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Write `text` followed by a NUL byte.
    pub fn write_c_string(&mut self, address: u64, text: &str) -> &mut Self
    {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.write_bytes(address, &bytes)
    }

    /// Bind `name` to a value of type `ty` at `address`.
    pub fn define(&mut self, name: impl Into<String>, ty: Type, address: u64) -> &mut Self
    {
        self.bind(name, RawValue::at(ty, Address::from(address)))
    }

    /// Bind `name` to an arbitrary value (registers, optimized-out locals).
    pub fn bind(&mut self, name: impl Into<String>, value: RawValue) -> &mut Self
    {
        self.names.insert(name.into(), value);
        self
    }

    /// Select `frame`, whose pc lies in `blocks` (innermost first).
    pub fn select_frame(&mut self, frame: StackFrame, blocks: Vec<LexicalBlock>) -> &mut Self
    {
        self.frame = Some(frame);
        self.frame_valid = true;
        self.blocks = Some(blocks);
        self
    }

    /// Select a frame for which the backend has no block information.
    pub fn select_frame_without_blocks(&mut self, frame: StackFrame) -> &mut Self
    {
        self.frame = Some(frame);
        self.frame_valid = true;
        self.blocks = None;
        self
    }

    /// Pretend the process ran: the selected frame no longer exists.
    pub fn invalidate_frame(&mut self) -> &mut Self
    {
        self.frame_valid = false;
        self
    }

    /// The object at `address` is really a `ty`.
    pub fn set_dynamic_type(&mut self, address: u64, ty: Type) -> &mut Self
    {
        self.dynamic_types.insert(address, ty);
        self
    }

    fn eval(&self, expression: &str) -> InspectResult<RawValue>
    {
        let expression = expression.trim();
        if let Some(inner) = expression.strip_prefix('*') {
            let value = self.eval(inner)?;
            return self.deref_or_index(&value, None);
        }
        if let Some(inner) = expression.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
            return self.eval(inner);
        }
        if let Some(open) = expression.rfind('[') {
            if let Some(index) = expression.strip_suffix(']').map(|e| &e[open + 1..]) {
                let index: i64 = index
                    .trim()
                    .parse()
                    .map_err(|_| InspectError::InvalidArgument(format!("unsupported subscript '{index}'")))?;
                let value = self.eval(&expression[..open])?;
                return self.deref_or_index(&value, Some(index));
            }
        }
        let arrow = expression.rfind("->");
        let dot = expression.rfind('.');
        match (arrow, dot) {
            (Some(arrow), dot) if dot.is_none_or(|dot| arrow > dot) => {
                let value = self.eval(&expression[..arrow])?;
                let pointee = self.deref_or_index(&value, None)?;
                return pointee.coerce_ref(self)?.field_named(expression[arrow + 2..].trim());
            }
            (_, Some(dot)) => {
                let value = self.eval(&expression[..dot])?;
                return value.coerce_ref(self)?.field_named(expression[dot + 1..].trim());
            }
            _ => {}
        }
        self.names
            .get(expression)
            .cloned()
            .ok_or_else(|| InspectError::InvalidArgument(format!("No symbol \"{expression}\" in current context.")))
    }

    fn deref_or_index(&self, value: &RawValue, index: Option<i64>) -> InspectResult<RawValue>
    {
        let value = value.coerce_ref(self)?;
        let stripped = value.ty().strip_typedefs();
        match (stripped.kind(), index) {
            (TypeKind::Array { .. }, Some(index)) => value.element(index),
            (TypeKind::Pointer(target), index) => {
                let base = value.pointer_value(self)?;
                let offset = index.unwrap_or(0) * i64::try_from(target.size()).unwrap_or(0);
                let address = base
                    .checked_offset(offset)
                    .ok_or_else(|| InspectError::InvalidOperation("pointer arithmetic overflow".into()))?;
                Ok(RawValue::at(target.clone(), address))
            }
            _ => Err(InspectError::InvalidOperation(format!(
                "Attempt to take contents of a non-pointer value of type {}",
                value.ty()
            ))),
        }
    }
}

impl Inferior for MemoryInferior
{
    fn read_memory(&self, address: Address, len: usize) -> InspectResult<Vec<u8>>
    {
        let start = address.value();
        let unreadable = InspectError::Memory { address: start, len };
        let Some((base, bytes)) = self.regions.range(..=start).next_back() else {
            return Err(unreadable);
        };
        let offset = usize::try_from(start - base).map_err(|_| unreadable.clone())?;
        bytes
            .get(offset..offset.saturating_add(len))
            .map(<[u8]>::to_vec)
            .ok_or(unreadable)
    }

    fn selected_frame(&self) -> InspectResult<StackFrame>
    {
        self.frame.clone().ok_or_else(|| InspectError::Frame("No frame is currently selected.".into()))
    }

    fn is_frame_valid(&self, frame: &StackFrame) -> bool
    {
        self.frame_valid && self.frame.as_ref().is_some_and(|selected| selected.id == frame.id)
    }

    fn frame_blocks(&self, frame: &StackFrame) -> InspectResult<Vec<LexicalBlock>>
    {
        if !self.is_frame_valid(frame) {
            return Err(InspectError::Frame("Frame is invalid.".into()));
        }
        self.blocks
            .clone()
            .ok_or_else(|| InspectError::Frame(format!("Cannot locate block for frame at {}.", frame.pc)))
    }

    fn evaluate(&self, expression: &str) -> InspectResult<RawValue>
    {
        trace!(expression, "evaluating");
        self.eval(expression)
    }

    fn dynamic_type(&self, value: &RawValue) -> InspectResult<Option<Type>>
    {
        let stripped = value.ty().strip_typedefs();
        let Some(target) = stripped.target() else {
            return Ok(None);
        };
        if !stripped.is_ptr_or_ref() || target.strip_typedefs().code() != TypeCode::Struct {
            return Ok(None);
        }
        let address = value.pointer_value(self)?;
        let Some(most_derived) = self.dynamic_types.get(&address.value()) else {
            return Ok(None);
        };
        if most_derived.same_as(&target.strip_typedefs()) {
            return Ok(None);
        }
        let wrapped = match stripped.code() {
            TypeCode::Reference => most_derived.reference_to(),
            TypeCode::RvalueReference => most_derived.rvalue_reference_to(),
            _ => most_derived.pointer_to(),
        };
        Ok(Some(wrapped))
    }
}
