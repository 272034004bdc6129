//! Values in the inspected process.
//!
//! A [`RawValue`] pairs a [`Type`] with where its bytes live. Values in target
//! memory are lazy: nothing is read until a caller asks for bytes, so building
//! a field or element value never fails because of unreadable memory. Reading
//! can.
//!
//! ## Locations
//!
//! | location | bytes come from |
//! |---|---|
//! | `Memory(addr)` | [`Inferior::read_memory`] at `addr` |
//! | `Bytes(..)` | an immediate buffer (registers, synthesized values) |
//! | `Unavailable(..)` | nowhere; reading fails |

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{InspectError, InspectResult};
use crate::inferior::Inferior;
use crate::types::{Address, Field, Type, TypeCode, TypeKind, POINTER_SIZE};

/// Why a value has no bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable
{
    OptimizedOut,
    Error(String),
}

impl fmt::Display for Unavailable
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Unavailable::OptimizedOut => f.write_str("value has been optimized out"),
            Unavailable::Error(message) => f.write_str(message),
        }
    }
}

/// Where a value's bytes live.
#[derive(Debug, Clone)]
pub enum Location
{
    Memory(Address),
    Bytes(Arc<[u8]>),
    Unavailable(Unavailable),
}

/// A typed value in the inspected process.
#[derive(Debug, Clone)]
pub struct RawValue
{
    ty: Type,
    location: Location,
}

impl RawValue
{
    /// Lazy value of type `ty` at `address`.
    pub fn at(ty: Type, address: Address) -> Self
    {
        Self {
            ty,
            location: Location::Memory(address),
        }
    }

    /// Immediate value; `bytes` should be `ty.size()` long.
    pub fn from_bytes(ty: Type, bytes: impl Into<Arc<[u8]>>) -> Self
    {
        Self {
            ty,
            location: Location::Bytes(bytes.into()),
        }
    }

    /// Immediate integer value, little-endian, truncated to the type size.
    pub fn from_u64(ty: Type, value: u64) -> Self
    {
        let size = usize::try_from(ty.size()).unwrap_or(8).min(8);
        let bytes = value.to_le_bytes()[..size].to_vec();
        Self::from_bytes(ty, bytes)
    }

    pub fn optimized_out(ty: Type) -> Self
    {
        Self {
            ty,
            location: Location::Unavailable(Unavailable::OptimizedOut),
        }
    }

    /// A value whose bytes could not be obtained.
    pub fn unavailable(ty: Type, error: &InspectError) -> Self
    {
        Self {
            ty,
            location: Location::Unavailable(Unavailable::Error(error.to_string())),
        }
    }

    /// Immediate NUL-terminated `char` array holding `text`.
    pub fn text(text: &str) -> Self
    {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        let ty = Type::array(&Type::char("char", 1, true), bytes.len() as u64);
        Self::from_bytes(ty, bytes)
    }

    pub fn ty(&self) -> &Type
    {
        &self.ty
    }

    pub fn location(&self) -> &Location
    {
        &self.location
    }

    /// Address of the value if it lives in target memory.
    pub fn address(&self) -> Option<Address>
    {
        match self.location {
            Location::Memory(address) => Some(address),
            _ => None,
        }
    }

    /// Reinterpret the same bytes as another type.
    #[must_use]
    pub fn cast(&self, ty: Type) -> RawValue
    {
        RawValue {
            ty,
            location: self.location.clone(),
        }
    }

    /// Read the value's bytes.
    ///
    /// # Errors
    /// [`InspectError::Memory`] for unreadable target memory and
    /// [`InspectError::InvalidOperation`] for unavailable values.
    pub fn fetch<'a>(&'a self, inferior: &dyn Inferior) -> InspectResult<Cow<'a, [u8]>>
    {
        let size = usize::try_from(self.ty.size()).map_err(|_| InspectError::InvalidOperation(format!("value of type {} is too large", self.ty)))?;
        match &self.location {
            Location::Memory(address) => inferior.read_memory(*address, size).map(Cow::Owned),
            Location::Bytes(bytes) if bytes.len() >= size => Ok(Cow::Borrowed(&bytes[..size])),
            Location::Bytes(bytes) => {
                let mut padded = bytes.to_vec();
                padded.resize(size, 0);
                Ok(Cow::Owned(padded))
            }
            Location::Unavailable(reason) => Err(InspectError::InvalidOperation(reason.to_string())),
        }
    }

    /// Check that the value's bytes can be read.
    pub fn fetch_lazy(&self, inferior: &dyn Inferior) -> InspectResult<()>
    {
        self.fetch(inferior).map(|_| ())
    }

    /// Read the value as an unsigned integer of its own size.
    pub fn read_unsigned(&self, inferior: &dyn Inferior) -> InspectResult<u64>
    {
        let bytes = self.fetch(inferior)?;
        if bytes.len() > 8 {
            return Err(InspectError::InvalidOperation(format!("{} is not a scalar type", self.ty)));
        }
        let mut buffer = [0u8; 8];
        if inferior.is_little_endian() {
            buffer[..bytes.len()].copy_from_slice(&bytes);
            Ok(u64::from_le_bytes(buffer))
        } else {
            buffer[8 - bytes.len()..].copy_from_slice(&bytes);
            Ok(u64::from_be_bytes(buffer))
        }
    }

    /// Read the value as a sign-extended integer of its own size.
    pub fn read_signed(&self, inferior: &dyn Inferior) -> InspectResult<i64>
    {
        let raw = self.read_unsigned(inferior)?;
        let bits = self.ty.size() * 8;
        if bits == 0 || bits >= 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Address held by a pointer or reference value.
    pub fn pointer_value(&self, inferior: &dyn Inferior) -> InspectResult<Address>
    {
        let stripped = self.ty.strip_typedefs();
        if !stripped.is_ptr_or_ref() {
            return Err(InspectError::InvalidOperation(format!("{} is not a pointer", self.ty)));
        }
        self.read_unsigned(inferior).map(Address::from)
    }

    /// The object a pointer or reference refers to.
    ///
    /// Only the pointer itself is read; the result is lazy.
    pub fn dereference(&self, inferior: &dyn Inferior) -> InspectResult<RawValue>
    {
        let stripped = self.ty.strip_typedefs();
        let target = match stripped.kind() {
            TypeKind::Pointer(target) | TypeKind::Reference(target) | TypeKind::RvalueReference(target) => target.clone(),
            _ => {
                return Err(InspectError::InvalidOperation(format!(
                    "Attempt to take contents of a non-pointer value of type {}",
                    self.ty
                )))
            }
        };
        let address = self.pointer_value(inferior)?;
        Ok(RawValue::at(target, address))
    }

    /// Follow references until the value is not one.
    pub fn coerce_ref(&self, inferior: &dyn Inferior) -> InspectResult<RawValue>
    {
        let mut value = self.clone();
        while value.ty.strip_typedefs().is_reference() {
            value = value.dereference(inferior)?;
        }
        Ok(value)
    }

    /// A member of a struct or union value.
    pub fn field(&self, field: &Field) -> InspectResult<RawValue>
    {
        self.sub_value(field.ty.clone(), field.offset)
    }

    /// Member by name.
    pub fn field_named(&self, name: &str) -> InspectResult<RawValue>
    {
        let stripped = self.ty.strip_typedefs();
        let field = stripped
            .fields()
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| InspectError::InvalidOperation(format!("There is no member named {name}.")))?;
        self.field(field)
    }

    /// Element `index` of an array, using the array's own index bounds.
    pub fn element(&self, index: i64) -> InspectResult<RawValue>
    {
        let stripped = self.ty.strip_typedefs();
        let TypeKind::Array { element, .. } = stripped.kind() else {
            return Err(InspectError::InvalidOperation(format!("cannot subscript something of type `{}'", self.ty)));
        };
        let (low, high) = stripped.range().unwrap_or((0, i64::MAX));
        if index < low || index > high {
            return Err(InspectError::InvalidOperation(format!("no such vector element: {index}")));
        }
        let offset = u64::try_from(index - low).unwrap_or(0) * element.size();
        self.sub_value(element.clone(), offset)
    }

    /// Convert an array-like aggregate (a slice) to a plain array value over
    /// its data pointer.
    pub fn to_array(&self, inferior: &dyn Inferior) -> InspectResult<RawValue>
    {
        let stripped = self.ty.strip_typedefs();
        let TypeKind::Slice { element } = stripped.kind() else {
            return Err(InspectError::InvalidOperation(format!("{} cannot be converted to an array", self.ty)));
        };
        let pointer_ty = Type::int("unsigned long", POINTER_SIZE, false);
        let data = self.sub_value(pointer_ty.clone(), 0)?.read_unsigned(inferior)?;
        let len = self.sub_value(pointer_ty, POINTER_SIZE)?.read_unsigned(inferior)?;
        Ok(RawValue::at(Type::checked_array(element, len)?, Address::from(data)))
    }

    /// Whether this is a pointer whose value is zero.
    pub fn is_null_pointer(&self, inferior: &dyn Inferior) -> InspectResult<bool>
    {
        Ok(self.pointer_value(inferior)?.is_null())
    }

    /// Whether the value is of the reserved group-marker type.
    pub fn is_group_marker(&self) -> bool
    {
        self.ty.code() == TypeCode::GroupMarker
    }

    fn sub_value(&self, ty: Type, offset: u64) -> InspectResult<RawValue>
    {
        let location = match &self.location {
            Location::Memory(address) => Location::Memory(*address + offset),
            Location::Bytes(bytes) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX);
                let end = start.saturating_add(usize::try_from(ty.size()).unwrap_or(usize::MAX));
                match bytes.get(start..end) {
                    Some(slice) => Location::Bytes(Arc::from(slice)),
                    None => {
                        return Err(InspectError::InvalidOperation(format!(
                            "member at offset {offset} lies outside a {}-byte value",
                            bytes.len()
                        )))
                    }
                }
            }
            Location::Unavailable(reason) => Location::Unavailable(reason.clone()),
        };
        Ok(RawValue { ty, location })
    }
}
