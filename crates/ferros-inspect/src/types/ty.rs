//! Type descriptions supplied by the debug-info backend.
//!
//! A [`Type`] is a cheap, shared handle (`Arc`) to an immutable description.
//! Struct and union member lists are filled in after the type is created so
//! self-referential types (`struct Node { Node *next; }`) can be expressed:
//! declare the struct, build pointers to it, then define its fields.
//!
//! Types compare by identity, not structurally. Two separately built `int`
//! types are different types, the same way two DIEs are.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{InspectError, InspectResult};

/// Size of a target pointer in bytes.
///
/// The inspection core only supports 64-bit targets.
pub const POINTER_SIZE: u64 = 8;

/// Coarse classification of a type, used for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode
{
    Void,
    Bool,
    Char,
    Int,
    Float,
    Enum,
    Pointer,
    Reference,
    RvalueReference,
    Array,
    Struct,
    Union,
    Typedef,
    Function,
    Slice,
    /// Reserved marker for synthetic group values.
    GroupMarker,
}

/// Struct or union member.
#[derive(Debug, Clone)]
pub struct Field
{
    /// Member name; anonymous members have none.
    pub name: Option<String>,
    /// Member type.
    pub ty: Type,
    /// Byte offset from the start of the aggregate.
    pub offset: u64,
    /// Compiler-injected member (vtable pointer and friends).
    pub artificial: bool,
}

impl Field
{
    /// A named, user-declared member.
    pub fn new(name: impl Into<String>, ty: Type, offset: u64) -> Self
    {
        Self {
            name: Some(name.into()),
            ty,
            offset,
            artificial: false,
        }
    }

    /// A compiler-injected member such as `_vptr.Shape`.
    pub fn artificial(name: impl Into<String>, ty: Type, offset: u64) -> Self
    {
        Self {
            artificial: true,
            ..Self::new(name, ty, offset)
        }
    }

    /// A member without a name (anonymous union/struct).
    pub fn anonymous(ty: Type, offset: u64) -> Self
    {
        Self {
            name: None,
            ty,
            offset,
            artificial: false,
        }
    }
}

/// Shape of a type.
pub enum TypeKind
{
    Void,
    Bool,
    Char
    {
        signed: bool
    },
    Int
    {
        signed: bool
    },
    Float,
    Enum
    {
        signed: bool,
        enumerators: Vec<(String, i64)>,
    },
    Pointer(Type),
    Reference(Type),
    RvalueReference(Type),
    Array
    {
        element: Type,
        /// Inclusive index bounds; `None` when only the byte size is known.
        bounds: Option<(i64, i64)>,
    },
    Struct
    {
        fields: OnceCell<Vec<Field>>
    },
    Union
    {
        fields: OnceCell<Vec<Field>>
    },
    Typedef(Type),
    Function
    {
        result: Type
    },
    /// Array-like aggregate laid out as a `(data pointer, length)` pair.
    Slice
    {
        element: Type
    },
    GroupMarker,
}

struct TypeData
{
    name: Option<String>,
    size: u64,
    kind: TypeKind,
}

/// Shared handle to a type description.
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

impl Type
{
    fn build(name: Option<String>, size: u64, kind: TypeKind) -> Self
    {
        Type(Arc::new(TypeData { name, size, kind }))
    }

    pub fn void() -> Self
    {
        Self::build(Some("void".into()), 1, TypeKind::Void)
    }

    pub fn bool() -> Self
    {
        Self::build(Some("bool".into()), 1, TypeKind::Bool)
    }

    /// Character type; `char` itself is signed on the supported targets.
    pub fn char(name: impl Into<String>, size: u64, signed: bool) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Char { signed })
    }

    pub fn int(name: impl Into<String>, size: u64, signed: bool) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Int { signed })
    }

    pub fn float(name: impl Into<String>, size: u64) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Float)
    }

    pub fn enumeration(name: impl Into<String>, size: u64, enumerators: Vec<(String, i64)>) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Enum {
            signed: true,
            enumerators,
        })
    }

    /// Declare a struct whose members are supplied later via [`Type::define_fields`].
    pub fn declare_struct(name: impl Into<String>, size: u64) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Struct {
            fields: OnceCell::new(),
        })
    }

    /// Struct with its members known up front.
    pub fn structure(name: impl Into<String>, size: u64, fields: Vec<Field>) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Struct {
            fields: OnceCell::with_value(fields),
        })
    }

    pub fn union(name: impl Into<String>, size: u64, fields: Vec<Field>) -> Self
    {
        Self::build(Some(name.into()), size, TypeKind::Union {
            fields: OnceCell::with_value(fields),
        })
    }

    pub fn typedef(name: impl Into<String>, target: &Type) -> Self
    {
        Self::build(Some(name.into()), target.size(), TypeKind::Typedef(target.clone()))
    }

    pub fn function(result: &Type) -> Self
    {
        Self::build(None, 1, TypeKind::Function { result: result.clone() })
    }

    /// Rust-style slice: `(data pointer, length)`.
    pub fn slice(element: &Type) -> Self
    {
        Self::build(None, 2 * POINTER_SIZE, TypeKind::Slice {
            element: element.clone(),
        })
    }

    /// Array indexed `0..len`.
    pub fn array(element: &Type, len: u64) -> Self
    {
        if len == 0 {
            return Self::build(None, 0, TypeKind::Array {
                element: element.clone(),
                bounds: Some((0, -1)),
            });
        }
        Self::array_with_bounds(element, 0, i64::try_from(len).unwrap_or(i64::MAX) - 1)
    }

    /// Array of `len` elements where `len` was read from the inferior.
    ///
    /// # Errors
    /// [`InspectError::InvalidOperation`] when the array could not fit in
    /// the address space, as with an uninitialized slice length.
    pub fn checked_array(element: &Type, len: u64) -> InspectResult<Self>
    {
        if i64::try_from(len).is_err() || len.checked_mul(element.size()).is_none() {
            return Err(InspectError::InvalidOperation(format!("{len} elements of {element} do not fit in memory")));
        }
        Ok(Self::array(element, len))
    }

    /// Array indexed `low..=high` (Fortran-style lower bounds included).
    pub fn array_with_bounds(element: &Type, low: i64, high: i64) -> Self
    {
        let len = high
            .checked_sub(low)
            .and_then(|span| span.checked_add(1))
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or(0);
        Self::build(None, len.saturating_mul(element.size()), TypeKind::Array {
            element: element.clone(),
            bounds: Some((low, high)),
        })
    }

    /// Array whose bounds are unknown; only the total byte size is.
    pub fn array_of_size(element: &Type, size: u64) -> Self
    {
        Self::build(None, size, TypeKind::Array {
            element: element.clone(),
            bounds: None,
        })
    }

    pub fn pointer_to(&self) -> Self
    {
        Self::build(None, POINTER_SIZE, TypeKind::Pointer(self.clone()))
    }

    pub fn reference_to(&self) -> Self
    {
        Self::build(None, POINTER_SIZE, TypeKind::Reference(self.clone()))
    }

    pub fn rvalue_reference_to(&self) -> Self
    {
        Self::build(None, POINTER_SIZE, TypeKind::RvalueReference(self.clone()))
    }

    pub(crate) fn group_marker() -> Self
    {
        Self::build(Some("<group>".into()), POINTER_SIZE, TypeKind::GroupMarker)
    }

    /// Supply the members of a struct created with [`Type::declare_struct`].
    ///
    /// Returns `false` if the type is not a struct/union or already has members.
    pub fn define_fields(&self, fields: Vec<Field>) -> bool
    {
        match &self.0.kind {
            TypeKind::Struct { fields: cell } | TypeKind::Union { fields: cell } => cell.set(fields).is_ok(),
            _ => false,
        }
    }

    /// Declared name, if the type has one.
    pub fn name(&self) -> Option<&str>
    {
        self.0.name.as_deref()
    }

    /// Size in bytes.
    pub fn size(&self) -> u64
    {
        self.0.size
    }

    pub fn kind(&self) -> &TypeKind
    {
        &self.0.kind
    }

    pub fn code(&self) -> TypeCode
    {
        match &self.0.kind {
            TypeKind::Void => TypeCode::Void,
            TypeKind::Bool => TypeCode::Bool,
            TypeKind::Char { .. } => TypeCode::Char,
            TypeKind::Int { .. } => TypeCode::Int,
            TypeKind::Float => TypeCode::Float,
            TypeKind::Enum { .. } => TypeCode::Enum,
            TypeKind::Pointer(_) => TypeCode::Pointer,
            TypeKind::Reference(_) => TypeCode::Reference,
            TypeKind::RvalueReference(_) => TypeCode::RvalueReference,
            TypeKind::Array { .. } => TypeCode::Array,
            TypeKind::Struct { .. } => TypeCode::Struct,
            TypeKind::Union { .. } => TypeCode::Union,
            TypeKind::Typedef(_) => TypeCode::Typedef,
            TypeKind::Function { .. } => TypeCode::Function,
            TypeKind::Slice { .. } => TypeCode::Slice,
            TypeKind::GroupMarker => TypeCode::GroupMarker,
        }
    }

    /// Target of a pointer/reference/typedef, element of an array/slice,
    /// result of a function.
    pub fn target(&self) -> Option<&Type>
    {
        match &self.0.kind {
            TypeKind::Pointer(t) | TypeKind::Reference(t) | TypeKind::RvalueReference(t) | TypeKind::Typedef(t) => Some(t),
            TypeKind::Array { element, .. } | TypeKind::Slice { element } => Some(element),
            TypeKind::Function { result } => Some(result),
            _ => None,
        }
    }

    /// Members of a struct or union; empty for incomplete types and non-aggregates.
    pub fn fields(&self) -> &[Field]
    {
        match &self.0.kind {
            TypeKind::Struct { fields } | TypeKind::Union { fields } => fields.get().map_or(&[], Vec::as_slice),
            _ => &[],
        }
    }

    /// Inclusive index bounds of an array.
    ///
    /// Arrays built with [`Type::array_of_size`] derive `0..size/element_size`.
    pub fn range(&self) -> Option<(i64, i64)>
    {
        match &self.0.kind {
            TypeKind::Array { bounds: Some(bounds), .. } => Some(*bounds),
            TypeKind::Array { element, bounds: None } => {
                let element = element.strip_typedefs();
                if element.size() == 0 {
                    return None;
                }
                let len = i64::try_from(self.size() / element.size()).ok()?;
                Some((0, len - 1))
            }
            _ => None,
        }
    }

    /// Remove typedef layers at the top level.
    #[must_use]
    pub fn strip_typedefs(&self) -> Type
    {
        let mut ty = self.clone();
        while let TypeKind::Typedef(target) = &ty.0.kind {
            ty = target.clone();
        }
        ty
    }

    /// Remove one reference layer, then typedefs.
    #[must_use]
    pub fn untypedef(&self) -> Type
    {
        match &self.0.kind {
            TypeKind::Reference(target) | TypeKind::RvalueReference(target) => target.strip_typedefs(),
            _ => self.strip_typedefs(),
        }
    }

    /// Remove every typedef and reference layer at the top level.
    #[must_use]
    pub fn basic_type(&self) -> Type
    {
        let mut ty = self.clone();
        loop {
            match &ty.0.kind {
                TypeKind::Typedef(target) | TypeKind::Reference(target) | TypeKind::RvalueReference(target) => {
                    ty = target.clone();
                }
                _ => return ty,
            }
        }
    }

    pub fn is_reference(&self) -> bool
    {
        matches!(self.code(), TypeCode::Reference | TypeCode::RvalueReference)
    }

    pub fn is_ptr_or_ref(&self) -> bool
    {
        self.code() == TypeCode::Pointer || self.is_reference()
    }

    /// Arrays and pointers of character type; these print as text.
    pub fn is_string_like(&self) -> bool
    {
        let ty = self.strip_typedefs();
        match ty.kind() {
            TypeKind::Array { element, .. } | TypeKind::Pointer(element) => element.strip_typedefs().code() == TypeCode::Char,
            _ => false,
        }
    }

    /// Aggregates that convert to array form (see [`crate::value::RawValue::to_array`]).
    pub fn is_array_like(&self) -> bool
    {
        self.strip_typedefs().code() == TypeCode::Slice
    }

    /// Identity comparison.
    pub fn same_as(&self, other: &Type) -> bool
    {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn write_name(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        match &self.0.kind {
            TypeKind::Pointer(target) => write_declarator(f, target, "*"),
            TypeKind::Reference(target) => write_declarator(f, target, "&"),
            TypeKind::RvalueReference(target) => write_declarator(f, target, "&&"),
            TypeKind::Array { element, .. } => match self.range() {
                Some((0, high)) => write!(f, "{element} [{}]", high + 1),
                Some((low, high)) => write!(f, "{element} [{low}:{high}]"),
                None => write!(f, "{element} []"),
            },
            TypeKind::Function { result } => write!(f, "{result} (void)"),
            TypeKind::Slice { element } => write!(f, "&[{element}]"),
            TypeKind::Struct { .. } => f.write_str("struct {...}"),
            TypeKind::Union { .. } => f.write_str("union {...}"),
            _ => f.write_str("?"),
        }
    }
}

fn write_declarator(f: &mut fmt::Formatter<'_>, target: &Type, suffix: &str) -> fmt::Result
{
    let inner = target.to_string();
    if inner.ends_with('*') || inner.ends_with('&') {
        write!(f, "{inner}{suffix}")
    } else {
        write!(f, "{inner} {suffix}")
    }
}

impl fmt::Display for Type
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        self.write_name(f)
    }
}

impl fmt::Debug for Type
{
    // Members are left out: self-referential types would recurse forever.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "Type({self}, {:?}, {} bytes)", self.code(), self.size())
    }
}

impl PartialEq for Type
{
    fn eq(&self, other: &Self) -> bool
    {
        self.same_as(other)
    }
}

impl Eq for Type {}
