//! Structural value formatting.
//!
//! Produces the text a debugger shows for a value when no specialized
//! renderer is involved: `42`, `65 'A'`, `0x601040 "hello"`, `@0x7ffe10`,
//! `{x = 1, y = 2}`, `{1, 2, 3...}`.
//!
//! Formatting never fails. Unreadable parts are shown inline as
//! `<error: ...>` so one bad pointer does not hide the rest of a struct.

use std::fmt::Write as _;

use crate::config::InspectorConfig;
use crate::error::{InspectError, InspectResult};
use crate::inferior::Inferior;
use crate::types::{Address, TypeCode, TypeKind};
use crate::value::{Location, RawValue, Unavailable};

/// Nesting depth after which aggregates print as `{...}`.
const MAX_DEPTH: usize = 8;

/// Bytes fetched per read while scanning for a C string terminator.
const STRING_CHUNK: usize = 64;

/// Limits applied while formatting.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions
{
    /// Characters read from a C string before `...` is appended.
    pub string_limit: usize,
    /// Elements shown for an array before `...` is appended.
    pub array_limit: usize,
    /// Show the referent after a reference's address.
    pub deref_refs: bool,
}

impl Default for FormatOptions
{
    fn default() -> Self
    {
        Self {
            string_limit: 200,
            array_limit: 200,
            deref_refs: false,
        }
    }
}

impl From<&InspectorConfig> for FormatOptions
{
    fn from(config: &InspectorConfig) -> Self
    {
        Self {
            string_limit: config.string_limit,
            array_limit: config.array_limit,
            deref_refs: false,
        }
    }
}

/// Format `value` as display text.
pub fn format_value(inferior: &dyn Inferior, value: &RawValue, options: &FormatOptions) -> String
{
    let mut out = String::new();
    write_value(inferior, value, options, 0, &mut out);
    out
}

fn write_value(inferior: &dyn Inferior, value: &RawValue, options: &FormatOptions, depth: usize, out: &mut String)
{
    if let Err(err) = try_write_value(inferior, value, options, depth, out) {
        let _ = write!(out, "<error: {err}>");
    }
}

fn try_write_value(inferior: &dyn Inferior, value: &RawValue, options: &FormatOptions, depth: usize, out: &mut String) -> InspectResult<()>
{
    match value.location() {
        Location::Unavailable(Unavailable::OptimizedOut) => {
            out.push_str("<optimized out>");
            return Ok(());
        }
        Location::Unavailable(Unavailable::Error(message)) => {
            let _ = write!(out, "<error: {message}>");
            return Ok(());
        }
        _ => {}
    }

    let ty = value.ty().strip_typedefs();
    match ty.kind() {
        TypeKind::Void => out.push_str("void"),
        TypeKind::Bool => match value.read_unsigned(inferior)? {
            0 => out.push_str("false"),
            1 => out.push_str("true"),
            other => {
                let _ = write!(out, "{other}");
            }
        },
        TypeKind::Char { signed } => {
            let code = if *signed { value.read_signed(inferior)? } else { value.read_unsigned(inferior)? as i64 };
            let _ = write!(out, "{code} {}", char_literal(code));
        }
        TypeKind::Int { signed: true } => {
            let _ = write!(out, "{}", value.read_signed(inferior)?);
        }
        TypeKind::Int { signed: false } => {
            let _ = write!(out, "{}", value.read_unsigned(inferior)?);
        }
        TypeKind::Float => {
            let bits = value.read_unsigned(inferior)?;
            if ty.size() == 4 {
                let _ = write!(out, "{}", f32::from_bits(bits as u32));
            } else {
                let _ = write!(out, "{}", f64::from_bits(bits));
            }
        }
        TypeKind::Enum { enumerators, .. } => {
            let raw = value.read_signed(inferior)?;
            match enumerators.iter().find(|(_, v)| *v == raw) {
                Some((name, _)) => out.push_str(name),
                None => {
                    let _ = write!(out, "{raw}");
                }
            }
        }
        TypeKind::Pointer(target) => {
            let address = value.pointer_value(inferior)?;
            let target = target.strip_typedefs();
            if target.code() == TypeCode::Function {
                let _ = write!(out, "({}) ", value.ty());
            }
            let _ = write!(out, "{address}");
            if target.code() == TypeCode::Char && !address.is_null() {
                out.push(' ');
                match read_c_string(inferior, address, options.string_limit) {
                    Ok((bytes, truncated)) => push_quoted(out, &bytes, truncated),
                    Err(err) => {
                        let _ = write!(out, "<error: {err}>");
                    }
                }
            }
        }
        TypeKind::Reference(_) | TypeKind::RvalueReference(_) => {
            let address = value.pointer_value(inferior)?;
            let _ = write!(out, "@{address}");
            if options.deref_refs {
                out.push_str(": ");
                let referent = value.dereference(inferior)?;
                write_value(inferior, &referent, options, depth, out);
            }
        }
        TypeKind::Array { element, .. } => {
            if element.strip_typedefs().code() == TypeCode::Char {
                out.push_str(&array_text(inferior, value, options)?);
            } else {
                write_array(inferior, value, options, depth, out)?;
            }
        }
        TypeKind::Slice { .. } => {
            let array = value.to_array(inferior)?;
            write_array(inferior, &array, options, depth, out)?;
        }
        TypeKind::Struct { .. } | TypeKind::Union { .. } => {
            if depth >= MAX_DEPTH {
                out.push_str("{...}");
                return Ok(());
            }
            out.push('{');
            let mut first = true;
            for field in ty.fields() {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                if let Some(name) = &field.name {
                    let _ = write!(out, "{name} = ");
                }
                write_value(inferior, &value.field(field)?, options, depth + 1, out);
            }
            out.push('}');
        }
        TypeKind::Function { .. } => {
            let address = value.address().unwrap_or(Address::NULL);
            let _ = write!(out, "{{{}}} {address}", value.ty());
        }
        TypeKind::GroupMarker => {
            let _ = write!(out, "<group #{}>", value.read_unsigned(inferior)?);
        }
        // stripped above
        TypeKind::Typedef(_) => {}
    }
    Ok(())
}

fn write_array(inferior: &dyn Inferior, value: &RawValue, options: &FormatOptions, depth: usize, out: &mut String) -> InspectResult<()>
{
    let Some((low, high)) = value.ty().strip_typedefs().range() else {
        out.push_str("{...}");
        return Ok(());
    };
    if depth >= MAX_DEPTH {
        out.push_str("{...}");
        return Ok(());
    }
    out.push('{');
    let mut index = low;
    let mut shown = 0;
    while index <= high {
        if shown == options.array_limit {
            out.push_str("...");
            break;
        }
        if shown > 0 {
            out.push_str(", ");
        }
        write_value(inferior, &value.element(index)?, options, depth + 1, out);
        index += 1;
        shown += 1;
    }
    out.push('}');
    Ok(())
}

/// Quoted text of a character array, stopping at the first NUL.
///
/// Arrays in target memory are read through [`read_c_string`] so the read
/// stops at the terminator instead of fetching the whole array.
pub fn array_text(inferior: &dyn Inferior, value: &RawValue, options: &FormatOptions) -> InspectResult<String>
{
    let ty = value.ty().strip_typedefs();
    let capacity = usize::try_from(ty.size()).unwrap_or(usize::MAX);
    let limit = options.string_limit.min(capacity);
    let (bytes, truncated) = match value.address() {
        Some(address) => read_c_string(inferior, address, limit)?,
        None => {
            let all = value.fetch(inferior)?;
            let end = all.iter().position(|b| *b == 0).unwrap_or(all.len());
            let shown = end.min(options.string_limit);
            (all[..shown].to_vec(), shown < end)
        }
    };
    let mut out = String::new();
    push_quoted(&mut out, &bytes, truncated && limit < capacity);
    Ok(out)
}

/// Read a NUL-terminated string of at most `limit` bytes.
///
/// Returns the bytes before the terminator and whether the limit cut the
/// string short. Fails only if the very first byte is unreadable.
pub fn read_c_string(inferior: &dyn Inferior, address: Address, limit: usize) -> InspectResult<(Vec<u8>, bool)>
{
    let mut bytes = Vec::new();
    let mut cursor = address;
    while bytes.len() < limit {
        let want = STRING_CHUNK.min(limit - bytes.len());
        let chunk = match inferior.read_memory(cursor, want) {
            Ok(chunk) => chunk,
            Err(_) => match read_prefix(inferior, cursor, want) {
                Some(prefix) => prefix,
                None if bytes.is_empty() => {
                    return Err(InspectError::Memory {
                        address: cursor.value(),
                        len: want,
                    })
                }
                None => return Ok((bytes, false)),
            },
        };
        if let Some(end) = chunk.iter().position(|b| *b == 0) {
            bytes.extend_from_slice(&chunk[..end]);
            return Ok((bytes, false));
        }
        let short = chunk.len() < want;
        bytes.extend_from_slice(&chunk);
        if short {
            return Ok((bytes, false));
        }
        cursor = cursor + want as u64;
    }
    Ok((bytes, true))
}

/// Readable bytes at the start of an unreadable range.
fn read_prefix(inferior: &dyn Inferior, address: Address, want: usize) -> Option<Vec<u8>>
{
    let mut prefix = Vec::new();
    for offset in 0..want {
        match inferior.read_memory(address + offset as u64, 1) {
            Ok(byte) => prefix.extend(byte),
            Err(_) => break,
        }
    }
    (!prefix.is_empty()).then_some(prefix)
}

fn push_quoted(out: &mut String, bytes: &[u8], truncated: bool)
{
    out.push('"');
    for byte in bytes {
        push_escaped(out, *byte, '"');
    }
    out.push('"');
    if truncated {
        out.push_str("...");
    }
}

fn char_literal(code: i64) -> String
{
    let mut out = String::from("'");
    push_escaped(&mut out, (code & 0xff) as u8, '\'');
    out.push('\'');
    out
}

fn push_escaped(out: &mut String, byte: u8, quote: char)
{
    match byte {
        b'\n' => out.push_str("\\n"),
        b'\t' => out.push_str("\\t"),
        b'\r' => out.push_str("\\r"),
        b'\\' => out.push_str("\\\\"),
        b if char::from(b) == quote => {
            out.push('\\');
            out.push(quote);
        }
        0x20..=0x7e => out.push(char::from(byte)),
        _ => {
            let _ = write!(out, "\\{byte:03o}");
        }
    }
}
