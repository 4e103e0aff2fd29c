//! Fabric type tag constants.

use crate::types::Kind;

// Records
pub const OBJECT: u8 = 0x00;
pub const POINTER: u8 = 0x01;

// Boolean: true and false are distinct base kinds, both always tag-only.
pub const BOOL: u8 = 0x02;
pub const BOOL_FALSE: u8 = 0x12;

// Integers
pub const CHAR: u8 = 0x03;
pub const UCHAR: u8 = 0x04;
pub const SHORT: u8 = 0x05;
pub const USHORT: u8 = 0x06;
pub const INT32: u8 = 0x07;
pub const UINT32: u8 = 0x08;
pub const INT64: u8 = 0x09;
pub const UINT64: u8 = 0x0A;

// 0x0B (double), 0x0C (guid) and 0x0E (raw byte blob) are reserved by the
// format and never emitted here.

// UTF-16 string, always written with ARRAY_BIT.
pub const WSTRING: u8 = 0x0D;

// Object framing markers
pub const SCOPE_BEGIN: u8 = 0x0F;
pub const SCOPE_END: u8 = 0x10;
pub const OBJECT_END: u8 = 0x11;

// Flag bits
pub const ARRAY_BIT: u8 = 0x40;
pub const EMPTY_VALUE_BIT: u8 = 0x80;

/// Mask selecting the base kind of a flagged tag.
pub const BASE_MASK: u8 = !(ARRAY_BIT | EMPTY_VALUE_BIT);

/// Sentinel for a kind without a wire mapping.
pub const NOT_A_META: u8 = 0xFF;

/// Width of the object length header in bytes.
pub const OBJECT_HEADER_SIZE: usize = 4;

/// Bytes added around an object payload besides the header:
/// `SCOPE_BEGIN`, `SCOPE_END` and `OBJECT_END`.
pub const OBJECT_FRAME_MARKERS: usize = 3;

/// Returns the base tag for `kind`, or [`NOT_A_META`] if it has none.
///
/// Booleans carry their value in the tag, see [`for_bool`].
pub fn for_kind(kind: Kind) -> u8 {
    match kind {
        Kind::I8 => CHAR,
        Kind::U8 => UCHAR,
        Kind::I16 => SHORT,
        Kind::U16 => USHORT,
        Kind::I32 => INT32,
        Kind::U32 => UINT32,
        Kind::I64 => INT64,
        Kind::U64 => UINT64,
        Kind::String => WSTRING,
        Kind::Pointer => POINTER,
        Kind::Object | Kind::Map => OBJECT,
        Kind::Bool | Kind::F32 | Kind::F64 | Kind::Array => NOT_A_META,
    }
}

pub fn for_bool(value: bool) -> u8 {
    if value { BOOL } else { BOOL_FALSE }
}

/// Base kind of a tag with its flag bits stripped.
pub fn base(tag: u8) -> u8 {
    tag & BASE_MASK
}

pub fn is_empty_value(tag: u8) -> bool {
    tag & EMPTY_VALUE_BIT != 0
}

pub fn is_array(tag: u8) -> bool {
    tag & ARRAY_BIT != 0
}
