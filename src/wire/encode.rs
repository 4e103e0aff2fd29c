//! Fabric encoding: `Value` → bytes.

use std::cmp::Ordering;
use std::fmt;

use bytes::{BufMut, Bytes};

use super::scope::ScopeStack;
use super::{tag, varint};
use crate::error::{FabricError, Result};
use crate::types::{Array, Kind, Map, Object, Value};

/// Default cap on value nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// A type that writes its own wire form in place of the generic record path.
///
/// Implementors receive the live encoder and must leave a complete,
/// self-consistent fragment behind, typically by calling
/// [`Encoder::write_object`] and writing fields inside it. Used for
/// union-shaped data that has no fixed field list.
pub trait CustomMarshal: fmt::Debug + Send + Sync {
    fn marshal(&self, enc: &mut Encoder) -> Result<()>;
}

/// How a non-empty array of integers is introduced on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegerArrays {
    /// Element count only, no collection tag. String and object arrays are
    /// always tagged; integer arrays historically are not, and existing
    /// readers depend on that.
    #[default]
    Untagged,
    /// `<element tag> | ARRAY_BIT` before the count, matching the tag an
    /// empty integer array carries.
    Tagged,
}

/// Knobs that change the produced bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub max_depth: usize,
    /// Sort map entries by key instead of keeping insertion order.
    pub sorted_maps: bool,
    pub integer_arrays: IntegerArrays,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            sorted_maps: false,
            integer_arrays: IntegerArrays::Untagged,
        }
    }
}

/// Per-call encode state. All writes go to the innermost open scope.
pub struct Encoder {
    scopes: ScopeStack,
    options: EncodeOptions,
    depth: usize,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self {
            scopes: ScopeStack::new(),
            options,
            depth: 0,
        }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Returns everything written so far.
    pub fn into_bytes(self) -> Bytes {
        self.scopes.into_bytes()
    }

    pub fn write_tag(&mut self, tag: u8) {
        self.scopes.active().put_u8(tag);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.scopes.active().put_slice(bytes);
    }

    pub fn write_compressed_unsigned(&mut self, width: usize, value: u64) -> Result<()> {
        varint::put_compressed_unsigned(self.scopes.active(), width, value)
    }

    pub fn write_compressed_signed(&mut self, width: usize, value: i64) -> Result<()> {
        varint::put_compressed_signed(self.scopes.active(), width, value)
    }

    /// Writes a framed object whose payload is produced by `fields`:
    /// `OBJECT`, 4-byte length, `SCOPE_BEGIN`, payload, `SCOPE_END`,
    /// `OBJECT_END`.
    pub fn write_object<F>(&mut self, fields: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.scopes.begin_scope();
        let result = fields(self);
        let payload = self.scopes.end_scope();
        result?;

        let size = payload.len() + tag::OBJECT_HEADER_SIZE + tag::OBJECT_FRAME_MARKERS;
        let size = u32::try_from(size).map_err(|_| {
            FabricError::Codec(format!("object of {size} bytes overflows the length header"))
        })?;

        let buf = self.scopes.active();
        buf.reserve(payload.len() + tag::OBJECT_HEADER_SIZE + 4);
        buf.put_u8(tag::OBJECT);
        buf.put_u32_le(size);
        buf.put_u8(tag::SCOPE_BEGIN);
        buf.put_slice(&payload);
        buf.put_u8(tag::SCOPE_END);
        buf.put_u8(tag::OBJECT_END);
        Ok(())
    }

    /// Writes any value through the generic dispatch.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.nested(|enc| enc.dispatch(value))
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.options.max_depth {
            return Err(FabricError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, value: &Value) -> Result<()> {
        match value {
            // Booleans live entirely in the tag.
            Value::Bool(b) => {
                self.write_tag(tag::for_bool(*b) | tag::EMPTY_VALUE_BIT);
                Ok(())
            }
            v if v.is_zero() => self.write_empty(v),
            Value::I8(v) => {
                self.write_tag(tag::CHAR);
                self.scopes.active().put_i8(*v);
                Ok(())
            }
            Value::U8(v) => {
                self.write_uchar(*v);
                Ok(())
            }
            Value::I16(v) => self.write_signed(Kind::I16, i64::from(*v)),
            Value::U16(v) => self.write_unsigned(Kind::U16, u64::from(*v)),
            Value::I32(v) => self.write_signed(Kind::I32, i64::from(*v)),
            Value::U32(v) => self.write_unsigned(Kind::U32, u64::from(*v)),
            Value::I64(v) => self.write_signed(Kind::I64, *v),
            Value::U64(v) => self.write_unsigned(Kind::U64, *v),
            Value::F32(_) | Value::F64(_) => Err(FabricError::Unsupported(value.kind())),
            Value::String(s) => self.write_wstring(s),
            Value::Bytes(b) => self.write_byte_array(b),
            Value::Pointer(Some(inner)) => {
                self.write_tag(tag::POINTER);
                self.write_value(inner)
            }
            Value::Pointer(None) => self.write_empty(value),
            Value::Object(obj) => self.encode_record(obj),
            Value::Array(arr) => self.write_array(arr),
            Value::Map(map) => self.write_map(map),
        }
    }

    /// Tag-only form of a zero value.
    fn write_empty(&mut self, value: &Value) -> Result<()> {
        let meta = match value {
            Value::Bool(b) => tag::for_bool(*b),
            Value::String(_) => tag::WSTRING | tag::ARRAY_BIT,
            Value::Bytes(_) => tag::UCHAR | tag::ARRAY_BIT,
            Value::Array(arr) => element_tag(arr.elem())? | tag::ARRAY_BIT,
            // No element type info for maps.
            Value::Map(_) => tag::ARRAY_BIT,
            other => base_tag(other.kind())?,
        };
        self.write_tag(meta | tag::EMPTY_VALUE_BIT);
        Ok(())
    }

    fn write_uchar(&mut self, value: u8) {
        if value == 0 {
            self.write_tag(tag::UCHAR | tag::EMPTY_VALUE_BIT);
        } else {
            let buf = self.scopes.active();
            buf.put_u8(tag::UCHAR);
            buf.put_u8(value);
        }
    }

    fn write_unsigned(&mut self, kind: Kind, value: u64) -> Result<()> {
        let width = native_width(kind)?;
        self.write_tag(base_tag(kind)?);
        self.write_compressed_unsigned(width, value)
    }

    fn write_signed(&mut self, kind: Kind, value: i64) -> Result<()> {
        let width = native_width(kind)?;
        self.write_tag(base_tag(kind)?);
        self.write_compressed_signed(width, value)
    }

    fn write_count(&mut self, len: usize) -> Result<()> {
        let count = u32::try_from(len).map_err(|_| {
            FabricError::Codec(format!("{len} elements overflow the 32-bit count"))
        })?;
        self.write_compressed_unsigned(4, u64::from(count))
    }

    /// `WSTRING | ARRAY_BIT`, code unit count, UTF-16LE code units.
    fn write_wstring(&mut self, s: &str) -> Result<()> {
        self.write_tag(tag::WSTRING | tag::ARRAY_BIT);
        self.write_count(s.encode_utf16().count())?;
        let buf = self.scopes.active();
        for unit in s.encode_utf16() {
            buf.put_u16_le(unit);
        }
        Ok(())
    }

    fn write_byte_array(&mut self, bytes: &[u8]) -> Result<()> {
        if self.options.integer_arrays == IntegerArrays::Tagged {
            self.write_tag(tag::UCHAR | tag::ARRAY_BIT);
        }
        self.write_count(bytes.len())?;
        for &b in bytes {
            self.write_uchar(b);
        }
        Ok(())
    }

    /// Writes a record, honouring its custom marshaler if it has one.
    pub fn write_record(&mut self, obj: &Object) -> Result<()> {
        self.nested(|enc| enc.encode_record(obj))
    }

    fn encode_record(&mut self, obj: &Object) -> Result<()> {
        if let Some(marshaler) = obj.marshaler() {
            debug_assert!(
                obj.fields().is_empty(),
                "object with a custom marshaler also carries fields"
            );
            tracing::trace!(?marshaler, "delegating to custom marshaler");
            return marshaler.marshal(self);
        }
        self.write_object(|enc| {
            for field in obj.fields() {
                enc.write_value(field)?;
            }
            Ok(())
        })
    }

    fn write_array(&mut self, array: &Array) -> Result<()> {
        let elem = array.elem();
        match elem {
            // The count of a string array is introduced by a plain UINT32 tag.
            Kind::String => self.write_tag(tag::UINT32),
            Kind::Object => self.write_tag(tag::OBJECT | tag::ARRAY_BIT),
            k if k.is_integer() => {
                if self.options.integer_arrays == IntegerArrays::Tagged {
                    self.write_tag(base_tag(k)? | tag::ARRAY_BIT);
                }
            }
            other => return Err(FabricError::UnsupportedElement(other)),
        }

        self.write_count(array.len())?;
        for item in array.items() {
            check_kind(elem, item)?;
            self.write_value(item)?;
        }
        Ok(())
    }

    fn write_map(&mut self, map: &Map) -> Result<()> {
        let mut entries: Vec<&(Value, Value)> = map.entries().iter().collect();
        for (key, value) in &entries {
            check_kind(map.key_kind(), key)?;
            check_kind(map.value_kind(), value)?;
        }
        if self.options.sorted_maps {
            if has_natural_order(map.key_kind()) {
                entries.sort_by(|a, b| compare_keys(&a.0, &b.0));
            } else {
                // Other key kinds are ordered by their encoded form.
                let mut keyed = entries
                    .into_iter()
                    .map(|entry| Ok((self.encoded_key(&entry.0)?, entry)))
                    .collect::<Result<Vec<_>>>()?;
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
                entries = keyed.into_iter().map(|(_, entry)| entry).collect();
            }
        }

        self.write_tag(tag::OBJECT | tag::ARRAY_BIT);
        self.write_count(entries.len())?;
        for (key, value) in entries {
            // Each entry is a two-field record: key, then value.
            self.nested(|enc| {
                enc.write_object(|enc| {
                    enc.write_value(key)?;
                    enc.write_value(value)
                })
            })?;
        }
        Ok(())
    }

    fn encoded_key(&self, key: &Value) -> Result<Bytes> {
        let mut scratch = Encoder {
            scopes: ScopeStack::new(),
            options: self.options,
            depth: self.depth,
        };
        scratch.write_value(key)?;
        Ok(scratch.into_bytes())
    }
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("open_scopes", &self.scopes.depth())
            .field("depth", &self.depth)
            .field("options", &self.options)
            .finish()
    }
}

fn base_tag(kind: Kind) -> Result<u8> {
    match tag::for_kind(kind) {
        tag::NOT_A_META => Err(FabricError::Unsupported(kind)),
        t => Ok(t),
    }
}

fn native_width(kind: Kind) -> Result<usize> {
    kind.width().ok_or(FabricError::Unsupported(kind))
}

/// Base tag an array of `elem` carries.
fn element_tag(elem: Kind) -> Result<u8> {
    match elem {
        Kind::String => Ok(tag::UINT32),
        Kind::Object => Ok(tag::OBJECT),
        k if k.is_integer() => base_tag(k),
        other => Err(FabricError::UnsupportedElement(other)),
    }
}

fn check_kind(expected: Kind, value: &Value) -> Result<()> {
    let found = value.kind();
    if found != expected {
        return Err(FabricError::KindMismatch { expected, found });
    }
    Ok(())
}

fn has_natural_order(kind: Kind) -> bool {
    matches!(kind, Kind::String | Kind::Bool) || kind.is_integer()
}

/// Orders keys of one of the [`has_natural_order`] kinds.
fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => integer_key(a).cmp(&integer_key(b)),
    }
}

fn integer_key(v: &Value) -> Option<i128> {
    match v {
        Value::I8(x) => Some(i128::from(*x)),
        Value::U8(x) => Some(i128::from(*x)),
        Value::I16(x) => Some(i128::from(*x)),
        Value::U16(x) => Some(i128::from(*x)),
        Value::I32(x) => Some(i128::from(*x)),
        Value::U32(x) => Some(i128::from(*x)),
        Value::I64(x) => Some(i128::from(*x)),
        Value::U64(x) => Some(i128::from(*x)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_with(options: EncodeOptions, value: &Value) -> Result<Vec<u8>> {
        let mut enc = Encoder::new(options);
        enc.write_value(value)?;
        Ok(enc.into_bytes().to_vec())
    }

    fn encode(value: &Value) -> Vec<u8> {
        encode_with(EncodeOptions::default(), value).unwrap()
    }

    /// Frames `payload` the way `write_object` does.
    fn framed(payload: &[u8]) -> Vec<u8> {
        let size = (payload.len() + 7) as u32;
        let mut out = vec![tag::OBJECT];
        out.extend_from_slice(&size.to_le_bytes());
        out.push(tag::SCOPE_BEGIN);
        out.extend_from_slice(payload);
        out.push(tag::SCOPE_END);
        out.push(tag::OBJECT_END);
        out
    }

    #[test]
    fn zero_integers_are_tag_only() {
        let cases = [
            (Value::I8(0), tag::CHAR),
            (Value::U8(0), tag::UCHAR),
            (Value::I16(0), tag::SHORT),
            (Value::U16(0), tag::USHORT),
            (Value::I32(0), tag::INT32),
            (Value::U32(0), tag::UINT32),
            (Value::I64(0), tag::INT64),
            (Value::U64(0), tag::UINT64),
        ];
        for (value, base) in cases {
            assert_eq!(encode(&value), vec![base | tag::EMPTY_VALUE_BIT], "{value:?}");
        }
    }

    #[test]
    fn booleans_are_single_distinct_bytes() {
        let t = encode(&Value::Bool(true));
        let f = encode(&Value::Bool(false));
        assert_eq!(t, vec![0x82]);
        assert_eq!(f, vec![0x92]);
        assert!(tag::is_empty_value(t[0]) && tag::is_empty_value(f[0]));
    }

    #[test]
    fn empty_values() {
        assert_eq!(encode(&Value::from("")), vec![0xCD]);
        assert_eq!(encode(&Value::nil()), vec![0x81]);
        assert_eq!(encode(&Value::Bytes(Bytes::new())), vec![0xC4]);
        assert_eq!(
            encode(&Value::Map(Map::new(Kind::String, Kind::U32))),
            vec![tag::ARRAY_BIT | tag::EMPTY_VALUE_BIT]
        );
    }

    #[test]
    fn empty_arrays_carry_element_tag() {
        let strings = Value::Array(Array::empty(Kind::String));
        assert_eq!(
            encode(&strings),
            vec![tag::UINT32 | tag::EMPTY_VALUE_BIT | tag::ARRAY_BIT]
        );
        assert_eq!(encode(&Value::Array(Array::empty(Kind::Object))), vec![0xC0]);
        assert_eq!(encode(&Value::Array(Array::empty(Kind::U16))), vec![0xC6]);
        assert_eq!(encode(&Value::Array(Array::empty(Kind::I64))), vec![0xC9]);
    }

    #[test]
    fn one_byte_integers_are_raw() {
        assert_eq!(encode(&Value::U8(5)), vec![tag::UCHAR, 0x05]);
        assert_eq!(encode(&Value::U8(0xFF)), vec![tag::UCHAR, 0xFF]);
        assert_eq!(encode(&Value::I8(-1)), vec![tag::CHAR, 0xFF]);
    }

    #[test]
    fn wider_integers_are_compressed() {
        assert_eq!(encode(&Value::U32(300)), vec![tag::UINT32, 0xAC, 0x02]);
        assert_eq!(encode(&Value::U16(1)), vec![tag::USHORT, 0x01]);
        assert_eq!(encode(&Value::I16(-65)), vec![tag::SHORT, 0xBF, 0x7F]);
        assert_eq!(encode(&Value::I64(-1)), vec![tag::INT64, 0x7F]);
        assert_eq!(encode(&Value::U64(u64::MAX)).len(), 1 + 10);
    }

    #[test]
    fn string_is_utf16_le() {
        assert_eq!(
            encode(&Value::from("hi")),
            vec![0x4D, 0x02, 0x68, 0x00, 0x69, 0x00]
        );
    }

    #[test]
    fn string_count_is_code_units() {
        // U+1F600 is a surrogate pair.
        assert_eq!(
            encode(&Value::from("\u{1F600}")),
            vec![0x4D, 0x02, 0x3D, 0xD8, 0x00, 0xDE]
        );
    }

    #[test]
    fn pointer_to_int() {
        assert_eq!(
            encode(&Value::pointer(5i32)),
            vec![tag::POINTER, tag::INT32, 0x05]
        );
    }

    #[test]
    fn record_with_zero_and_string() {
        let obj = Object::default().field(0u32).field("hi");
        let payload = [0x88, 0x4D, 0x02, 0x68, 0x00, 0x69, 0x00];
        assert_eq!(encode(&Value::Object(obj)), framed(&payload));
    }

    #[test]
    fn all_default_record_is_fully_framed() {
        let obj = Object::default().field(0u32).field("").field(Value::nil());
        assert_eq!(encode(&Value::Object(obj)), framed(&[0x88, 0xCD, 0x81]));
        assert_eq!(
            encode(&Value::Object(Object::default())),
            vec![0x00, 0x07, 0x00, 0x00, 0x00, 0x0F, 0x10, 0x11]
        );
    }

    #[test]
    fn header_length_reaches_object_end() {
        let inner = Object::default().field(9u32).field("abc");
        let outer = Object::default()
            .field(Value::Object(inner))
            .field(1u8);
        let bytes = encode(&Value::Object(outer));

        let size = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
        assert_eq!(1 + size, bytes.len());
        assert_eq!(bytes[5], tag::SCOPE_BEGIN);
        assert_eq!(bytes[bytes.len() - 1], tag::OBJECT_END);

        // Skip the nested object by its header alone and land on the sibling.
        let inner_at = 6;
        assert_eq!(bytes[inner_at], tag::OBJECT);
        let inner_size =
            u32::from_le_bytes(bytes[inner_at + 1..inner_at + 5].try_into().unwrap()) as usize;
        let sibling = inner_at + 1 + inner_size;
        assert_eq!(bytes[sibling - 1], tag::OBJECT_END);
        assert_eq!(&bytes[sibling..sibling + 2], &[tag::UCHAR, 0x01]);
        assert_eq!(&bytes[sibling + 2..], &[tag::SCOPE_END, tag::OBJECT_END]);
    }

    #[test]
    fn string_array() {
        let arr = Array::new(Kind::String, vec!["a".into(), "".into()]);
        assert_eq!(
            encode(&Value::Array(arr)),
            vec![tag::UINT32, 0x02, 0x4D, 0x01, 0x61, 0x00, 0xCD]
        );
    }

    #[test]
    fn object_array_tags_wrapper_and_elements() {
        let arr = Array::new(Kind::Object, vec![Object::default().field(1u8).into()]);
        let mut expected = vec![tag::OBJECT | tag::ARRAY_BIT, 0x01];
        expected.extend(framed(&[tag::UCHAR, 0x01]));
        assert_eq!(encode(&Value::Array(arr)), expected);
    }

    #[test]
    fn integer_array_has_no_collection_tag_by_default() {
        let arr = Value::Array(Array::new(Kind::U16, vec![0u16.into(), 7u16.into()]));
        assert_eq!(encode(&arr), vec![0x02, 0x86, tag::USHORT, 0x07]);

        let tagged = EncodeOptions {
            integer_arrays: IntegerArrays::Tagged,
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode_with(tagged, &arr).unwrap(),
            vec![0x46, 0x02, 0x86, tag::USHORT, 0x07]
        );
    }

    #[test]
    fn bytes_encode_as_u8_array() {
        let value = Value::Bytes(Bytes::from_static(&[0x00, 0xFF]));
        assert_eq!(encode(&value), vec![0x02, 0x84, tag::UCHAR, 0xFF]);
    }

    #[test]
    fn map_is_array_of_pair_records() {
        let mut map = Map::new(Kind::String, Kind::U32);
        map.insert("k", 1u32);
        let mut expected = vec![tag::OBJECT | tag::ARRAY_BIT, 0x01];
        expected.extend(framed(&[0x4D, 0x01, 0x6B, 0x00, tag::UINT32, 0x01]));
        assert_eq!(encode(&Value::Map(map)), expected);
    }

    #[test]
    fn sorted_maps_ignore_insertion_order() {
        let mut ab = Map::new(Kind::U16, Kind::String);
        ab.insert(1u16, "one");
        ab.insert(300u16, "many");
        let mut ba = Map::new(Kind::U16, Kind::String);
        ba.insert(300u16, "many");
        ba.insert(1u16, "one");

        let sorted = EncodeOptions {
            sorted_maps: true,
            ..EncodeOptions::default()
        };
        let ab = Value::Map(ab);
        let ba = Value::Map(ba);
        assert_eq!(encode_with(sorted, &ab).unwrap(), encode_with(sorted, &ba).unwrap());
        assert_ne!(encode(&ab), encode(&ba));
    }

    #[test]
    fn sorted_maps_order_reference_keys() {
        let keys = [Value::pointer(2u32), Value::nil(), Value::pointer(1u32)];
        let mut forward = Map::new(Kind::Pointer, Kind::U8);
        for (i, key) in keys.iter().enumerate() {
            forward.insert(key.clone(), i as u8);
        }
        let mut backward = Map::new(Kind::Pointer, Kind::U8);
        for (i, key) in keys.iter().enumerate().rev() {
            backward.insert(key.clone(), i as u8);
        }

        let sorted = EncodeOptions {
            sorted_maps: true,
            ..EncodeOptions::default()
        };
        let forward = encode_with(sorted, &Value::Map(forward)).unwrap();
        let backward = encode_with(sorted, &Value::Map(backward)).unwrap();
        assert_eq!(forward, backward);

        // nil (0x81) sorts after the POINTER-tagged keys (0x01 ..).
        let mut expected = vec![tag::OBJECT | tag::ARRAY_BIT, 0x03];
        expected.extend(framed(&[tag::POINTER, tag::UINT32, 0x01, tag::UCHAR, 0x02]));
        expected.extend(framed(&[tag::POINTER, tag::UINT32, 0x02, 0x84]));
        expected.extend(framed(&[0x81, tag::UCHAR, 0x01]));
        assert_eq!(forward, expected);
    }

    #[test]
    fn sorted_maps_order_record_keys() {
        let a = Value::from(Object::default().field("a"));
        let b = Value::from(Object::default().field("b"));
        let mut ab = Map::new(Kind::Object, Kind::U8);
        ab.insert(a.clone(), 1u8);
        ab.insert(b.clone(), 2u8);
        let mut ba = Map::new(Kind::Object, Kind::U8);
        ba.insert(b, 2u8);
        ba.insert(a, 1u8);

        let sorted = EncodeOptions {
            sorted_maps: true,
            ..EncodeOptions::default()
        };
        assert_eq!(
            encode_with(sorted, &Value::Map(ab)).unwrap(),
            encode_with(sorted, &Value::Map(ba)).unwrap()
        );
    }

    #[test]
    fn floats_are_unsupported() {
        let obj = Value::Object(Object::default().field(1u8).field(1.5f64));
        assert!(matches!(
            encode_with(EncodeOptions::default(), &obj),
            Err(FabricError::Unsupported(Kind::F64))
        ));
        // Zero floats do not slip through the empty path.
        assert!(matches!(
            encode_with(EncodeOptions::default(), &Value::F32(0.0)),
            Err(FabricError::Unsupported(Kind::F32))
        ));
    }

    #[test]
    fn unsupported_array_elements() {
        let bools = Value::Array(Array::new(Kind::Bool, vec![true.into()]));
        assert!(matches!(
            encode_with(EncodeOptions::default(), &bools),
            Err(FabricError::UnsupportedElement(Kind::Bool))
        ));
        let empty = Value::Array(Array::empty(Kind::Pointer));
        assert!(matches!(
            encode_with(EncodeOptions::default(), &empty),
            Err(FabricError::UnsupportedElement(Kind::Pointer))
        ));
    }

    #[test]
    fn heterogeneous_collections_are_rejected() {
        let arr = Value::Array(Array::new(Kind::U32, vec![1u32.into(), 2u16.into()]));
        assert!(matches!(
            encode_with(EncodeOptions::default(), &arr),
            Err(FabricError::KindMismatch {
                expected: Kind::U32,
                found: Kind::U16
            })
        ));

        let mut map = Map::new(Kind::String, Kind::U8);
        map.insert(3u8, 1u8);
        assert!(matches!(
            encode_with(EncodeOptions::default(), &Value::Map(map)),
            Err(FabricError::KindMismatch { .. })
        ));
    }

    #[test]
    fn depth_cap() {
        let mut value = Value::U32(1);
        for _ in 0..10 {
            value = Value::pointer(value);
        }
        let shallow = EncodeOptions {
            max_depth: 5,
            ..EncodeOptions::default()
        };
        assert!(matches!(
            encode_with(shallow, &value),
            Err(FabricError::DepthExceeded { limit: 5 })
        ));
        assert!(encode_with(EncodeOptions::default(), &value).is_ok());
    }

    #[derive(Debug)]
    enum Endpoint {
        Port(u16),
        Named(String),
    }

    impl CustomMarshal for Endpoint {
        fn marshal(&self, enc: &mut Encoder) -> Result<()> {
            enc.write_object(|enc| match self {
                Endpoint::Port(port) => {
                    enc.write_value(&Value::U8(1))?;
                    enc.write_value(&Value::U16(*port))
                }
                Endpoint::Named(name) => {
                    enc.write_value(&Value::U8(2))?;
                    enc.write_value(&Value::from(name.as_str()))
                }
            })
        }
    }

    #[test]
    fn custom_marshaler_replaces_generic_path() {
        let obj = Object::with_marshaler(Endpoint::Port(80));
        assert_eq!(
            encode(&Value::Object(obj)),
            framed(&[tag::UCHAR, 0x01, tag::USHORT, 0x50])
        );

        let obj = Object::with_marshaler(Endpoint::Named("a".into()));
        assert_eq!(
            encode(&Value::Object(obj)),
            framed(&[tag::UCHAR, 0x02, 0x4D, 0x01, 0x61, 0x00])
        );
    }

    #[derive(Debug)]
    struct Broken;

    impl CustomMarshal for Broken {
        fn marshal(&self, enc: &mut Encoder) -> Result<()> {
            enc.write_object(|enc| {
                enc.write_tag(tag::UINT32);
                enc.write_compressed_unsigned(3, 1)
            })
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "custom marshaler also carries fields")]
    fn custom_marshaler_with_fields_is_rejected() {
        let obj = Object::with_marshaler(Endpoint::Port(80)).field(1u8);
        let _ = encode_with(EncodeOptions::default(), &Value::Object(obj));
    }

    #[test]
    fn failed_object_closes_its_scope() {
        let mut enc = Encoder::new(EncodeOptions::default());
        let err = enc.write_value(&Value::Object(Object::with_marshaler(Broken)));
        assert!(matches!(err, Err(FabricError::Codec(_))));
        assert_eq!(enc.scopes.depth(), 0);
        assert!(enc.into_bytes().is_empty());
    }
}
