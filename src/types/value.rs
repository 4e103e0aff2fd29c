//! Fabric input value types.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::wire::encode::CustomMarshal;

/// The runtime shape of a value, independent of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
    Pointer,
    Object,
    Array,
    Map,
}

impl Kind {
    /// Returns true for the eight fixed-width integer kinds.
    pub fn is_integer(self) -> bool {
        self.width().is_some()
    }

    /// Native byte width of an integer kind.
    pub fn width(self) -> Option<usize> {
        match self {
            Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 => Some(4),
            Self::I64 | Self::U64 => Some(8),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Pointer => "pointer",
            Self::Object => "object",
            Self::Array => "array",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in the input graph handed to the encoder.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    // No wire mapping; present so callers get a typed error instead of a silent cast.
    F32(f32),
    F64(f64),
    String(String),
    /// A byte buffer. Nested, it encodes as a `u8` array; at the top level
    /// it is treated as an already-encoded payload.
    Bytes(Bytes),
    /// A nullable reference.
    Pointer(Option<Box<Value>>),
    Object(Object),
    Array(Array),
    Map(Map),
}

impl Value {
    /// Wraps a value in a non-nil reference.
    pub fn pointer(value: impl Into<Value>) -> Self {
        Self::Pointer(Some(Box::new(value.into())))
    }

    /// The nil reference.
    pub fn nil() -> Self {
        Self::Pointer(None)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::I8(_) => Kind::I8,
            Self::U8(_) => Kind::U8,
            Self::I16(_) => Kind::I16,
            Self::U16(_) => Kind::U16,
            Self::I32(_) => Kind::I32,
            Self::U32(_) => Kind::U32,
            Self::I64(_) => Kind::I64,
            Self::U64(_) => Kind::U64,
            Self::F32(_) => Kind::F32,
            Self::F64(_) => Kind::F64,
            Self::String(_) => Kind::String,
            Self::Bytes(_) | Self::Array(_) => Kind::Array,
            Self::Pointer(_) => Kind::Pointer,
            Self::Object(_) => Kind::Object,
            Self::Map(_) => Kind::Map,
        }
    }

    /// Returns true if this is the zero value of its kind.
    ///
    /// Objects are never zero, whatever their fields hold.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Bool(b) => !*b,
            Self::I8(v) => *v == 0,
            Self::U8(v) => *v == 0,
            Self::I16(v) => *v == 0,
            Self::U16(v) => *v == 0,
            Self::I32(v) => *v == 0,
            Self::U32(v) => *v == 0,
            Self::I64(v) => *v == 0,
            Self::U64(v) => *v == 0,
            Self::F32(v) => *v == 0.0,
            Self::F64(v) => *v == 0.0,
            Self::String(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Pointer(p) => p.is_none(),
            Self::Object(_) => false,
            Self::Array(a) => a.is_empty(),
            Self::Map(m) => m.is_empty(),
        }
    }

    /// Returns the value as a string reference, if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object, if this is an `Object` variant.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }
}

/// A record: an ordered list of fields, or a type that marshals itself.
#[derive(Debug, Clone, Default)]
pub struct Object {
    fields: Vec<Value>,
    marshaler: Option<Arc<dyn CustomMarshal>>,
}

impl Object {
    pub fn new(fields: Vec<Value>) -> Self {
        Self {
            fields,
            marshaler: None,
        }
    }

    /// Creates an object whose wire form is produced entirely by `marshaler`.
    ///
    /// Such an object carries no fields of its own; adding fields to it with
    /// [`field`](Self::field) or [`push`](Self::push) is a logic error and
    /// trips a debug assertion when encoded.
    pub fn with_marshaler(marshaler: impl CustomMarshal + 'static) -> Self {
        Self {
            fields: Vec::new(),
            marshaler: Some(Arc::new(marshaler)),
        }
    }

    /// Appends a field, builder style.
    pub fn field(mut self, value: impl Into<Value>) -> Self {
        self.fields.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.fields.push(value.into());
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn marshaler(&self) -> Option<&dyn CustomMarshal> {
        self.marshaler.as_deref()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        let same_marshaler = match (&self.marshaler, &other.marshaler) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_marshaler && self.fields == other.fields
    }
}

/// A homogeneous sequence. The element kind is declared up front so that an
/// empty array still knows which tag to carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    elem: Kind,
    items: Vec<Value>,
}

impl Array {
    pub fn new(elem: Kind, items: Vec<Value>) -> Self {
        Self { elem, items }
    }

    pub fn empty(elem: Kind) -> Self {
        Self::new(elem, Vec::new())
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn elem(&self) -> Kind {
        self.elem
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An associative collection with declared key and value kinds.
///
/// Entries keep insertion order; inserting an existing key replaces its value
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    key: Kind,
    value: Kind,
    entries: Vec<(Value, Value)>,
}

impl Map {
    pub fn new(key: Kind, value: Kind) -> Self {
        Self {
            key,
            value,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Appends an entry whose key the caller knows is not present yet.
    pub(crate) fn push_unique(&mut self, key: Value, value: Value) {
        self.entries.push((key, value));
    }

    pub fn key_kind(&self) -> Kind {
        self.key
    }

    pub fn value_kind(&self) -> Kind {
        self.value
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// -- Convenience conversions --

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Bytes => Bytes,
    Object => Object,
    Array => Array,
    Map => Map,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}
