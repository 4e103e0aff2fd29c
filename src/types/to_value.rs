//! Conversion of typed Rust values into the `Value` graph.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use bytes::Bytes;

use super::value::{Array, Kind, Map, Object, Value};

/// A Rust type with a fixed wire shape.
///
/// `KIND` is known without a value, which lets an empty `Vec<T>` still pick
/// its element tag. Record types implement this by returning
/// [`Value::Object`] with their fields in declaration order.
pub trait ToValue {
    const KIND: Kind;

    fn to_value(&self) -> Value;
}

macro_rules! impl_to_value_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                const KIND: Kind = Kind::$kind;

                fn to_value(&self) -> Value {
                    Value::$kind(*self)
                }
            }
        )*
    };
}

impl_to_value_scalar! {
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
}

impl ToValue for str {
    const KIND: Kind = Kind::String;

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    const KIND: Kind = Kind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for Bytes {
    const KIND: Kind = Kind::Array;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for Object {
    const KIND: Kind = Kind::Object;

    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    const KIND: Kind = T::KIND;

    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

/// `Box<T>` is owned storage, not a nullable reference, so it is transparent.
impl<T: ToValue + ?Sized> ToValue for Box<T> {
    const KIND: Kind = T::KIND;

    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    const KIND: Kind = Kind::Pointer;

    fn to_value(&self) -> Value {
        Value::Pointer(self.as_ref().map(|v| Box::new(v.to_value())))
    }
}

impl<T: ToValue> ToValue for [T] {
    const KIND: Kind = Kind::Array;

    fn to_value(&self) -> Value {
        Value::Array(Array::new(
            T::KIND,
            self.iter().map(ToValue::to_value).collect(),
        ))
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    const KIND: Kind = Kind::Array;

    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<K: ToValue, V: ToValue, S: BuildHasher> ToValue for HashMap<K, V, S> {
    const KIND: Kind = Kind::Map;

    fn to_value(&self) -> Value {
        let mut map = Map::new(K::KIND, V::KIND);
        for (k, v) in self {
            map.push_unique(k.to_value(), v.to_value());
        }
        Value::Map(map)
    }
}

impl<K: ToValue, V: ToValue> ToValue for BTreeMap<K, V> {
    const KIND: Kind = Kind::Map;

    fn to_value(&self) -> Value {
        let mut map = Map::new(K::KIND, V::KIND);
        for (k, v) in self {
            map.push_unique(k.to_value(), v.to_value());
        }
        Value::Map(map)
    }
}
