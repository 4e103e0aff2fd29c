//! Input value model for the Fabric encoder.

mod to_value;
mod value;

pub use to_value::ToValue;
pub use value::{Array, Kind, Map, Object, Value};
