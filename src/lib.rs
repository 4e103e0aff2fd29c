//! fabric-marshal — an encoder for the Fabric binary serialization format.
//!
//! Fabric is a compact, self-describing format: every value carries a type
//! tag, so a reader can parse or skip content without a schema. This crate
//! walks a [`Value`] graph and produces the encoded bytes.
//!
//! # Architecture
//!
//! - **`types`** — Input value model (`Value`, `Kind`, `Object`, `Array`, `Map`)
//!   and the `ToValue` conversion trait
//! - **`wire`** — Type tags, compressed integers, scoped buffers and the encoder
//! - **`marshal`** — Entry point and `Marshaller` configuration
//!
//! # Example
//!
//! ```
//! use fabric_marshal::{marshal, Object, Value};
//!
//! let record = Object::default().field(0u32).field("hi");
//! let bytes = marshal(&Value::pointer(record)).unwrap();
//! assert_eq!(bytes[0], fabric_marshal::wire::tag::OBJECT);
//! ```

pub mod error;
pub mod marshal;
pub mod types;
pub mod wire;

pub use error::{FabricError, Result};
pub use marshal::{marshal, to_bytes, Marshaller};
pub use types::{Array, Kind, Map, Object, ToValue, Value};
pub use wire::{CustomMarshal, Encoder, IntegerArrays};
