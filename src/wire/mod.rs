//! Fabric binary wire format.
//!
//! Every value starts with a one-byte type tag, optionally combined with
//! `EMPTY_VALUE_BIT` (zero value, no payload) and `ARRAY_BIT` (counted
//! repetition). Objects are length-prefixed so a reader can skip them
//! without interpreting their fields. Multi-byte quantities are
//! little-endian.

pub mod encode;
pub mod scope;
pub mod tag;
pub mod varint;

pub use encode::{CustomMarshal, EncodeOptions, Encoder, IntegerArrays};
