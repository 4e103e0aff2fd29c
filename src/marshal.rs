//! Top-level entry point and encoder configuration.

use bytes::Bytes;

use crate::error::{FabricError, Result};
use crate::types::{Object, ToValue, Value};
use crate::wire::encode::{EncodeOptions, Encoder, IntegerArrays};

/// Builder for configuring how values are marshaled.
///
/// Holds only configuration, so one instance can be shared freely across
/// threads; every call builds its own encode state.
#[derive(Debug, Clone, Default)]
pub struct Marshaller {
    options: EncodeOptions,
}

impl Marshaller {
    /// Creates a marshaller with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum value nesting depth.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.options.max_depth = limit;
        self
    }

    /// Sorts map entries by key so equal maps always produce equal bytes.
    pub fn sorted_maps(mut self, enabled: bool) -> Self {
        self.options.sorted_maps = enabled;
        self
    }

    /// Sets how non-empty integer arrays are introduced.
    pub fn integer_arrays(mut self, mode: IntegerArrays) -> Self {
        self.options.integer_arrays = mode;
        self
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encodes `value`, which must be a non-nil reference to an object.
    ///
    /// A `Value::Bytes` input is taken to be an already-encoded payload and
    /// is returned as is.
    pub fn marshal(&self, value: &Value) -> Result<Bytes> {
        let record = match value {
            Value::Bytes(raw) => {
                tracing::trace!(len = raw.len(), "passing through pre-encoded payload");
                return Ok(raw.clone());
            }
            Value::Pointer(Some(inner)) => match &**inner {
                Value::Object(obj) => obj,
                other => {
                    return Err(FabricError::InvalidInput(format!(
                        "marshal input must reference an object, found {}",
                        other.kind()
                    )));
                }
            },
            Value::Pointer(None) => {
                return Err(FabricError::InvalidInput(
                    "marshal input must be a non-nil reference".into(),
                ));
            }
            other => {
                return Err(FabricError::InvalidInput(format!(
                    "marshal input must be a reference, found {}",
                    other.kind()
                )));
            }
        };
        self.marshal_object(record)
    }

    /// Encodes an object directly, skipping the reference check.
    pub fn marshal_object(&self, obj: &Object) -> Result<Bytes> {
        let mut enc = Encoder::new(self.options);
        match enc.write_record(obj) {
            Ok(()) => {
                let bytes = enc.into_bytes();
                tracing::trace!(len = bytes.len(), "marshaled object");
                Ok(bytes)
            }
            Err(e) => {
                tracing::debug!(error = %e, "marshal failed");
                Err(e)
            }
        }
    }

    /// Converts a typed record and encodes it.
    pub fn to_bytes<T: ToValue + ?Sized>(&self, value: &T) -> Result<Bytes> {
        self.marshal(&Value::pointer(value.to_value()))
    }
}

/// Encodes `value` with the default settings. See [`Marshaller::marshal`].
pub fn marshal(value: &Value) -> Result<Bytes> {
    Marshaller::default().marshal(value)
}

/// Converts and encodes a typed record with the default settings.
pub fn to_bytes<T: ToValue + ?Sized>(value: &T) -> Result<Bytes> {
    Marshaller::default().to_bytes(value)
}
