//! Opaque blobs: values with no structural mapping, written with serde.
//!
//! Only types that opt in through [`OpaqueType`] can take this path, and a
//! blob can only be read back by a codec that registered the same type
//! name. Blobs are JSON text and are not meant to be portable between
//! programs that register different types under the same name.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{CodecError, Result};

/// A type that may be written as an opaque blob.
pub trait OpaqueType: Serialize + DeserializeOwned + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Name recorded in the blob node, used to find the decoder.
    const NAME: &'static str;
}

/// Object-safe view of an [`OpaqueType`].
pub trait Opaque: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;
    fn to_json(&self) -> serde_json::Result<String>;
    fn eq_dyn(&self, other: &dyn Opaque) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: OpaqueType> Opaque for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn eq_dyn(&self, other: &dyn Opaque) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| self == o)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct OpaqueValue(Arc<dyn Opaque>);

impl OpaqueValue {
    pub fn new<T: OpaqueType>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn downcast_ref<T: OpaqueType>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    pub(crate) fn to_json(&self) -> Result<String> {
        self.0
            .to_json()
            .map_err(|e| CodecError::Serialization(format!("{}: {}", self.name(), e)))
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(other.0.as_ref())
    }
}

type DecodeFn = fn(&str) -> serde_json::Result<OpaqueValue>;

fn decode_as<T: OpaqueType>(text: &str) -> serde_json::Result<OpaqueValue> {
    Ok(OpaqueValue::new(serde_json::from_str::<T>(text)?))
}

/// Decoders for the opaque types a codec accepts.
#[derive(Clone, Default)]
pub struct OpaqueRegistry {
    decoders: BTreeMap<&'static str, DecodeFn>,
}

impl fmt::Debug for OpaqueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl OpaqueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: OpaqueType>(&mut self) {
        self.decoders.insert(T::NAME, decode_as::<T>);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    pub fn decode(&self, name: &str, text: &str) -> Result<OpaqueValue> {
        let decode = self
            .decoders
            .get(name)
            .ok_or_else(|| CodecError::UnknownOpaque(name.to_string()))?;
        decode(text).map_err(|e| CodecError::MalformedBlob(format!("{}: {}", name, e)))
    }
}
