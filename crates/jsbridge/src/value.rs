use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Marshaled value: the tree that sits between script values and host types.
///
/// Script results are converted into this tree first and only then decoded
/// into the caller's type with [`Value::to_serde`], so the target shape is
/// always named at the call site.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(serde_json::Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Object,
    Array,
    Scalar,
}

impl Value {
    #[must_use]
    pub const fn null() -> Self {
        Self(serde_json::Value::Null)
    }

    #[must_use]
    pub const fn from_tree(tree: serde_json::Value) -> Self {
        Self(tree)
    }

    #[must_use]
    pub const fn as_tree(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_tree(self) -> serde_json::Value {
        self.0
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match &self.0 {
            serde_json::Value::Object(_) => ValueKind::Object,
            serde_json::Value::Array(_) => ValueKind::Array,
            _ => ValueKind::Scalar,
        }
    }

    /// Serialize a host value into a tree.
    ///
    /// # Errors
    /// Returns [`Error::Marshal`] if the value cannot be represented (for
    /// example a map with non-string keys).
    pub fn from_serde<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(|e| Error::Marshal(e.to_string()))
    }

    /// Decode the tree into `T`.
    ///
    /// # Errors
    /// Returns [`Error::Deserialize`] if the tree does not have the shape `T`
    /// expects.
    pub fn to_serde<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.0).map_err(Error::Deserialize)
    }

    /// # Errors
    /// Returns [`Error::Json`] if `json` is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map(Self).map_err(Error::Json)
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.0
    }
}
