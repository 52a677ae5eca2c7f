// Stowage Payload Model
//
// Values crossing the bridge between the application runtime and the durable
// store. `null` on the wire means "nothing should be stored".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Either nothing should be stored, or a value should.
#[derive(Debug, Clone, PartialEq)]
pub enum Persisted<T> {
    /// The slot must not exist
    Absent,
    /// The slot holds this value
    Present(T),
}

/// A value the application submits for persistence.
pub type PersistedValue = Persisted<Value>;

/// The slot content read at startup, passed through as raw JSON text.
///
/// The bridge never parses what it loads; see [`Persisted::decode`] for the
/// application-side helpers.
pub type LoadedValue = Persisted<String>;

impl<T> Persisted<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Persisted::Absent)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Persisted::Present(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Persisted::Absent => None,
            Persisted::Present(value) => Some(value),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Persisted::Absent => None,
            Persisted::Present(value) => Some(value),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Persisted<U> {
        match self {
            Persisted::Absent => Persisted::Absent,
            Persisted::Present(value) => Persisted::Present(f(value)),
        }
    }
}

impl<T> Default for Persisted<T> {
    fn default() -> Self {
        Persisted::Absent
    }
}

impl<T> From<Option<T>> for Persisted<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Persisted::Present(value),
            None => Persisted::Absent,
        }
    }
}

impl<T: Serialize> Serialize for Persisted<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Persisted<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Persisted::from)
    }
}

impl PersistedValue {
    /// Wrap anything convertible into a JSON value.
    pub fn present(value: impl Into<Value>) -> Self {
        Persisted::Present(value.into())
    }

    /// Convert an arbitrary serializable value.
    ///
    /// Fails when `value` has no JSON representation (for example a map with
    /// non-string keys). This is the synchronous serialization failure the
    /// caller must handle.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Persisted::Present)
    }

    /// Canonical JSON text for the slot, or `None` when the slot should be removed.
    pub fn to_json_text(&self) -> serde_json::Result<Option<String>> {
        self.as_option().map(serde_json::to_string).transpose()
    }
}

impl LoadedValue {
    /// Raw slot text as it was found in the store.
    pub fn raw_text(&self) -> Option<&str> {
        self.as_option().map(String::as_str)
    }

    /// Parse the raw slot text into a JSON value.
    pub fn decode(&self) -> serde_json::Result<PersistedValue> {
        match self {
            Persisted::Absent => Ok(Persisted::Absent),
            Persisted::Present(text) => serde_json::from_str(text).map(Persisted::Present),
        }
    }

    /// Parse the raw slot text straight into an application type.
    pub fn decode_as<T: DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
        self.raw_text().map(serde_json::from_str).transpose()
    }
}

impl fmt::Display for PersistedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persisted::Absent => write!(f, "<absent>"),
            Persisted::Present(value) => write!(f, "{}", value),
        }
    }
}

/// Outcome of the durable mutation an acknowledgment reports on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AckStatus {
    /// Slot now holds the submitted value
    Written,
    /// Slot was removed
    Removed,
    /// The store rejected the mutation; the slot may be stale
    Degraded(String),
}

impl AckStatus {
    pub fn is_durable(&self) -> bool {
        !matches!(self, AckStatus::Degraded(_))
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckStatus::Written => write!(f, "written"),
            AckStatus::Removed => write!(f, "removed"),
            AckStatus::Degraded(reason) => write!(f, "degraded ({})", reason),
        }
    }
}

/// Acknowledgment delivered to the application once per submission
///
/// On the wire the value is tagged (`{"kind":"present","value":null}` or
/// `{"kind":"absent"}`), so a present `null` never reads back as a removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckEvent {
    /// Position of the submission, starting at 1
    pub sequence: u64,
    /// The value exactly as it was submitted
    #[serde(with = "tagged_value")]
    pub value: PersistedValue,
    pub status: AckStatus,
}

mod tagged_value {
    use super::{Persisted, PersistedValue};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    #[derive(Serialize)]
    #[serde(tag = "kind", content = "value", rename_all = "snake_case")]
    enum TaggedRef<'a> {
        Absent,
        Present(&'a Value),
    }

    #[derive(Deserialize)]
    #[serde(tag = "kind", content = "value", rename_all = "snake_case")]
    enum Tagged {
        Absent,
        Present(Value),
    }

    pub fn serialize<S: Serializer>(value: &PersistedValue, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Persisted::Absent => TaggedRef::Absent,
            Persisted::Present(value) => TaggedRef::Present(value),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PersistedValue, D::Error> {
        Ok(match Tagged::deserialize(deserializer)? {
            Tagged::Absent => Persisted::Absent,
            Tagged::Present(value) => Persisted::Present(value),
        })
    }
}

/// Startup configuration handed to the application runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    /// Slot content at startup, `null` when nothing was stored
    pub storage: LoadedValue,
}
