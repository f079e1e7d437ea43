//! Core types for the entity framework

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the identifier field every entity carries
pub const ID_FIELD_NAME: &str = "Id";

/// Canonical sortable timestamp format used on the wire (`YYYY-MM-DDTHH:MM:SS`)
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Field types reported by the remote schema (`describeSObject`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Picklist,
    MultiPicklist,
    Combobox,
    Reference,
    Base64,
    Boolean,
    Currency,
    TextArea,
    Int,
    Long,
    Double,
    Percent,
    Phone,
    Id,
    Date,
    DateTime,
    Time,
    Url,
    Email,
    EncryptedString,
    DataCategoryGroupReference,
    Location,
    Address,
    #[serde(rename = "anyType")]
    AnyType,
    ComplexValue,
}

impl FieldType {
    /// Name of the type as it appears in the partner WSDL
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Picklist => "picklist",
            FieldType::MultiPicklist => "multipicklist",
            FieldType::Combobox => "combobox",
            FieldType::Reference => "reference",
            FieldType::Base64 => "base64",
            FieldType::Boolean => "boolean",
            FieldType::Currency => "currency",
            FieldType::TextArea => "textarea",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Double => "double",
            FieldType::Percent => "percent",
            FieldType::Phone => "phone",
            FieldType::Id => "id",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::EncryptedString => "encryptedstring",
            FieldType::DataCategoryGroupReference => "datacategorygroupreference",
            FieldType::Location => "location",
            FieldType::Address => "address",
            FieldType::AnyType => "anyType",
            FieldType::ComplexValue => "complexvalue",
        }
    }

    /// Whether values of this type are carried as integers
    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Long)
    }

    /// Whether values of this type are carried as floating point numbers
    pub fn is_decimal(&self) -> bool {
        matches!(
            self,
            FieldType::Double | FieldType::Currency | FieldType::Percent
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Date/time value with second precision, rendered in the canonical sortable format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp, truncating sub-second precision
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// Create a Timestamp from seconds since Unix epoch
    pub fn from_timestamp(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Create a Timestamp representing the current moment
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Get the inner DateTime<Utc>
    pub fn datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS`
    pub fn to_canonical(&self) -> String {
        self.0.format(CANONICAL_TIMESTAMP_FORMAT).to_string()
    }

    /// Parse the canonical format, RFC 3339, or the `+0000` offset form the server emits
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::new(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Ok(Self::new(dt.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, CANONICAL_TIMESTAMP_FORMAT) {
            return Ok(Self::new(naive.and_utc()));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| Self::new(naive.and_utc()))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

impl std::ops::Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical())
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(DateTime::<Utc>::default())
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw)
            .map_err(|e| serde::de::Error::custom(format!("Invalid timestamp '{}': {}", raw, e)))
    }
}

/// Three-state entity field: left unchanged, explicitly cleared, or set.
///
/// Serialize with `#[serde(default, skip_serializing_if = "Tristate::is_unset")]`
/// so that `Unset` never reaches the field-value map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Tristate<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Tristate<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Tristate::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tristate::Null)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Tristate::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Tristate::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<T> for Tristate<T> {
    fn from(value: T) -> Self {
        Tristate::Value(value)
    }
}

impl<T: Serialize> Serialize for Tristate<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Tristate::Value(v) => serializer.serialize_some(v),
            Tristate::Unset | Tristate::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Tristate<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Tristate::Value(v),
            None => Tristate::Null,
        })
    }
}

/// Error type for entity mapping and remote store operations
#[derive(Error, Debug)]
pub enum EntityError {
    /// A required argument was missing or empty
    #[error("Invalid argument: '{argument}' must not be empty")]
    InvalidArgument {
        argument: String,
    },

    /// An operation precondition was violated
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        reason: String,
    },

    /// The service has no authenticated session
    #[error("Invalid operation: binding is not logged in")]
    NotConnected,

    /// Type conversion error while materializing a field
    #[error("Type conversion error for entity '{entity_type}' field '{field}': expected {expected}, got {actual}")]
    TypeConversion {
        entity_type: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error for entity '{entity_type}': {message}")]
    Serialization {
        entity_type: String,
        message: String,
    },

    /// The remote collaborator failed or returned an unusable response
    #[error("Remote operation '{operation}' failed: {reason}")]
    Remote {
        operation: String,
        reason: String,
    },

    /// A recursively extracted entity graph refers back to itself
    #[error("Recursive field extraction cycle detected: {path}")]
    CycleDetected {
        path: String,
    },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration {
        reason: String,
    },

    /// Builder pattern error
    #[error("Builder error for '{target}': {message}")]
    Builder {
        target: String,
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl EntityError {
    /// Create an InvalidArgument error
    pub fn invalid_argument<A: AsRef<str>>(argument: A) -> Self {
        Self::InvalidArgument {
            argument: argument.as_ref().to_string(),
        }
    }

    /// Create an InvalidOperation error
    pub fn invalid_operation<R: AsRef<str>>(reason: R) -> Self {
        Self::InvalidOperation {
            reason: reason.as_ref().to_string(),
        }
    }

    /// Create a TypeConversion error
    pub fn type_conversion<E: AsRef<str>, F: AsRef<str>, Ex: AsRef<str>, A: AsRef<str>>(
        entity_type: E,
        field: F,
        expected: Ex,
        actual: A,
    ) -> Self {
        Self::TypeConversion {
            entity_type: entity_type.as_ref().to_string(),
            field: field.as_ref().to_string(),
            expected: expected.as_ref().to_string(),
            actual: actual.as_ref().to_string(),
        }
    }

    /// Create a Serialization error
    pub fn serialization<E: AsRef<str>>(entity_type: E, source: serde_json::Error) -> Self {
        Self::Serialization {
            entity_type: entity_type.as_ref().to_string(),
            message: source.to_string(),
        }
    }

    /// Create a Remote error
    pub fn remote<O: AsRef<str>, R: fmt::Display>(operation: O, reason: R) -> Self {
        Self::Remote {
            operation: operation.as_ref().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a CycleDetected error from the chain of object types visited
    pub fn cycle_detected<S: AsRef<str>>(path: &[S]) -> Self {
        Self::CycleDetected {
            path: path
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(" -> "),
        }
    }

    /// Create a Configuration error
    pub fn configuration<R: AsRef<str>>(reason: R) -> Self {
        Self::Configuration {
            reason: reason.as_ref().to_string(),
        }
    }

    /// Create an Internal error
    pub fn internal<M: AsRef<str>>(message: M) -> Self {
        Self::Internal {
            message: message.as_ref().to_string(),
        }
    }

    /// Get the entity type associated with this error (if any)
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Self::TypeConversion { entity_type, .. } | Self::Serialization { entity_type, .. } => {
                Some(entity_type)
            }
            _ => None,
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidArgument { .. }
            | Self::InvalidOperation { .. }
            | Self::NotConnected
            | Self::Builder { .. } => true,

            Self::TypeConversion { .. }
            | Self::Serialization { .. }
            | Self::Remote { .. }
            | Self::CycleDetected { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for entity operations
pub type EntityResult<T> = Result<T, EntityError>;

// Implement From trait for derive_builder compatibility
impl From<derive_builder::UninitializedFieldError> for EntityError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        EntityError::Builder {
            target: "Unknown".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for EntityError {
    fn from(error: anyhow::Error) -> Self {
        EntityError::Internal {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_canonical_format() {
        let ts = Timestamp::from_timestamp(1_700_000_000).unwrap();
        assert_eq!(ts.to_canonical(), "2023-11-14T22:13:20");
        assert_eq!(ts.to_string(), "2023-11-14T22:13:20");
    }

    #[test]
    fn test_timestamp_parses_server_formats() {
        let expected = Timestamp::from_timestamp(1_700_000_000).unwrap();
        assert_eq!(Timestamp::parse("2023-11-14T22:13:20").unwrap(), expected);
        assert_eq!(Timestamp::parse("2023-11-14T22:13:20.000Z").unwrap(), expected);
        assert_eq!(Timestamp::parse("2023-11-14T22:13:20.000+0000").unwrap(), expected);
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn test_timestamp_truncates_subseconds() {
        let dt = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let ts = Timestamp::new(dt);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_timestamp_serde_uses_canonical_string() {
        let ts = Timestamp::from_timestamp(0).unwrap();
        let json = serde_json::to_value(ts).unwrap();
        assert_eq!(json, serde_json::json!("1970-01-01T00:00:00"));
        let back: Timestamp = serde_json::from_value(json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_tristate_serde() {
        #[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
        #[serde(default)]
        struct Probe {
            #[serde(skip_serializing_if = "Tristate::is_unset")]
            a: Tristate<String>,
            #[serde(skip_serializing_if = "Tristate::is_unset")]
            b: Tristate<String>,
            #[serde(skip_serializing_if = "Tristate::is_unset")]
            c: Tristate<String>,
        }

        let probe = Probe {
            a: Tristate::Unset,
            b: Tristate::Null,
            c: Tristate::Value("x".to_string()),
        };
        let json = serde_json::to_value(&probe).unwrap();
        assert_eq!(json, serde_json::json!({ "b": null, "c": "x" }));

        let back: Probe = serde_json::from_value(json).unwrap();
        assert_eq!(back, probe);
    }

    #[test]
    fn test_field_type_wire_names() {
        let parsed: FieldType = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(parsed, FieldType::DateTime);
        let parsed: FieldType = serde_json::from_str("\"anyType\"").unwrap();
        assert_eq!(parsed, FieldType::AnyType);
        assert_eq!(FieldType::MultiPicklist.to_string(), "multipicklist");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(EntityError::NotConnected.is_recoverable());
        assert!(EntityError::invalid_argument("objectTypeName").is_recoverable());
        assert!(!EntityError::remote("query", "timeout").is_recoverable());
        assert_eq!(
            EntityError::cycle_detected(&["Node", "Node"]).to_string(),
            "Recursive field extraction cycle detected: Node -> Node"
        );
    }
}
