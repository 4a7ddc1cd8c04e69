//! Structural type classification of decoded BSON values.
//!
//! Classification is total: every value maps to a [`TypeTag`], and values
//! outside the fixed vocabulary become [`TypeTag::Unknown`] carrying the
//! element type name for diagnostics.

use std::fmt;

use bson::Bson;

/// Semantic type tag of a single value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    String,
    Int32,
    Int64,
    Double,
    Boolean,
    ObjectId,
    Date,
    Array,
    Object,
    BinData,
    Regex,
    Decimal,
    Timestamp,
    /// Any other BSON element type, named after its representation.
    Unknown(String),
}

impl TypeTag {
    /// Get the tag name for the fixed vocabulary.
    ///
    /// Returns `"unknown"` for [`TypeTag::Unknown`]; use `to_string()` to get
    /// the name including the underlying representation.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::String => "string",
            TypeTag::Int32 => "int32",
            TypeTag::Int64 => "int64",
            TypeTag::Double => "double",
            TypeTag::Boolean => "boolean",
            TypeTag::ObjectId => "objectId",
            TypeTag::Date => "date",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::BinData => "binData",
            TypeTag::Regex => "regex",
            TypeTag::Decimal => "decimal",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Unknown(_) => "unknown",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeTag::Object)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Unknown(repr) => write!(f, "unknown({repr})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Classify a value that may be absent. Absent values are `null`.
pub fn classify(value: Option<&Bson>) -> TypeTag {
    value.map_or(TypeTag::Null, classify_value)
}

/// Classify a decoded value.
pub fn classify_value(value: &Bson) -> TypeTag {
    match value {
        Bson::Null => TypeTag::Null,
        Bson::String(_) => TypeTag::String,
        Bson::Int32(_) => TypeTag::Int32,
        Bson::Int64(_) => TypeTag::Int64,
        Bson::Double(_) => TypeTag::Double,
        Bson::Boolean(_) => TypeTag::Boolean,
        Bson::ObjectId(_) => TypeTag::ObjectId,
        Bson::DateTime(_) => TypeTag::Date,
        Bson::Array(_) => TypeTag::Array,
        Bson::Document(_) => TypeTag::Object,
        Bson::Binary(_) => TypeTag::BinData,
        Bson::RegularExpression(_) => TypeTag::Regex,
        Bson::Decimal128(_) => TypeTag::Decimal,
        Bson::Timestamp(_) => TypeTag::Timestamp,
        other => TypeTag::Unknown(format!("{:?}", other.element_type())),
    }
}
