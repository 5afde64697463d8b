//! SQL type conversion utilities
//!
//! This module classifies relational column type names into the value
//! family a result cell decodes into.

/// Decoding family of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Bool,
    SignedInt,
    UnsignedInt,
    Float,
    Double,
    Text,
    Bytes,
    DateTime,
    Timestamp,
    Date,
    Time,
    Json,
    /// Anything else is decoded from its textual form
    Other,
}

/// Map a MySQL column type name (as reported by the driver) to its family
pub fn mysql_type_family(type_name: &str) -> TypeFamily {
    // Normalize for consistent matching: "int unsigned" == "INT UNSIGNED"
    let normalized = type_name.trim().to_ascii_uppercase();
    if normalized.ends_with("UNSIGNED") {
        return TypeFamily::UnsignedInt;
    }
    match normalized.as_str() {
        "BOOLEAN" | "BOOL" => TypeFamily::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
            TypeFamily::SignedInt
        }
        "FLOAT" => TypeFamily::Float,
        "DOUBLE" | "REAL" => TypeFamily::Double,
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            TypeFamily::Text
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            TypeFamily::Bytes
        }
        "DATETIME" => TypeFamily::DateTime,
        "TIMESTAMP" => TypeFamily::Timestamp,
        "DATE" => TypeFamily::Date,
        "TIME" => TypeFamily::Time,
        "JSON" => TypeFamily::Json,
        _ => TypeFamily::Other,
    }
}
