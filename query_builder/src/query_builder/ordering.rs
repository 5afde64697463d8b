//! Ordering specs
//!
//! A field prefixed with `-` sorts descending; no prefix sorts ascending.

/// Marker prefix for descending order
pub const DESCENDING_MARKER: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Split `-field` into (`field`, Desc) and `field` into (`field`, Asc)
    pub fn parse_field(spec: &str) -> (String, SortOrder) {
        match spec.strip_prefix(DESCENDING_MARKER) {
            Some(field) => (field.to_string(), SortOrder::Desc),
            None => (spec.to_string(), SortOrder::Asc),
        }
    }
}
