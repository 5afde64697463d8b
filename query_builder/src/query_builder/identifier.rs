//! Identifier quoting
//!
//! Names are tolerated as given (arbitrary but non-adversarial): any existing
//! quote character is stripped, the name is split on `.`, and each segment is
//! quoted with the dialect's quote character.

use crate::errors::BuildError;

/// Path separator inside identifiers and collection references
pub const PATH_SEPARATOR: char = '.';

/// Quote a dotted path, one segment at a time
pub fn quote_path(name: &str, quote: char) -> Result<String, BuildError> {
    let stripped: String = name.chars().filter(|c| *c != quote).collect();
    let segments = stripped
        .split(PATH_SEPARATOR)
        .map(|segment| quote_segment(segment, quote, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("."))
}

/// Quote a single identifier without splitting it
pub fn quote_name(name: &str, quote: char) -> Result<String, BuildError> {
    let stripped: String = name.chars().filter(|c| *c != quote).collect();
    quote_segment(&stripped, quote, name)
}

fn quote_segment(segment: &str, quote: char, original: &str) -> Result<String, BuildError> {
    if segment.trim().is_empty() {
        return Err(BuildError::InvalidIdentifier(original.to_string()));
    }
    Ok(format!("{quote}{segment}{quote}"))
}

/// Wide-column collection reference: optional keyspace plus table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub keyspace: Option<String>,
    pub table: String,
}

impl CollectionRef {
    /// Split on the first separator: `ks.table` -> (`ks`, `table`)
    pub fn parse(path: &str) -> Result<Self, BuildError> {
        let reference = match path.split_once(PATH_SEPARATOR) {
            Some((keyspace, table)) => Self {
                keyspace: Some(keyspace.to_string()),
                table: table.to_string(),
            },
            None => Self {
                keyspace: None,
                table: path.to_string(),
            },
        };
        Ok(reference)
    }

    /// Render for a statement.
    ///
    /// Plain identifiers stay bare so the server folds their case; parts the
    /// caller already quoted, or that are not plain identifiers, are quoted.
    pub fn rendered(&self, quote: char) -> Result<String, BuildError> {
        let table = render_part(&self.table, quote)?;
        match &self.keyspace {
            Some(keyspace) => Ok(format!("{}.{}", render_part(keyspace, quote)?, table)),
            None => Ok(table),
        }
    }
}

fn render_part(part: &str, quote: char) -> Result<String, BuildError> {
    if is_plain_identifier(part) {
        Ok(part.to_string())
    } else {
        quote_name(part, quote)
    }
}

/// Letter or underscore, then letters, digits or underscores
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_path_splits_and_strips() {
        assert_eq!(quote_path("id", '`').unwrap(), "`id`");
        assert_eq!(quote_path("db.table", '`').unwrap(), "`db`.`table`");
        assert_eq!(quote_path("`db`.`table`", '`').unwrap(), "`db`.`table`");
        assert_eq!(quote_path("odd name", '`').unwrap(), "`odd name`");
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(quote_path("", '`').is_err());
        assert!(quote_path("db..table", '`').is_err());
        assert!(quote_name("\"\"", '"').is_err());
    }

    #[test]
    fn test_collection_ref_splits_on_first_separator() {
        let reference = CollectionRef::parse("ks.table.extra").unwrap();
        assert_eq!(reference.keyspace.as_deref(), Some("ks"));
        assert_eq!(reference.table, "table.extra");
        assert_eq!(reference.rendered('"').unwrap(), "ks.\"table.extra\"");

        let bare = CollectionRef::parse("events").unwrap();
        assert_eq!(bare.keyspace, None);
        assert_eq!(bare.rendered('"').unwrap(), "events");
    }

    #[test]
    fn test_collection_ref_case_folds_unless_quoted() {
        let folded = CollectionRef::parse("Shop.Users").unwrap();
        assert_eq!(folded.rendered('"').unwrap(), "Shop.Users");

        let exact = CollectionRef::parse("shop.\"Users\"").unwrap();
        assert_eq!(exact.rendered('"').unwrap(), "shop.\"Users\"");

        let odd = CollectionRef::parse("2024 events").unwrap();
        assert_eq!(odd.rendered('"').unwrap(), "\"2024 events\"");
        assert!(CollectionRef::parse("ks.\"\"").unwrap().rendered('"').is_err());
    }
}
