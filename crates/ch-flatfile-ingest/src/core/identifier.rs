//! Identifier quoting for statement construction.
//!
//! Identifiers are the one part of a statement that cannot travel as a
//! bound parameter, so every dynamic table or column name is screened
//! and backtick-quoted before it reaches statement text. ClickHouse
//! follows the MySQL convention: wrap in backticks, double any backtick
//! inside the name.

use crate::error::{IngestError, Result};

/// Longest identifier the builder will accept. ClickHouse tolerates
/// more, but a longer name in a transfer spec is a sign of garbage or
/// worse.
const MAX_IDENT_BYTES: usize = 128;

/// Screen an identifier before it can be embedded in a statement.
///
/// Empty names, names carrying a NUL byte, and names longer than
/// [`MAX_IDENT_BYTES`] are rejected with an `IngestError::Config`.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(IngestError::Config("empty identifier".to_string()));
    }

    if name.contains('\0') {
        return Err(IngestError::Config(format!(
            "identifier {:?} contains a NUL byte",
            name
        )));
    }

    if name.len() > MAX_IDENT_BYTES {
        return Err(IngestError::Config(format!(
            "identifier of {} bytes exceeds the {}-byte limit",
            name.len(),
            MAX_IDENT_BYTES
        )));
    }

    Ok(())
}

/// Screen and backtick-quote an identifier.
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Table-qualified column reference for join conditions.
pub fn qualify(table: &str, column: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_ident(table)?, quote_ident(column)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass() {
        for name in ["events", "order_items", "Col7", "field name", "müsli"] {
            assert!(validate_identifier(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(validate_identifier("")
            .unwrap_err()
            .to_string()
            .contains("empty"));
    }

    #[test]
    fn test_nul_byte_rejected() {
        assert!(validate_identifier("t\0x")
            .unwrap_err()
            .to_string()
            .contains("NUL"));
    }

    #[test]
    fn test_oversized_name_rejected() {
        let name = "x".repeat(MAX_IDENT_BYTES + 1);
        assert!(validate_identifier(&name)
            .unwrap_err()
            .to_string()
            .contains("limit"));
    }

    #[test]
    fn test_quote_wraps_in_backticks() {
        assert_eq!(quote_ident("events").unwrap(), "`events`");
    }

    #[test]
    fn test_quote_doubles_embedded_backticks() {
        assert_eq!(quote_ident("a`b").unwrap(), "`a``b`");
        assert_eq!(
            quote_ident("x`; DROP TABLE y; --").unwrap(),
            "`x``; DROP TABLE y; --`"
        );
    }

    #[test]
    fn test_qualify_quotes_both_parts() {
        assert_eq!(qualify("orders", "user_id").unwrap(), "`orders`.`user_id`");
        assert!(qualify("orders", "").is_err());
        assert!(qualify("a\0b", "user_id").is_err());
    }
}
