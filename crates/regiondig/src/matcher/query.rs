use crate::error::{Error, Result};

/// Turn a query description into the byte sequence to search for.
///
/// Tokens are separated by spaces. An all-digit token is a single byte
/// value, a `"quoted string"` (which may contain spaces) contributes its
/// bytes without the quotes, and any other token contributes its raw bytes.
///
/// ```
/// use regiondig::matcher::parse_query;
///
/// assert_eq!(parse_query("72 \"i!\" x").unwrap(), vec![72, b'i', b'!', b'x']);
/// ```
pub fn parse_query(description: &str) -> Result<Vec<u8>> {
    let mut sequence = Vec::new();
    let mut rest = description.trim_start_matches(' ');

    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"').ok_or_else(|| {
                Error::InvalidQuery(format!("unterminated string in '{}'", description))
            })?;
            sequence.extend_from_slice(&quoted.as_bytes()[..end]);
            rest = &quoted[end + 1..];
        } else {
            let end = rest.find(' ').unwrap_or(rest.len());
            let token = &rest[..end];
            if token.bytes().all(|b| b.is_ascii_digit()) {
                let byte = token.parse::<u8>().map_err(|_| {
                    Error::InvalidQuery(format!("byte value out of range: {}", token))
                })?;
                sequence.push(byte);
            } else {
                sequence.extend_from_slice(token.as_bytes());
            }
            rest = &rest[end..];
        }
        rest = rest.trim_start_matches(' ');
    }

    if sequence.is_empty() {
        return Err(Error::InvalidQuery("empty query".to_string()));
    }
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tokens_are_bytes() {
        assert_eq!(parse_query("10 20 255").unwrap(), vec![10, 20, 255]);
    }

    #[test]
    fn test_out_of_range_byte() {
        assert!(matches!(parse_query("256"), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_words_and_strings() {
        assert_eq!(parse_query("ab").unwrap(), b"ab".to_vec());
        assert_eq!(parse_query("\"a b\" 0").unwrap(), vec![b'a', b' ', b'b', 0]);
        assert_eq!(parse_query("\"12\"").unwrap(), b"12".to_vec());
    }

    #[test]
    fn test_extra_spaces_are_ignored() {
        assert_eq!(parse_query("  1   2 ").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_invalid_queries() {
        assert!(matches!(parse_query(""), Err(Error::InvalidQuery(_))));
        assert!(matches!(parse_query("   "), Err(Error::InvalidQuery(_))));
        assert!(matches!(parse_query("\"open"), Err(Error::InvalidQuery(_))));
        assert!(matches!(parse_query("\"\""), Err(Error::InvalidQuery(_))));
    }
}
