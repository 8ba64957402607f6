//! Token coercion.

use thiserror::Error;

use super::record::FieldValue;
use crate::schema::Coercion;

/// Tokens read as `true`, compared case-insensitively.
///
/// The Vigor 130 prints feature flags as `1`/`0`, and its flags are all
/// near/far pairs whose pattern only captures digits. The word forms are
/// reachable only through a simple boolean field in a custom schema.
pub const BOOLEAN_TRUE_TOKENS: &[&str] = &["1", "on", "enable", "enabled", "true", "yes"];
/// Tokens read as `false`, compared case-insensitively.
pub const BOOLEAN_FALSE_TOKENS: &[&str] = &["0", "off", "disable", "disabled", "false", "no"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    #[error("{token:?} is not a base-10 integer")]
    NotInteger { token: String },
    #[error("{token:?} is not a known boolean token")]
    NotBoolean { token: String },
}

impl Coercion {
    /// Convert one captured token.
    pub fn apply(&self, token: &str) -> Result<FieldValue, CoercionError> {
        match self {
            Coercion::Identity => Ok(FieldValue::Text(token.to_string())),
            Coercion::Integer => token
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| CoercionError::NotInteger {
                    token: token.to_string(),
                }),
            Coercion::Boolean => parse_boolean(token).map(FieldValue::Boolean).ok_or_else(|| {
                CoercionError::NotBoolean {
                    token: token.to_string(),
                }
            }),
        }
    }
}

fn parse_boolean(token: &str) -> Option<bool> {
    if BOOLEAN_TRUE_TOKENS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(token))
    {
        Some(true)
    } else if BOOLEAN_FALSE_TOKENS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(token))
    {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() {
        assert_eq!(Coercion::Integer.apply("123456"), Ok(FieldValue::Integer(123456)));
        assert_eq!(
            Coercion::Integer.apply("17A"),
            Err(CoercionError::NotInteger { token: "17A".into() })
        );
    }

    #[test]
    fn test_boolean_vocabulary() {
        assert_eq!(Coercion::Boolean.apply("1"), Ok(FieldValue::Boolean(true)));
        assert_eq!(Coercion::Boolean.apply("0"), Ok(FieldValue::Boolean(false)));
        assert_eq!(Coercion::Boolean.apply("Enable"), Ok(FieldValue::Boolean(true)));
        assert!(Coercion::Boolean.apply("2").is_err());
    }

    #[test]
    fn test_identity_keeps_text() {
        assert_eq!(
            Coercion::Identity.apply("SHOWTIME"),
            Ok(FieldValue::Text("SHOWTIME".into()))
        );
    }
}
