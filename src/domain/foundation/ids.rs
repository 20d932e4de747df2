//! Strongly typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ValidationError;

/// Identifier of an account in the Account Store.
///
/// Accounts are created elsewhere in the product; this service only ever
/// refers to ids that already exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new AccountId, returning error if blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("account_id"));
        }
        if trimmed.len() != id.len() {
            return Ok(Self(trimmed.to_string()));
        }
        Ok(Self(id))
    }

    /// Parses an optional, possibly blank, correlation value.
    ///
    /// Provider payloads carry empty strings as often as they omit keys.
    pub fn parse_optional(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| Self::new(v).ok())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_accepts_non_empty_string() {
        let id = AccountId::new("acc_9").unwrap();
        assert_eq!(id.as_str(), "acc_9");
    }

    #[test]
    fn account_id_rejects_blank_string() {
        let result = AccountId::new("   ");
        match result {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "account_id"),
            _ => panic!("Expected EmptyField error"),
        }
    }

    #[test]
    fn account_id_trims_surrounding_whitespace() {
        let id = AccountId::new(" acc_1 ").unwrap();
        assert_eq!(id.as_str(), "acc_1");
    }

    #[test]
    fn parse_optional_skips_missing_and_blank_values() {
        assert!(AccountId::parse_optional(None).is_none());
        assert!(AccountId::parse_optional(Some("")).is_none());
        assert_eq!(
            AccountId::parse_optional(Some("acc_2")).unwrap().as_str(),
            "acc_2"
        );
    }

    #[test]
    fn account_id_serializes_transparently() {
        let id = AccountId::new("acc_3").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acc_3\"");
    }
}
