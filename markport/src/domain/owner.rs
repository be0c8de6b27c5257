// src/domain/owner.rs
use crate::domain::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the repository owner. Every job, bookmark and tag is scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Owner(String);

impl Owner {
    pub fn new<S: AsRef<str>>(value: S) -> DomainResult<Self> {
        let value = value.as_ref().trim();

        if value.is_empty() {
            return Err(DomainError::InvalidOwner(
                "Owner identifier cannot be empty".to_string(),
            ));
        }

        if value.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidOwner(format!(
                "Owner identifier cannot contain whitespace: '{}'",
                value
            )));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Owner {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Owner::new(value)
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        owner.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
