//! Externally visible task codes.
//!
//! Codes use the `AA-00-xxxx` layout: two uppercase ASCII letters, a hyphen,
//! two ASCII digits, a hyphen, and four characters drawn from lowercase ASCII
//! letters and digits. Every code is exactly [`CODE_LENGTH`] bytes long.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Total length of a well-formed task code, separators included.
pub const CODE_LENGTH: usize = 10;

/// Separator between code groups.
pub const CODE_SEPARATOR: char = '-';

/// Unique, immutable task code assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskCode(String);

impl TaskCode {
    /// Parses a task code, rejecting any structural mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCode`] when the value has the wrong
    /// length, a character from the wrong class, or a misplaced separator.
    pub fn parse(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        if !Self::is_well_formed(&raw) {
            return Err(TaskDomainError::InvalidCode(raw));
        }
        Ok(Self(raw))
    }

    /// Returns `true` when `value` matches the `AA-00-xxxx` layout exactly.
    #[must_use]
    pub fn is_well_formed(value: &str) -> bool {
        value.len() == CODE_LENGTH
            && value
                .bytes()
                .enumerate()
                .all(|(position, byte)| match position {
                    0 | 1 => byte.is_ascii_uppercase(),
                    2 | 5 => char::from(byte) == CODE_SEPARATOR,
                    3 | 4 => byte.is_ascii_digit(),
                    _ => byte.is_ascii_digit() || byte.is_ascii_lowercase(),
                })
    }

    /// Wraps a code assembled by the generator.
    pub(crate) fn from_generated(value: String) -> Self {
        debug_assert!(Self::is_well_formed(&value), "generated code {value} is malformed");
        Self(value)
    }

    /// Returns the code as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskCode {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TaskCode> for String {
    fn from(code: TaskCode) -> Self {
        code.0
    }
}

impl AsRef<str> for TaskCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for TaskCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
