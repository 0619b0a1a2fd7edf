use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const TAG_PREFIX: char = '@';

/// A validated catalog tag such as `@indexes`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Tag carried by every composite index entry.
    pub const INDEXES: &'static str = "@indexes";
    /// Tag carried by every constituent instrument entry.
    pub const PRODUCTS: &'static str = "@products";
    /// Meta-tag whose entries are the tags themselves.
    pub const TAGS: &'static str = "@tags";

    /// Parse a tag, trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTag);
        }
        if !trimmed.starts_with(TAG_PREFIX) || trimmed.len() == TAG_PREFIX.len_utf8() {
            return Err(ValidationError::TagMissingPrefix {
                value: trimmed.to_owned(),
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::TagContainsWhitespace {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn indexes() -> Self {
        Self(String::from(Self::INDEXES))
    }

    pub fn products() -> Self {
        Self(String::from(Self::PRODUCTS))
    }

    pub fn tags() -> Self {
        Self(String::from(Self::TAGS))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag name without the leading `@`, as shown in catalog listings.
    pub fn label(&self) -> &str {
        &self.0[TAG_PREFIX.len_utf8()..]
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Tag {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Tag {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Tag> for String {
    fn from(value: Tag) -> Self {
        value.0
    }
}
