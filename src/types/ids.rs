use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Strong typing for IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseMarker;

/// Type aliases for specific ID types
pub type PageId = Id<PageMarker>;
pub type BlockId = Id<BlockMarker>;
pub type DatabaseId = Id<DatabaseMarker>;

impl<T> Id<T> {
    /// Parse a Notion ID (32 hex chars, with or without dashes).
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let normalized = normalize_notion_id(input)?;
        Ok(Self {
            value: normalized,
            _phantom: PhantomData,
        })
    }

    /// Create an ID from an already normalized string (internal use)
    pub(crate) fn from_normalized(value: String) -> Self {
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    /// Create a new random v4 UUID ID
    pub fn new_v4() -> Self {
        let uuid = Uuid::new_v4();
        Self {
            value: uuid.as_hyphenated().to_string(),
            _phantom: PhantomData,
        }
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// First eight characters, used in log lines and attachment names.
    pub fn short(&self) -> &str {
        let end = self.value.len().min(8);
        &self.value[..end]
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_normalized(value))
    }
}

/// Validate a Notion ID, preserving the dashed form the API returned.
fn normalize_notion_id(input: &str) -> Result<String, AppError> {
    let input = input.trim();
    let stripped: String = input.chars().filter(|c| *c != '-').collect();

    if stripped.len() == 32 && stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(input.to_string())
    } else {
        Err(AppError::InvalidId(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dashed_and_plain_ids() {
        let dashed = PageId::parse("12345678-1234-1234-1234-123456789abc").unwrap();
        assert_eq!(dashed.short(), "12345678");

        let plain = PageId::parse("123456781234123412341234567890ab").unwrap();
        assert_eq!(plain.as_str(), "123456781234123412341234567890ab");
    }

    #[test]
    fn rejects_garbage() {
        assert!(PageId::parse("not-an-id").is_err());
        assert!(PageId::parse("").is_err());
    }
}
