//! Typed page property values and database property schemas.

use crate::types::RichTextItem;
use serde::{Deserialize, Serialize};

/// Date range value with optional end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: Option<String>,
}

impl DateRange {
    /// `"start"` or `"start - end"` as rendered into frontmatter.
    pub fn display(&self) -> String {
        match &self.end {
            Some(end) => format!("{} - {}", self.start, end),
            None => self.start.clone(),
        }
    }
}

/// Result of a formula property, tagged by the declared subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormulaResult {
    String(Option<String>),
    Number(Option<f64>),
    Boolean(bool),
    Date(Option<DateRange>),
}

/// Result of a rollup property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RollupResult {
    Number(Option<f64>),
    Date(Option<DateRange>),
    Array(Vec<PropertyValue>),
}

/// A page property value tagged with its type discriminator.
///
/// Unknown property types are carried as `Unknown` with the raw type
/// name so frontmatter can skip them without failing the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Title(Vec<RichTextItem>),
    RichText(Vec<RichTextItem>),
    Number(Option<f64>),
    Select(Option<String>),
    MultiSelect(Vec<String>),
    Status(Option<String>),
    Date(Option<DateRange>),
    Checkbox(bool),
    Url(Option<String>),
    Email(Option<String>),
    PhoneNumber(Option<String>),
    People(Vec<String>),
    Files(Vec<String>),
    Relation(Vec<String>),
    Formula(Option<FormulaResult>),
    Rollup(Option<RollupResult>),
    CreatedTime(String),
    LastEditedTime(String),
    CreatedBy(String),
    LastEditedBy(String),
    UniqueId {
        prefix: Option<String>,
        number: i64,
    },
    Unknown(String),
}

impl PropertyValue {
    /// Plain text of a title property, `None` for any other kind.
    pub fn as_title(&self) -> Option<String> {
        match self {
            Self::Title(items) => Some(crate::types::plain_text_of(items)),
            _ => None,
        }
    }
}

/// One named property in a database schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProperty {
    pub id: String,
    pub config: PropertyConfig,
}

/// Type-specific configuration of a database property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyConfig {
    Select { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    Status { groups: Vec<StatusGroup> },
    Relation { database_id: String },
    Formula { expression: String },
    /// Property types that carry no configuration worth projecting;
    /// holds the raw type name.
    Plain(String),
}

impl PropertyConfig {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Select { .. } => "select",
            Self::MultiSelect { .. } => "multi_select",
            Self::Status { .. } => "status",
            Self::Relation { .. } => "relation",
            Self::Formula { .. } => "formula",
            Self::Plain(name) => name,
        }
    }
}

/// A named group of status options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusGroup {
    pub name: String,
    pub options: Vec<String>,
}
