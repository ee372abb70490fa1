// src/model/mod.rs
//! Domain model for pages, databases, and blocks.

mod block;
pub mod blocks;
mod common;
mod properties;

pub use block::Block;
pub use blocks::{FileBlockContent, FileObject, Icon};
pub use common::BlockCommon;
pub use properties::{
    DatabaseProperty, DateRange, FormulaResult, PropertyConfig, PropertyValue, RollupResult,
    StatusGroup,
};

use crate::constants::UNTITLED;
use crate::types::{plain_text_of, DatabaseId, PageId, RichTextItem};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Parent reference of a page or database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parent {
    Workspace,
    Page(String),
    Database(String),
    Block(String),
}

impl Parent {
    /// Type tag as the API spells it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Page(_) => "page_id",
            Self::Database(_) => "database_id",
            Self::Block(_) => "block_id",
        }
    }

    /// Parent ID for page and database parents; workspace and block
    /// parents project to none in frontmatter.
    pub fn frontmatter_id(&self) -> Option<&str> {
        match self {
            Self::Page(id) | Self::Database(id) => Some(id),
            _ => None,
        }
    }
}

/// A Notion page with its metadata and typed property map.
///
/// Property order is preserved as the API returned it so frontmatter
/// stays human-diffable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub created_time: String,
    pub last_edited_time: String,
    pub url: String,
    pub parent: Parent,
    pub created_by: Option<String>,
    pub last_edited_by: Option<String>,
    pub cover: Option<FileObject>,
    pub icon: Option<Icon>,
    pub properties: IndexMap<String, PropertyValue>,
}

impl Page {
    /// Title projected from the title-typed property, or the
    /// "Untitled" sentinel when absent or empty.
    pub fn title(&self) -> String {
        self.properties
            .values()
            .find_map(PropertyValue::as_title)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string())
    }
}

/// A Notion database with its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: DatabaseId,
    pub title: Vec<RichTextItem>,
    pub created_time: String,
    pub last_edited_time: String,
    pub url: String,
    pub is_inline: bool,
    pub properties: IndexMap<String, DatabaseProperty>,
}

impl Database {
    /// Raw title text, possibly empty.
    pub fn title_text(&self) -> String {
        plain_text_of(&self.title)
    }

    /// Title for log lines, with the "Untitled" sentinel.
    pub fn display_title(&self) -> String {
        let title = self.title_text();
        if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        }
    }
}
