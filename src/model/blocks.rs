use super::common::BlockCommon;
use crate::types::RichTextItem;
use serde::{Deserialize, Serialize};

/// Paragraph block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParagraphBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Heading 1 block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading1Block {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Heading 2 block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading2Block {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Heading 3 block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading3Block {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Bulleted list item block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletedListItemBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Numbered list item block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberedListItemBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// To-do block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToDoBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
    pub checked: bool,
}

/// Toggle block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Quote block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Callout block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalloutBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
    pub icon: Option<Icon>,
}

/// Code block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub common: BlockCommon,
    pub language: String,
    pub rich_text: Vec<RichTextItem>,
    pub caption: Vec<RichTextItem>,
}

/// Equation block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationBlock {
    pub common: BlockCommon,
    pub expression: String,
}

/// Divider block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerBlock {
    pub common: BlockCommon,
}

/// Breadcrumb block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadcrumbBlock {
    pub common: BlockCommon,
}

/// Table of contents block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOfContentsBlock {
    pub common: BlockCommon,
}

/// Shared content for file-bearing blocks (image, video, audio, file, pdf).
///
/// `local_path` is empty as parsed from the API; the attachment stage
/// fills it in after a successful download, and rendering prefers it
/// over the remote URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBlockContent {
    pub source: FileObject,
    pub caption: Vec<RichTextItem>,
    /// File blocks carry a display name; other kinds leave this unset.
    pub name: Option<String>,
    pub local_path: Option<String>,
}

impl FileBlockContent {
    pub fn new(source: FileObject) -> Self {
        Self {
            source,
            caption: Vec::new(),
            name: None,
            local_path: None,
        }
    }

    /// Remote URL as the API reported it.
    pub fn remote_url(&self) -> &str {
        self.source.url()
    }

    /// URL to embed in markdown, local attachment path when present.
    pub fn effective_url(&self) -> &str {
        self.local_path.as_deref().unwrap_or_else(|| self.source.url())
    }
}

/// Image block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub common: BlockCommon,
    pub content: FileBlockContent,
}

/// Video block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoBlock {
    pub common: BlockCommon,
    pub content: FileBlockContent,
}

/// Audio block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBlock {
    pub common: BlockCommon,
    pub content: FileBlockContent,
}

/// File block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBlock {
    pub common: BlockCommon,
    pub content: FileBlockContent,
}

/// PDF block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfBlock {
    pub common: BlockCommon,
    pub content: FileBlockContent,
}

/// Bookmark block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkBlock {
    pub common: BlockCommon,
    pub url: String,
    pub caption: Vec<RichTextItem>,
}

/// Embed block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    pub common: BlockCommon,
    pub url: String,
    pub caption: Vec<RichTextItem>,
}

/// Child page block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildPageBlock {
    pub common: BlockCommon,
    pub title: String,
}

/// Child database block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDatabaseBlock {
    pub common: BlockCommon,
    pub title: String,
}

/// Link to page block. The target may be a page or a database; both
/// render the same way, so only the raw target ID is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkToPageBlock {
    pub common: BlockCommon,
    pub target_id: String,
}

/// Table block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub common: BlockCommon,
    pub table_width: usize,
    pub has_column_header: bool,
    pub has_row_header: bool,
}

/// Table row block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRowBlock {
    pub common: BlockCommon,
    pub cells: Vec<Vec<RichTextItem>>,
}

/// Column list block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnListBlock {
    pub common: BlockCommon,
}

/// Column block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBlock {
    pub common: BlockCommon,
}

/// Synced block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedBlock {
    pub common: BlockCommon,
    pub synced_from: Option<String>,
}

/// Template block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBlock {
    pub common: BlockCommon,
    pub rich_text: Vec<RichTextItem>,
}

/// Link preview block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPreviewBlock {
    pub common: BlockCommon,
    pub url: String,
}

/// Unsupported block, carries the unrecognized type tag verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsupportedBlock {
    pub common: BlockCommon,
    pub block_type: String,
}

/// File reference as the API reports it. Notion-hosted files carry a
/// time-limited URL that must be dereferenced during export; external
/// URLs are permanent and embedded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileObject {
    #[serde(rename = "external")]
    External { url: String },
    #[serde(rename = "file")]
    File {
        url: String,
        expiry_time: Option<String>,
    },
}

impl FileObject {
    pub fn url(&self) -> &str {
        match self {
            Self::External { url } => url,
            Self::File { url, .. } => url,
        }
    }
}

/// Icon types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Icon {
    Emoji(String),
    File(FileObject),
}
