// src/backup/markdown.rs
//! Block tree to markdown conversion.
//!
//! Conversion is driven by the parent block list; nested children are
//! fetched lazily through a [`BlockSource`] only for blocks the API
//! flagged as having children. Without a source, nesting (and table
//! rows) degrade gracefully instead of failing.

use crate::error::AppError;
use crate::model::{Block, BlockCommon, Icon};
use crate::types::{render_rich_text, BlockId};

/// Provides the children of a block on demand.
///
/// The API client implements this; tests substitute an in-memory map.
pub trait BlockSource {
    fn children(&self, block_id: &BlockId) -> Result<Vec<Block>, AppError>;
}

/// Converts block lists to markdown text.
pub struct MarkdownConverter<'a> {
    source: Option<&'a dyn BlockSource>,
}

impl<'a> MarkdownConverter<'a> {
    /// Converter with nested-block access.
    pub fn new(source: &'a dyn BlockSource) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Converter without nested-block access; child content is
    /// silently dropped. Used by previews and tests.
    pub fn without_source() -> Self {
        Self { source: None }
    }

    /// Convert a list of sibling blocks at the given nesting depth.
    pub fn convert_blocks(&self, blocks: &[Block], depth: usize) -> Result<String, AppError> {
        let mut out = String::new();
        for block in blocks {
            out.push_str(&self.convert_block(block, depth)?);
        }
        Ok(out)
    }

    fn convert_block(&self, block: &Block, depth: usize) -> Result<String, AppError> {
        let indent = "  ".repeat(depth);

        let markdown = match block {
            Block::Paragraph(b) => {
                let text = render_rich_text(&b.rich_text);
                let mut result = if text.is_empty() {
                    "\n".to_string()
                } else {
                    format!("{}{}\n\n", indent, text)
                };
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result
            }
            // Markdown has no nested headings, so heading children are
            // dropped.
            Block::Heading1(b) => format!("# {}\n\n", render_rich_text(&b.rich_text)),
            Block::Heading2(b) => format!("## {}\n\n", render_rich_text(&b.rich_text)),
            Block::Heading3(b) => format!("### {}\n\n", render_rich_text(&b.rich_text)),
            Block::BulletedListItem(b) => {
                let mut result = format!("{}- {}\n", indent, render_rich_text(&b.rich_text));
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result
            }
            Block::NumberedListItem(b) => {
                // Renderers renumber "1." sequences, so ordinal state
                // is not tracked.
                let mut result = format!("{}1. {}\n", indent, render_rich_text(&b.rich_text));
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result
            }
            Block::ToDo(b) => {
                let checkbox = if b.checked { "[x]" } else { "[ ]" };
                let mut result = format!(
                    "{}- {} {}\n",
                    indent,
                    checkbox,
                    render_rich_text(&b.rich_text)
                );
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result
            }
            Block::Toggle(b) => {
                let mut result = format!(
                    "{indent}<details>\n{indent}<summary>{}</summary>\n\n",
                    render_rich_text(&b.rich_text),
                );
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result.push_str(&format!("{}</details>\n\n", indent));
                result
            }
            Block::Code(b) => {
                let plain = crate::types::plain_text_of(&b.rich_text);
                let mut result = format!("```{}\n{}\n```\n", b.language, plain);
                let caption = render_rich_text(&b.caption);
                if !caption.is_empty() {
                    result.push_str(&format!("*{}*\n", caption));
                }
                result.push('\n');
                result
            }
            Block::Quote(b) => {
                let text = render_rich_text(&b.rich_text);
                let quoted: Vec<String> =
                    text.split('\n').map(|line| format!("> {}", line)).collect();
                let mut result = format!("{}\n\n", quoted.join("\n"));
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result
            }
            Block::Callout(b) => {
                let emoji = match &b.icon {
                    Some(Icon::Emoji(e)) => e.as_str(),
                    _ => "",
                };
                let mut result = format!("> {} {}\n\n", emoji, render_rich_text(&b.rich_text));
                result.push_str(&self.children_markdown(&b.common, depth + 1)?);
                result
            }
            Block::Divider(_) => "---\n\n".to_string(),
            Block::Image(b) => {
                let caption = render_rich_text(&b.content.caption);
                let alt = if caption.is_empty() { "image" } else { &caption };
                format!("![{}]({})\n\n", alt, b.content.effective_url())
            }
            Block::Video(b) => {
                let caption = render_rich_text(&b.content.caption);
                let label = if caption.is_empty() { "Video" } else { &caption };
                format!("[{}]({})\n\n", label, b.content.effective_url())
            }
            Block::Audio(b) => {
                let caption = render_rich_text(&b.content.caption);
                let label = if caption.is_empty() { "Audio" } else { &caption };
                format!("[{}]({})\n\n", label, b.content.effective_url())
            }
            Block::File(b) => {
                let caption = render_rich_text(&b.content.caption);
                let label = if !caption.is_empty() {
                    caption
                } else {
                    b.content.name.clone().unwrap_or_else(|| "File".to_string())
                };
                format!("[{}]({})\n\n", label, b.content.effective_url())
            }
            Block::Pdf(b) => {
                let caption = render_rich_text(&b.content.caption);
                let label = if caption.is_empty() { "PDF" } else { &caption };
                format!("[{}]({})\n\n", label, b.content.effective_url())
            }
            Block::Bookmark(b) => {
                let caption = render_rich_text(&b.caption);
                let title = if caption.is_empty() { &b.url } else { &caption };
                format!("[{}]({})\n\n", title, b.url)
            }
            Block::Embed(b) => {
                let caption = render_rich_text(&b.caption);
                if caption.is_empty() {
                    format!("Embed: {}\n\n", b.url)
                } else {
                    format!("[{}]({})\n\n", caption, b.url)
                }
            }
            Block::Equation(b) => format!("$$\n{}\n$$\n\n", b.expression),
            Block::TableOfContents(_) => "[TOC]\n\n".to_string(),
            Block::ChildPage(b) => {
                let title = if b.title.is_empty() {
                    "Untitled"
                } else {
                    &b.title
                };
                format!("[{}](./pages/{}/index.md)\n\n", title, b.common.id)
            }
            Block::ChildDatabase(b) => {
                let title = if b.title.is_empty() {
                    "Untitled Database"
                } else {
                    &b.title
                };
                format!("[{}](./databases/{}/)\n\n", title, b.common.id)
            }
            Block::LinkToPage(b) => {
                format!("[Linked page](./pages/{}/index.md)\n\n", b.target_id)
            }
            Block::LinkPreview(b) => format!("[{}]({})\n\n", b.url, b.url),
            Block::Template(b) => {
                format!("*Template: {}*\n\n", render_rich_text(&b.rich_text))
            }
            Block::Table(b) => self.convert_table(&b.common)?,
            // Rows are rendered by their table parent.
            Block::TableRow(_) => String::new(),
            // Layout containers flatten into the surrounding flow.
            Block::ColumnList(b) => self.children_markdown(&b.common, depth)?,
            Block::Column(b) => self.children_markdown(&b.common, depth)?,
            Block::Synced(b) => self.children_markdown(&b.common, depth)?,
            Block::Breadcrumb(_) => String::new(),
            Block::Unsupported(b) => format!("[Unsupported block: {}]\n\n", b.block_type),
        };

        Ok(markdown)
    }

    fn children_markdown(&self, common: &BlockCommon, depth: usize) -> Result<String, AppError> {
        if !common.has_children {
            return Ok(String::new());
        }
        let Some(source) = self.source else {
            return Ok(String::new());
        };
        let children = source.children(&common.id)?;
        self.convert_blocks(&children, depth)
    }

    fn convert_table(&self, common: &BlockCommon) -> Result<String, AppError> {
        let Some(source) = self.source else {
            return Ok("[Table]\n\n".to_string());
        };

        let rows = source.children(&common.id)?;
        let mut lines: Vec<String> = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            let Block::TableRow(row) = row else {
                continue;
            };
            let cells: Vec<String> = row.cells.iter().map(|c| render_rich_text(c)).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                let separators = vec!["---"; row.cells.len()];
                lines.push(format!("| {} |", separators.join(" | ")));
            }
        }

        if lines.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}\n\n", lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::blocks::*;
    use crate::types::RichTextItem;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct MapSource(HashMap<String, Vec<Block>>);

    impl BlockSource for MapSource {
        fn children(&self, block_id: &BlockId) -> Result<Vec<Block>, AppError> {
            Ok(self.0.get(block_id.as_str()).cloned().unwrap_or_default())
        }
    }

    fn text(s: &str) -> Vec<RichTextItem> {
        vec![RichTextItem::plain_text(s)]
    }

    fn id(n: u8) -> BlockId {
        BlockId::parse(&format!("{:032x}", n)).unwrap()
    }

    fn paragraph(n: u8, s: &str) -> Block {
        Block::Paragraph(ParagraphBlock {
            common: BlockCommon::new(id(n)),
            rich_text: text(s),
        })
    }

    #[test]
    fn paragraph_and_heading() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![
            Block::Heading1(Heading1Block {
                common: BlockCommon::new(id(1)),
                rich_text: text("Title"),
            }),
            paragraph(2, "Body text."),
        ];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "# Title\n\nBody text.\n\n");
    }

    #[test]
    fn empty_paragraph_is_blank_line() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![Block::Paragraph(ParagraphBlock {
            common: BlockCommon::new(id(1)),
            rich_text: Vec::new(),
        })];
        assert_eq!(converter.convert_blocks(&blocks, 0).unwrap(), "\n");
    }

    #[test]
    fn nested_list_items_indent_two_spaces() {
        let parent_id = id(1);
        let mut children = HashMap::new();
        children.insert(
            parent_id.as_str().to_string(),
            vec![Block::BulletedListItem(BulletedListItemBlock {
                common: BlockCommon::new(id(2)),
                rich_text: text("child"),
            })],
        );
        let source = MapSource(children);

        let blocks = vec![Block::BulletedListItem(BulletedListItemBlock {
            common: BlockCommon::new(parent_id).with_children_flag(true),
            rich_text: text("parent"),
        })];
        let converter = MarkdownConverter::new(&source);
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "- parent\n  - child\n");
    }

    #[test]
    fn todo_checkbox_states() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![
            Block::ToDo(ToDoBlock {
                common: BlockCommon::new(id(1)),
                rich_text: text("done"),
                checked: true,
            }),
            Block::ToDo(ToDoBlock {
                common: BlockCommon::new(id(2)),
                rich_text: text("open"),
                checked: false,
            }),
        ];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "- [x] done\n- [ ] open\n");
    }

    #[test]
    fn toggle_renders_details_element() {
        let parent_id = id(1);
        let mut children = HashMap::new();
        children.insert(
            parent_id.as_str().to_string(),
            vec![paragraph(2, "hidden")],
        );
        let source = MapSource(children);

        let blocks = vec![Block::Toggle(ToggleBlock {
            common: BlockCommon::new(parent_id).with_children_flag(true),
            rich_text: text("Click me"),
        })];
        let converter = MarkdownConverter::new(&source);
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(
            md,
            "<details>\n<summary>Click me</summary>\n\n  hidden\n\n</details>\n\n"
        );
    }

    #[test]
    fn code_block_with_caption() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![Block::Code(CodeBlock {
            common: BlockCommon::new(id(1)),
            language: "rust".to_string(),
            rich_text: text("fn main() {}"),
            caption: text("entry point"),
        })];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "```rust\nfn main() {}\n```\n*entry point*\n\n");
    }

    #[test]
    fn multiline_quote_prefixes_every_line() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![Block::Quote(QuoteBlock {
            common: BlockCommon::new(id(1)),
            rich_text: text("first\nsecond"),
        })];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "> first\n> second\n\n");
    }

    #[test]
    fn callout_with_emoji_icon() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![Block::Callout(CalloutBlock {
            common: BlockCommon::new(id(1)),
            rich_text: text("Watch out"),
            icon: Some(Icon::Emoji("⚠️".to_string())),
        })];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "> ⚠️ Watch out\n\n");
    }

    #[test]
    fn image_prefers_local_path() {
        let converter = MarkdownConverter::without_source();
        let mut content = FileBlockContent::new(FileObject::File {
            url: "https://prod-files-secure.example.com/remote.png".to_string(),
            expiry_time: None,
        });
        content.local_path = Some("attachments/abcdef01_remote.png".to_string());
        let blocks = vec![Block::Image(ImageBlock {
            common: BlockCommon::new(id(1)),
            content,
        })];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "![image](attachments/abcdef01_remote.png)\n\n");
    }

    #[test]
    fn table_without_source_is_placeholder() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![Block::Table(TableBlock {
            common: BlockCommon::new(id(1)),
            table_width: 2,
            has_column_header: true,
            has_row_header: false,
        })];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "[Table]\n\n");
    }

    #[test]
    fn table_renders_rows_with_header_separator() {
        let table_id = id(1);
        let row = |n: u8, a: &str, b: &str| {
            Block::TableRow(TableRowBlock {
                common: BlockCommon::new(id(n)),
                cells: vec![text(a), text(b)],
            })
        };
        let mut children = HashMap::new();
        children.insert(
            table_id.as_str().to_string(),
            vec![row(2, "Name", "Value"), row(3, "x", "1")],
        );
        let source = MapSource(children);

        let blocks = vec![Block::Table(TableBlock {
            common: BlockCommon::new(table_id).with_children_flag(true),
            table_width: 2,
            has_column_header: true,
            has_row_header: false,
        })];
        let converter = MarkdownConverter::new(&source);
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "| Name | Value |\n| --- | --- |\n| x | 1 |\n\n");
    }

    #[test]
    fn columns_flatten_at_same_depth() {
        let list_id = id(1);
        let col_id = id(2);
        let mut children = HashMap::new();
        children.insert(
            list_id.as_str().to_string(),
            vec![Block::Column(ColumnBlock {
                common: BlockCommon::new(col_id.clone()).with_children_flag(true),
            })],
        );
        children.insert(col_id.as_str().to_string(), vec![paragraph(3, "inside")]);
        let source = MapSource(children);

        let blocks = vec![Block::ColumnList(ColumnListBlock {
            common: BlockCommon::new(list_id).with_children_flag(true),
        })];
        let converter = MarkdownConverter::new(&source);
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        // No indentation: layout containers do not add nesting.
        assert_eq!(md, "inside\n\n");
    }

    #[test]
    fn unsupported_block_is_marked() {
        let converter = MarkdownConverter::without_source();
        let blocks = vec![Block::Unsupported(UnsupportedBlock {
            common: BlockCommon::new(id(1)),
            block_type: "ai_block".to_string(),
        })];
        let md = converter.convert_blocks(&blocks, 0).unwrap();
        assert_eq!(md, "[Unsupported block: ai_block]\n\n");
    }
}
