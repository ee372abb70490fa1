// src/types/rich_text.rs
//! Rich text primitives shared by blocks and page properties.

use serde::{Deserialize, Serialize};

/// A single rich text span as the Notion API reports it.
///
/// `plain_text` already has mentions and equations resolved to their
/// textual form, so rendering never needs the raw variant payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextItem {
    pub plain_text: String,
    pub href: Option<String>,
    pub annotations: Annotations,
}

impl RichTextItem {
    /// Create an unstyled text span.
    ///
    /// The common case in builders and tests; saves spelling out a
    /// default annotation set every time.
    pub fn plain_text(text: &str) -> Self {
        Self {
            plain_text: text.to_string(),
            href: None,
            annotations: Annotations::default(),
        }
    }

    /// Create a text span with explicit annotations.
    pub fn styled(text: &str, annotations: Annotations) -> Self {
        Self {
            plain_text: text.to_string(),
            href: None,
            annotations,
        }
    }

    /// Create a linked text span.
    pub fn linked(text: &str, href: &str) -> Self {
        Self {
            plain_text: text.to_string(),
            href: Some(href.to_string()),
            annotations: Annotations::default(),
        }
    }
}

/// Text styling flags for a rich text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

/// Render rich text spans to inline markdown.
///
/// Wrap order is fixed: code innermost, then bold, italic,
/// strikethrough, and the link outermost. Underline has no markdown
/// form and passes through unchanged.
pub fn render_rich_text(items: &[RichTextItem]) -> String {
    items.iter().map(render_span).collect()
}

/// Concatenate the plain text of the spans with no styling.
pub fn plain_text_of(items: &[RichTextItem]) -> String {
    items.iter().map(|item| item.plain_text.as_str()).collect()
}

fn render_span(item: &RichTextItem) -> String {
    let mut text = item.plain_text.clone();
    let a = &item.annotations;

    if a.code {
        text = format!("`{}`", text);
    }
    if a.bold {
        text = format!("**{}**", text);
    }
    if a.italic {
        text = format!("*{}*", text);
    }
    if a.strikethrough {
        text = format!("~~{}~~", text);
    }
    if let Some(href) = &item.href {
        text = format!("[{}]({})", text, href);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_span_passes_through() {
        let items = vec![RichTextItem::plain_text("hello")];
        assert_eq!(render_rich_text(&items), "hello");
    }

    #[test]
    fn code_wraps_inside_bold() {
        let items = vec![RichTextItem::styled(
            "x",
            Annotations {
                code: true,
                bold: true,
                ..Default::default()
            },
        )];
        assert_eq!(render_rich_text(&items), "**`x`**");
    }

    #[test]
    fn link_wraps_outermost() {
        let mut item = RichTextItem::linked("docs", "https://example.com");
        item.annotations.bold = true;
        assert_eq!(render_rich_text(&[item]), "[**docs**](https://example.com)");
    }

    #[test]
    fn all_flags_nest_in_order() {
        let mut item = RichTextItem::styled(
            "t",
            Annotations {
                bold: true,
                italic: true,
                strikethrough: true,
                code: true,
                ..Default::default()
            },
        );
        item.href = Some("u".to_string());
        assert_eq!(render_rich_text(&[item]), "[~~***`t`***~~](u)");
    }

    #[test]
    fn underline_has_no_markdown_form() {
        let items = vec![RichTextItem::styled(
            "u",
            Annotations {
                underline: true,
                ..Default::default()
            },
        )];
        assert_eq!(render_rich_text(&items), "u");
    }

    #[test]
    fn spans_concatenate() {
        let items = vec![
            RichTextItem::plain_text("a "),
            RichTextItem::styled(
                "b",
                Annotations {
                    bold: true,
                    ..Default::default()
                },
            ),
        ];
        assert_eq!(render_rich_text(&items), "a **b**");
        assert_eq!(plain_text_of(&items), "a b");
    }
}
