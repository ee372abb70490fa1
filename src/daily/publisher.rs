// src/daily/publisher.rs
//! Publish rendered daily content to a Notion page.
//!
//! The markdown-to-block converter covers the elements templates
//! actually use: headings, lists, to-dos, quotes, fenced code,
//! dividers, paragraphs, plus inline links and code spans. Anything
//! fancier lands as a plain paragraph.

use crate::api::NotionClient;
use crate::config::Config;
use crate::error::AppError;
use crate::output::DailyResult;
use crate::types::BlockId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// Render the blocks and append them to the configured target page.
/// With `dry_run`, conversion happens but nothing is sent.
pub fn run_daily(config: &Config, content: &str, dry_run: bool) -> DailyResult {
    let page_id = config.daily.target_page_id.clone().unwrap_or_default();

    let mut result = DailyResult {
        success: false,
        page_id: page_id.clone(),
        blocks_added: 0,
        dry_run,
        error: None,
    };

    let blocks = markdown_to_blocks(content);
    if blocks.is_empty() {
        result.error = Some("No content to add".to_string());
        return result;
    }

    if dry_run {
        log::info!("Dry run: would append {} blocks to page {}", blocks.len(), short(&page_id));
        result.success = true;
        result.blocks_added = blocks.len();
        return result;
    }

    match publish(config, &page_id, &blocks) {
        Ok(()) => {
            result.success = true;
            result.blocks_added = blocks.len();
        }
        Err(err) => {
            log::error!("Failed to publish daily content: {}", err);
            result.error = Some(err.to_string());
        }
    }

    result
}

fn publish(config: &Config, page_id: &str, blocks: &[Value]) -> Result<(), AppError> {
    let target = BlockId::parse(page_id)?;
    let client = NotionClient::from_config(config)?;
    log::info!("Appending {} blocks to page {}", blocks.len(), target.short());
    client.append_block_children(&target, blocks)
}

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s+(.+)$").expect("numbered item pattern is valid"));

/// Convert markdown to Notion block payloads for the append endpoint.
pub fn markdown_to_blocks(content: &str) -> Vec<Value> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(rest) = line.strip_prefix("### ") {
            blocks.push(heading_block(rest, 3));
            i += 1;
            continue;
        }
        if let Some(rest) = line.strip_prefix("## ") {
            blocks.push(heading_block(rest, 2));
            i += 1;
            continue;
        }
        if let Some(rest) = line.strip_prefix("# ") {
            blocks.push(heading_block(rest, 1));
            i += 1;
            continue;
        }

        // To-dos before plain bullets; both start with "- ".
        if let Some(rest) = line.strip_prefix("- [ ] ") {
            blocks.push(todo_block(rest, false));
            i += 1;
            continue;
        }
        if let Some(rest) = line
            .strip_prefix("- [x] ")
            .or_else(|| line.strip_prefix("- [X] "))
        {
            blocks.push(todo_block(rest, true));
            i += 1;
            continue;
        }

        if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            blocks.push(simple_block("bulleted_list_item", rest));
            i += 1;
            continue;
        }

        if let Some(caps) = NUMBERED_ITEM.captures(line) {
            blocks.push(simple_block("numbered_list_item", &caps[1]));
            i += 1;
            continue;
        }

        // Consecutive quote lines merge into one block.
        if let Some(rest) = line.strip_prefix("> ") {
            let mut quote_lines = vec![rest];
            i += 1;
            while i < lines.len() {
                let Some(rest) = lines[i].strip_prefix("> ") else {
                    break;
                };
                quote_lines.push(rest);
                i += 1;
            }
            blocks.push(simple_block("quote", &quote_lines.join("\n")));
            continue;
        }

        if let Some(fence) = line.strip_prefix("```") {
            let language = fence.trim();
            let mut code_lines = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].starts_with("```") {
                code_lines.push(lines[i]);
                i += 1;
            }
            i += 1; // closing fence
            blocks.push(code_block(&code_lines.join("\n"), language));
            continue;
        }

        if matches!(line.trim(), "---" | "***" | "___") {
            blocks.push(json!({
                "object": "block",
                "type": "divider",
                "divider": {},
            }));
            i += 1;
            continue;
        }

        blocks.push(simple_block("paragraph", line));
        i += 1;
    }

    blocks
}

fn simple_block(block_type: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "type": block_type,
        block_type: { "rich_text": rich_text(text) },
    })
}

fn heading_block(text: &str, level: u8) -> Value {
    simple_block(&format!("heading_{}", level), text)
}

fn todo_block(text: &str, checked: bool) -> Value {
    json!({
        "object": "block",
        "type": "to_do",
        "to_do": {
            "rich_text": rich_text(text),
            "checked": checked,
        },
    })
}

fn code_block(code: &str, language: &str) -> Value {
    let language = match language.to_ascii_lowercase().as_str() {
        "js" => "javascript".to_string(),
        "ts" => "typescript".to_string(),
        "py" => "python".to_string(),
        "rb" => "ruby".to_string(),
        "sh" => "bash".to_string(),
        "" => "plain text".to_string(),
        other => other.to_string(),
    };
    json!({
        "object": "block",
        "type": "code",
        "code": {
            "rich_text": [{ "type": "text", "text": { "content": code } }],
            "language": language,
        },
    })
}

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is valid"));
static CODE_SPAN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("code span pattern is valid"));

/// Inline rich text: `[text](url)` links and `` `code` `` spans;
/// everything else stays plain.
fn rich_text(text: &str) -> Vec<Value> {
    let mut items = Vec::new();
    let mut last_end = 0;

    for caps in LINK_PATTERN.captures_iter(text) {
        let whole = caps.get(0).expect("match has group 0");
        if whole.start() > last_end {
            items.extend(format_segment(&text[last_end..whole.start()]));
        }
        items.push(json!({
            "type": "text",
            "text": {
                "content": &caps[1],
                "link": { "url": &caps[2] },
            },
        }));
        last_end = whole.end();
    }

    if last_end < text.len() {
        items.extend(format_segment(&text[last_end..]));
    }

    if items.is_empty() {
        items.push(plain_item(text));
    }
    items
}

fn format_segment(text: &str) -> Vec<Value> {
    let mut items = Vec::new();
    let mut last_end = 0;

    for caps in CODE_SPAN_PATTERN.captures_iter(text) {
        let whole = caps.get(0).expect("match has group 0");
        if whole.start() > last_end {
            items.push(plain_item(&text[last_end..whole.start()]));
        }
        items.push(json!({
            "type": "text",
            "text": { "content": &caps[1] },
            "annotations": { "code": true },
        }));
        last_end = whole.end();
    }

    if last_end < text.len() {
        items.push(plain_item(&text[last_end..]));
    }
    items
}

fn plain_item(text: &str) -> Value {
    json!({ "type": "text", "text": { "content": text } })
}

fn short(id: &str) -> &str {
    &id[..id.len().min(8)]
}
