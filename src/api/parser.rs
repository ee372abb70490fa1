// src/api/parser.rs
//! Manual JSON parsing of Notion API responses into the domain model.
//!
//! Block parsing is total: every recognized type maps to its typed
//! variant and anything else becomes `Block::Unsupported`, carrying
//! the raw type tag. Only structurally broken responses (missing id,
//! unparseable JSON) fail.

use super::client::ApiResponse;
use super::pagination::PageBatch;
use crate::error::{AppError, NotionErrorCode};
use crate::model::blocks::*;
use crate::model::{
    Block, BlockCommon, Database, DatabaseProperty, DateRange, FormulaResult, Page, Parent,
    PropertyConfig, PropertyValue, RollupResult, StatusGroup,
};
use crate::types::{Annotations, DatabaseId, Id, PageId, RichTextItem};
use indexmap::IndexMap;
use serde_json::Value;

/// Check the HTTP status and parse the body as JSON.
///
/// Non-2xx responses are converted into `AppError::NotionService`,
/// preserving the typed error code and any Retry-After hint.
pub fn into_json(response: ApiResponse) -> Result<Value, AppError> {
    if response.status.is_success() {
        serde_json::from_str(&response.body).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", response.url, e);
            AppError::MalformedResponse(format!("invalid JSON from {}: {}", response.url, e))
        })
    } else {
        let status = response.status.as_u16();
        let (code, message) = match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => {
                let code = body
                    .get("code")
                    .and_then(Value::as_str)
                    .map(NotionErrorCode::from_api_response)
                    .unwrap_or_else(|| NotionErrorCode::from_http_status(status));
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message")
                    .to_string();
                (code, message)
            }
            Err(_) => (
                NotionErrorCode::from_http_status(status),
                format!("HTTP {} from {}", status, response.url),
            ),
        };
        Err(AppError::NotionService {
            code,
            message,
            status,
            retry_after: response.retry_after,
        })
    }
}

/// Parse one page of a cursor-paginated response, mapping each entry
/// in `results` through `parse_item`.
pub fn parse_batch<T>(
    value: &Value,
    parse_item: impl Fn(&Value) -> Result<T, AppError>,
) -> Result<PageBatch<T>, AppError> {
    let results = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::MalformedResponse("missing 'results' array".to_string()))?
        .iter()
        .map(&parse_item)
        .collect::<Result<Vec<T>, AppError>>()?;

    Ok(PageBatch {
        results,
        next_cursor: opt_str(value, "next_cursor"),
        has_more: value.get("has_more").and_then(Value::as_bool).unwrap_or(false),
    })
}

pub fn parse_page(value: &Value) -> Result<Page, AppError> {
    let id = required_str(value, "id", "page")?;

    let mut properties = IndexMap::new();
    if let Some(props) = value.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            properties.insert(name.clone(), parse_property_value(prop));
        }
    }

    Ok(Page {
        id: PageId::parse(id)?,
        created_time: str_or_empty(value, "created_time"),
        last_edited_time: str_or_empty(value, "last_edited_time"),
        url: str_or_empty(value, "url"),
        parent: parse_parent(value.get("parent")),
        created_by: value
            .get("created_by")
            .and_then(|u| u.get("id"))
            .and_then(Value::as_str)
            .map(String::from),
        last_edited_by: value
            .get("last_edited_by")
            .and_then(|u| u.get("id"))
            .and_then(Value::as_str)
            .map(String::from),
        cover: value.get("cover").and_then(parse_file_object),
        icon: value.get("icon").and_then(parse_icon),
        properties,
    })
}

pub fn parse_database(value: &Value) -> Result<Database, AppError> {
    let id = required_str(value, "id", "database")?;

    let mut properties = IndexMap::new();
    if let Some(props) = value.get("properties").and_then(Value::as_object) {
        for (name, prop) in props {
            properties.insert(name.clone(), parse_database_property(prop));
        }
    }

    Ok(Database {
        id: DatabaseId::parse(id)?,
        title: parse_rich_text(value.get("title")),
        created_time: str_or_empty(value, "created_time"),
        last_edited_time: str_or_empty(value, "last_edited_time"),
        url: str_or_empty(value, "url"),
        is_inline: value.get("is_inline").and_then(Value::as_bool).unwrap_or(false),
        properties,
    })
}

pub fn parse_block(value: &Value) -> Result<Block, AppError> {
    let id = required_str(value, "id", "block")?;
    let common = BlockCommon {
        id: Id::from_normalized(id.to_string()),
        has_children: value
            .get("has_children")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        archived: value.get("archived").and_then(Value::as_bool).unwrap_or(false),
    };

    let block_type = value.get("type").and_then(Value::as_str).unwrap_or("unsupported");
    // Payload lives under a key named after the type.
    let payload = value.get(block_type).cloned().unwrap_or(Value::Null);
    let rich_text = || parse_rich_text(payload.get("rich_text"));
    let caption = || parse_rich_text(payload.get("caption"));

    let block = match block_type {
        "paragraph" => Block::Paragraph(ParagraphBlock {
            common,
            rich_text: rich_text(),
        }),
        "heading_1" => Block::Heading1(Heading1Block {
            common,
            rich_text: rich_text(),
        }),
        "heading_2" => Block::Heading2(Heading2Block {
            common,
            rich_text: rich_text(),
        }),
        "heading_3" => Block::Heading3(Heading3Block {
            common,
            rich_text: rich_text(),
        }),
        "bulleted_list_item" => Block::BulletedListItem(BulletedListItemBlock {
            common,
            rich_text: rich_text(),
        }),
        "numbered_list_item" => Block::NumberedListItem(NumberedListItemBlock {
            common,
            rich_text: rich_text(),
        }),
        "to_do" => Block::ToDo(ToDoBlock {
            common,
            rich_text: rich_text(),
            checked: payload.get("checked").and_then(Value::as_bool).unwrap_or(false),
        }),
        "toggle" => Block::Toggle(ToggleBlock {
            common,
            rich_text: rich_text(),
        }),
        "quote" => Block::Quote(QuoteBlock {
            common,
            rich_text: rich_text(),
        }),
        "callout" => Block::Callout(CalloutBlock {
            common,
            rich_text: rich_text(),
            icon: payload.get("icon").and_then(parse_icon),
        }),
        "code" => Block::Code(CodeBlock {
            common,
            language: str_or_empty(&payload, "language"),
            rich_text: rich_text(),
            caption: caption(),
        }),
        "equation" => Block::Equation(EquationBlock {
            common,
            expression: str_or_empty(&payload, "expression"),
        }),
        "divider" => Block::Divider(DividerBlock { common }),
        "breadcrumb" => Block::Breadcrumb(BreadcrumbBlock { common }),
        "table_of_contents" => Block::TableOfContents(TableOfContentsBlock { common }),
        "image" => Block::Image(ImageBlock {
            common,
            content: parse_file_content(&payload),
        }),
        "video" => Block::Video(VideoBlock {
            common,
            content: parse_file_content(&payload),
        }),
        "audio" => Block::Audio(AudioBlock {
            common,
            content: parse_file_content(&payload),
        }),
        "file" => Block::File(FileBlock {
            common,
            content: parse_file_content(&payload),
        }),
        "pdf" => Block::Pdf(PdfBlock {
            common,
            content: parse_file_content(&payload),
        }),
        "bookmark" => Block::Bookmark(BookmarkBlock {
            common,
            url: str_or_empty(&payload, "url"),
            caption: caption(),
        }),
        "embed" => Block::Embed(EmbedBlock {
            common,
            url: str_or_empty(&payload, "url"),
            caption: caption(),
        }),
        "child_page" => Block::ChildPage(ChildPageBlock {
            common,
            title: str_or_empty(&payload, "title"),
        }),
        "child_database" => Block::ChildDatabase(ChildDatabaseBlock {
            common,
            title: str_or_empty(&payload, "title"),
        }),
        "link_to_page" => {
            // Target key is named after the link type (page_id or
            // database_id).
            let link_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
            let target_id = payload
                .get(link_type)
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            Block::LinkToPage(LinkToPageBlock { common, target_id })
        }
        "table" => Block::Table(TableBlock {
            common,
            table_width: payload
                .get("table_width")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
            has_column_header: payload
                .get("has_column_header")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            has_row_header: payload
                .get("has_row_header")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }),
        "table_row" => {
            let cells = payload
                .get("cells")
                .and_then(Value::as_array)
                .map(|cells| cells.iter().map(|cell| parse_rich_text(Some(cell))).collect())
                .unwrap_or_default();
            Block::TableRow(TableRowBlock { common, cells })
        }
        "column_list" => Block::ColumnList(ColumnListBlock { common }),
        "column" => Block::Column(ColumnBlock { common }),
        "synced_block" => Block::Synced(SyncedBlock {
            common,
            synced_from: payload
                .get("synced_from")
                .and_then(|s| s.get("block_id"))
                .and_then(Value::as_str)
                .map(String::from),
        }),
        "template" => Block::Template(TemplateBlock {
            common,
            rich_text: rich_text(),
        }),
        "link_preview" => Block::LinkPreview(LinkPreviewBlock {
            common,
            url: str_or_empty(&payload, "url"),
        }),
        other => Block::Unsupported(UnsupportedBlock {
            common,
            block_type: other.to_string(),
        }),
    };

    Ok(block)
}

/// Parse a rich text array; anything missing or malformed degrades to
/// an empty list rather than failing the block.
pub fn parse_rich_text(value: Option<&Value>) -> Vec<RichTextItem> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| RichTextItem {
            plain_text: str_or_empty(item, "plain_text"),
            href: opt_str(item, "href"),
            annotations: parse_annotations(item.get("annotations")),
        })
        .collect()
}

fn parse_annotations(value: Option<&Value>) -> Annotations {
    let Some(value) = value else {
        return Annotations::default();
    };
    let flag = |name: &str| value.get(name).and_then(Value::as_bool).unwrap_or(false);
    Annotations {
        bold: flag("bold"),
        italic: flag("italic"),
        strikethrough: flag("strikethrough"),
        underline: flag("underline"),
        code: flag("code"),
        color: value
            .get("color")
            .and_then(Value::as_str)
            .unwrap_or("default")
            .to_string(),
    }
}

fn parse_file_content(payload: &Value) -> FileBlockContent {
    FileBlockContent {
        source: parse_file_object(payload).unwrap_or(FileObject::External { url: String::new() }),
        caption: parse_rich_text(payload.get("caption")),
        name: opt_str(payload, "name"),
        local_path: None,
    }
}

fn parse_file_object(value: &Value) -> Option<FileObject> {
    match value.get("type").and_then(Value::as_str) {
        Some("file") => Some(FileObject::File {
            url: value
                .get("file")
                .map(|f| str_or_empty(f, "url"))
                .unwrap_or_default(),
            expiry_time: value.get("file").and_then(|f| opt_str(f, "expiry_time")),
        }),
        Some("external") => Some(FileObject::External {
            url: value
                .get("external")
                .map(|f| str_or_empty(f, "url"))
                .unwrap_or_default(),
        }),
        _ => None,
    }
}

fn parse_icon(value: &Value) -> Option<Icon> {
    match value.get("type").and_then(Value::as_str) {
        Some("emoji") => Some(Icon::Emoji(str_or_empty(value, "emoji"))),
        Some("file") | Some("external") => parse_file_object(value).map(Icon::File),
        _ => None,
    }
}

fn parse_parent(value: Option<&Value>) -> Parent {
    let Some(value) = value else {
        return Parent::Workspace;
    };
    match value.get("type").and_then(Value::as_str) {
        Some("page_id") => Parent::Page(str_or_empty(value, "page_id")),
        Some("database_id") => Parent::Database(str_or_empty(value, "database_id")),
        Some("block_id") => Parent::Block(str_or_empty(value, "block_id")),
        _ => Parent::Workspace,
    }
}

fn parse_property_value(prop: &Value) -> PropertyValue {
    let prop_type = prop.get("type").and_then(Value::as_str).unwrap_or("");
    let payload = prop.get(prop_type);

    match prop_type {
        "title" => PropertyValue::Title(parse_rich_text(payload)),
        "rich_text" => PropertyValue::RichText(parse_rich_text(payload)),
        "number" => PropertyValue::Number(payload.and_then(Value::as_f64)),
        "select" => PropertyValue::Select(option_name(payload)),
        "multi_select" => PropertyValue::MultiSelect(option_names(payload)),
        "status" => PropertyValue::Status(option_name(payload)),
        "date" => PropertyValue::Date(payload.and_then(parse_date_range)),
        "checkbox" => PropertyValue::Checkbox(
            payload.and_then(Value::as_bool).unwrap_or(false),
        ),
        "url" => PropertyValue::Url(payload.and_then(Value::as_str).map(String::from)),
        "email" => PropertyValue::Email(payload.and_then(Value::as_str).map(String::from)),
        "phone_number" => {
            PropertyValue::PhoneNumber(payload.and_then(Value::as_str).map(String::from))
        }
        "people" => PropertyValue::People(
            payload
                .and_then(Value::as_array)
                .map(|people| people.iter().map(user_name_or_id).collect())
                .unwrap_or_default(),
        ),
        "files" => PropertyValue::Files(
            payload
                .and_then(Value::as_array)
                .map(|files| {
                    files
                        .iter()
                        .map(|f| {
                            parse_file_object(f)
                                .map(|o| o.url().to_string())
                                .unwrap_or_default()
                        })
                        .collect()
                })
                .unwrap_or_default(),
        ),
        "relation" => PropertyValue::Relation(
            payload
                .and_then(Value::as_array)
                .map(|rels| rels.iter().map(|r| str_or_empty(r, "id")).collect())
                .unwrap_or_default(),
        ),
        "formula" => PropertyValue::Formula(payload.and_then(parse_formula)),
        "rollup" => PropertyValue::Rollup(payload.and_then(parse_rollup)),
        "created_time" => {
            PropertyValue::CreatedTime(payload.and_then(Value::as_str).unwrap_or("").to_string())
        }
        "last_edited_time" => PropertyValue::LastEditedTime(
            payload.and_then(Value::as_str).unwrap_or("").to_string(),
        ),
        "created_by" => {
            PropertyValue::CreatedBy(payload.map(user_name_or_id).unwrap_or_default())
        }
        "last_edited_by" => {
            PropertyValue::LastEditedBy(payload.map(user_name_or_id).unwrap_or_default())
        }
        "unique_id" => PropertyValue::UniqueId {
            prefix: payload.and_then(|p| opt_str(p, "prefix")),
            number: payload
                .and_then(|p| p.get("number"))
                .and_then(Value::as_i64)
                .unwrap_or(0),
        },
        other => PropertyValue::Unknown(other.to_string()),
    }
}

fn parse_formula(payload: &Value) -> Option<FormulaResult> {
    let formula_type = payload.get("type").and_then(Value::as_str)?;
    let inner = payload.get(formula_type);
    match formula_type {
        "string" => Some(FormulaResult::String(
            inner.and_then(Value::as_str).map(String::from),
        )),
        "number" => Some(FormulaResult::Number(inner.and_then(Value::as_f64))),
        "boolean" => Some(FormulaResult::Boolean(
            inner.and_then(Value::as_bool).unwrap_or(false),
        )),
        "date" => Some(FormulaResult::Date(inner.and_then(parse_date_range))),
        _ => None,
    }
}

fn parse_rollup(payload: &Value) -> Option<RollupResult> {
    let rollup_type = payload.get("type").and_then(Value::as_str)?;
    let inner = payload.get(rollup_type);
    match rollup_type {
        "number" => Some(RollupResult::Number(inner.and_then(Value::as_f64))),
        "date" => Some(RollupResult::Date(inner.and_then(parse_date_range))),
        "array" => Some(RollupResult::Array(
            inner
                .and_then(Value::as_array)
                .map(|items| items.iter().map(parse_property_value).collect())
                .unwrap_or_default(),
        )),
        _ => None,
    }
}

fn parse_date_range(value: &Value) -> Option<DateRange> {
    if value.is_null() {
        return None;
    }
    Some(DateRange {
        start: str_or_empty(value, "start"),
        end: opt_str(value, "end"),
    })
}

fn parse_database_property(prop: &Value) -> DatabaseProperty {
    let prop_type = prop.get("type").and_then(Value::as_str).unwrap_or("");
    let payload = prop.get(prop_type);

    let config = match prop_type {
        "select" => PropertyConfig::Select {
            options: schema_option_names(payload),
        },
        "multi_select" => PropertyConfig::MultiSelect {
            options: schema_option_names(payload),
        },
        "status" => PropertyConfig::Status {
            groups: payload
                .and_then(|p| p.get("groups"))
                .and_then(Value::as_array)
                .map(|groups| {
                    groups
                        .iter()
                        .map(|g| StatusGroup {
                            name: str_or_empty(g, "name"),
                            options: g
                                .get("option_ids")
                                .and_then(Value::as_array)
                                .map(|ids| {
                                    ids.iter()
                                        .filter_map(Value::as_str)
                                        .map(String::from)
                                        .collect()
                                })
                                .unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        "relation" => PropertyConfig::Relation {
            database_id: payload.map(|p| str_or_empty(p, "database_id")).unwrap_or_default(),
        },
        "formula" => PropertyConfig::Formula {
            expression: payload.map(|p| str_or_empty(p, "expression")).unwrap_or_default(),
        },
        other => PropertyConfig::Plain(other.to_string()),
    };

    DatabaseProperty {
        id: str_or_empty(prop, "id"),
        config,
    }
}

fn schema_option_names(payload: Option<&Value>) -> Vec<String> {
    payload
        .and_then(|p| p.get("options"))
        .and_then(Value::as_array)
        .map(|opts| opts.iter().map(|o| str_or_empty(o, "name")).collect())
        .unwrap_or_default()
}

fn option_name(payload: Option<&Value>) -> Option<String> {
    payload
        .filter(|p| !p.is_null())
        .map(|p| str_or_empty(p, "name"))
}

fn option_names(payload: Option<&Value>) -> Vec<String> {
    payload
        .and_then(Value::as_array)
        .map(|opts| opts.iter().map(|o| str_or_empty(o, "name")).collect())
        .unwrap_or_default()
}

fn user_name_or_id(user: &Value) -> String {
    user.get("name")
        .and_then(Value::as_str)
        .or_else(|| user.get("id").and_then(Value::as_str))
        .unwrap_or("")
        .to_string()
}

fn required_str<'a>(value: &'a Value, field: &str, kind: &str) -> Result<&'a str, AppError> {
    value.get(field).and_then(Value::as_str).ok_or_else(|| {
        AppError::MalformedResponse(format!("{} object missing '{}' field", kind, field))
    })
}

fn str_or_empty(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn opt_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_block_type_becomes_unsupported() {
        let raw = json!({
            "id": "11111111-2222-3333-4444-555555555555",
            "type": "ai_block",
            "has_children": false,
            "ai_block": {}
        });
        let block = parse_block(&raw).unwrap();
        assert_eq!(block.block_type(), "ai_block");
        assert!(matches!(block, Block::Unsupported(_)));
    }

    #[test]
    fn parses_todo_with_annotations() {
        let raw = json!({
            "id": "11111111-2222-3333-4444-555555555555",
            "type": "to_do",
            "has_children": false,
            "to_do": {
                "rich_text": [{
                    "plain_text": "ship it",
                    "href": null,
                    "annotations": {"bold": true, "italic": false, "strikethrough": false,
                                     "underline": false, "code": false, "color": "default"}
                }],
                "checked": true
            }
        });
        let block = parse_block(&raw).unwrap();
        let Block::ToDo(todo) = block else {
            panic!("expected to_do");
        };
        assert!(todo.checked);
        assert!(todo.rich_text[0].annotations.bold);
        assert_eq!(todo.rich_text[0].plain_text, "ship it");
    }

    #[test]
    fn parses_page_with_unique_id_property() {
        let raw = json!({
            "id": "11111111-2222-3333-4444-555555555555",
            "created_time": "2025-01-01T00:00:00.000Z",
            "last_edited_time": "2025-01-02T00:00:00.000Z",
            "url": "https://www.notion.so/x",
            "parent": {"type": "database_id", "database_id": "db-1"},
            "properties": {
                "Name": {"type": "title", "title": [{"plain_text": "Task"}]},
                "Ticket": {"type": "unique_id", "unique_id": {"prefix": "OPS", "number": 42}}
            }
        });
        let page = parse_page(&raw).unwrap();
        assert_eq!(page.title(), "Task");
        assert_eq!(page.parent.type_name(), "database_id");
        assert!(matches!(
            page.properties.get("Ticket"),
            Some(PropertyValue::UniqueId { prefix: Some(p), number: 42 }) if p == "OPS"
        ));
    }

    #[test]
    fn error_response_maps_to_typed_code() {
        let response = ApiResponse {
            body: r#"{"object":"error","status":404,"code":"object_not_found","message":"nope"}"#
                .to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
            url: "https://api.notion.com/v1/pages/x".to_string(),
            retry_after: None,
        };
        let err = into_json(response).unwrap_err();
        match err {
            AppError::NotionService { code, status, .. } => {
                assert!(code.is_not_found());
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn batch_carries_cursor_contract() {
        let raw = json!({
            "results": [],
            "next_cursor": "abc",
            "has_more": true
        });
        let batch = parse_batch(&raw, parse_block).unwrap();
        assert!(batch.results.is_empty());
        assert_eq!(batch.next_cursor.as_deref(), Some("abc"));
        assert!(batch.has_more);
    }
}
