// src/backup/frontmatter.rs
//! YAML frontmatter for exported pages and YAML schemas for databases.
//!
//! Mappings are built explicitly so key order is stable: metadata
//! first, then parent, authorship, properties, and decoration. Stable
//! order keeps exported files diffable across runs.

use crate::error::AppError;
use crate::model::{
    Database, FileObject, FormulaResult, Icon, Page, PropertyConfig, PropertyValue, RollupResult,
};
use serde_yaml::{Mapping, Value};

/// Render the frontmatter block for a page, delimiters included.
pub fn generate_frontmatter(page: &Page) -> Result<String, AppError> {
    let mut data = Mapping::new();
    insert(&mut data, "notion_id", string(page.id.as_str()));
    insert(&mut data, "title", string(&page.title()));
    insert(&mut data, "created_time", string(&page.created_time));
    insert(&mut data, "last_edited_time", string(&page.last_edited_time));
    insert(&mut data, "url", string(&page.url));

    insert(&mut data, "parent_type", string(page.parent.type_name()));
    insert(
        &mut data,
        "parent_id",
        page.parent
            .frontmatter_id()
            .map(string)
            .unwrap_or(Value::Null),
    );

    if let Some(created_by) = &page.created_by {
        insert(&mut data, "created_by", string(created_by));
    }
    if let Some(last_edited_by) = &page.last_edited_by {
        insert(&mut data, "last_edited_by", string(last_edited_by));
    }

    let mut properties = Mapping::new();
    for (name, value) in &page.properties {
        if let Some(projected) = property_to_yaml(value) {
            properties.insert(Value::String(name.clone()), projected);
        }
    }
    if !properties.is_empty() {
        insert(&mut data, "properties", Value::Mapping(properties));
    }

    if let Some(cover) = &page.cover {
        insert(&mut data, "cover", string(cover.url()));
    }
    if let Some(icon) = &page.icon {
        let icon_value = match icon {
            Icon::Emoji(emoji) => string(emoji),
            Icon::File(file) => string(file.url()),
        };
        insert(&mut data, "icon", icon_value);
    }

    let yaml = serde_yaml::to_string(&Value::Mapping(data))?;
    Ok(format!("---\n{}---\n\n", yaml))
}

/// Render the YAML schema document for a database.
pub fn generate_database_schema(database: &Database) -> Result<String, AppError> {
    let mut data = Mapping::new();
    insert(&mut data, "notion_id", string(database.id.as_str()));
    insert(&mut data, "title", string(&database.title_text()));
    insert(&mut data, "created_time", string(&database.created_time));
    insert(
        &mut data,
        "last_edited_time",
        string(&database.last_edited_time),
    );
    insert(&mut data, "url", string(&database.url));
    insert(&mut data, "is_inline", Value::Bool(database.is_inline));

    let mut properties = Mapping::new();
    for (name, prop) in &database.properties {
        let mut entry = Mapping::new();
        insert(&mut entry, "type", string(prop.config.type_name()));
        insert(&mut entry, "id", string(&prop.id));

        match &prop.config {
            PropertyConfig::Select { options } | PropertyConfig::MultiSelect { options } => {
                insert(&mut entry, "options", string_seq(options));
            }
            PropertyConfig::Status { groups } => {
                let rendered: Vec<Value> = groups
                    .iter()
                    .map(|group| {
                        let mut g = Mapping::new();
                        insert(&mut g, "name", string(&group.name));
                        insert(&mut g, "options", string_seq(&group.options));
                        Value::Mapping(g)
                    })
                    .collect();
                insert(&mut entry, "groups", Value::Sequence(rendered));
            }
            PropertyConfig::Relation { database_id } => {
                insert(&mut entry, "database_id", string(database_id));
            }
            PropertyConfig::Formula { expression } => {
                insert(&mut entry, "expression", string(expression));
            }
            PropertyConfig::Plain(_) => {}
        }

        properties.insert(Value::String(name.clone()), Value::Mapping(entry));
    }
    insert(&mut data, "properties", Value::Mapping(properties));

    Ok(serde_yaml::to_string(&Value::Mapping(data))?)
}

/// Project a property value for frontmatter; `None` means the property
/// is omitted entirely.
fn property_to_yaml(value: &PropertyValue) -> Option<Value> {
    match value {
        PropertyValue::Title(items) | PropertyValue::RichText(items) => {
            Some(string(&crate::types::plain_text_of(items)))
        }
        PropertyValue::Number(n) => n.map(number),
        PropertyValue::Select(name) | PropertyValue::Status(name) => {
            name.as_deref().map(string)
        }
        PropertyValue::MultiSelect(names)
        | PropertyValue::People(names)
        | PropertyValue::Files(names)
        | PropertyValue::Relation(names) => Some(string_seq(names)),
        PropertyValue::Date(range) => range.as_ref().map(|r| string(&r.display())),
        PropertyValue::Checkbox(checked) => Some(Value::Bool(*checked)),
        PropertyValue::Url(v) | PropertyValue::Email(v) | PropertyValue::PhoneNumber(v) => {
            v.as_deref().map(string)
        }
        PropertyValue::Formula(result) => result.as_ref().and_then(formula_to_yaml),
        PropertyValue::Rollup(result) => result.as_ref().and_then(rollup_to_yaml),
        PropertyValue::CreatedTime(t) | PropertyValue::LastEditedTime(t) => Some(string(t)),
        PropertyValue::CreatedBy(who) | PropertyValue::LastEditedBy(who) => Some(string(who)),
        PropertyValue::UniqueId { prefix, number } => Some(match prefix {
            Some(prefix) => string(&format!("{}-{}", prefix, number)),
            None => string(&number.to_string()),
        }),
        PropertyValue::Unknown(_) => None,
    }
}

fn formula_to_yaml(result: &FormulaResult) -> Option<Value> {
    match result {
        FormulaResult::String(s) => s.as_deref().map(string),
        FormulaResult::Number(n) => n.map(number),
        FormulaResult::Boolean(b) => Some(Value::Bool(*b)),
        FormulaResult::Date(range) => range.as_ref().map(|r| string(&r.display())),
    }
}

fn rollup_to_yaml(result: &RollupResult) -> Option<Value> {
    match result {
        RollupResult::Number(n) => n.map(number),
        RollupResult::Date(range) => range.as_ref().map(|r| string(&r.display())),
        RollupResult::Array(items) => Some(Value::Sequence(
            items
                .iter()
                .map(|item| property_to_yaml(item).unwrap_or(Value::Null))
                .collect(),
        )),
    }
}

fn insert(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::String(key.to_string()), value);
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn number(n: f64) -> Value {
    Value::Number(serde_yaml::Number::from(n))
}

fn string_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| string(s)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DatabaseProperty, DateRange, Parent, StatusGroup};
    use crate::types::{DatabaseId, PageId, RichTextItem};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn sample_page() -> Page {
        let mut properties = IndexMap::new();
        properties.insert(
            "Name".to_string(),
            PropertyValue::Title(vec![RichTextItem::plain_text("Quarterly Plan")]),
        );
        properties.insert(
            "Tags".to_string(),
            PropertyValue::MultiSelect(vec!["ops".to_string(), "q3".to_string()]),
        );
        properties.insert("Done".to_string(), PropertyValue::Checkbox(false));
        properties.insert("Score".to_string(), PropertyValue::Number(None));
        properties.insert(
            "Ticket".to_string(),
            PropertyValue::UniqueId {
                prefix: Some("PREF".to_string()),
                number: 12,
            },
        );
        properties.insert(
            "When".to_string(),
            PropertyValue::Date(Some(DateRange {
                start: "2025-01-01".to_string(),
                end: Some("2025-01-05".to_string()),
            })),
        );

        Page {
            id: PageId::parse("11111111-2222-3333-4444-555555555555").unwrap(),
            created_time: "2025-01-01T00:00:00.000Z".to_string(),
            last_edited_time: "2025-01-02T00:00:00.000Z".to_string(),
            url: "https://www.notion.so/quarterly".to_string(),
            parent: Parent::Database("db-1".to_string()),
            created_by: Some("user-1".to_string()),
            last_edited_by: None,
            cover: None,
            icon: Some(Icon::Emoji("📒".to_string())),
            properties,
        }
    }

    #[test]
    fn frontmatter_has_delimiters_and_key_order() {
        let text = generate_frontmatter(&sample_page()).unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.ends_with("---\n\n"));

        let notion_id = text.find("notion_id:").unwrap();
        let title = text.find("title: Quarterly Plan").unwrap();
        let parent_type = text.find("parent_type: database_id").unwrap();
        let properties = text.find("properties:").unwrap();
        assert!(notion_id < title);
        assert!(title < parent_type);
        assert!(parent_type < properties);
    }

    #[test]
    fn empty_valued_properties_are_omitted() {
        let text = generate_frontmatter(&sample_page()).unwrap();
        // Score has no number and projects to nothing.
        assert!(!text.contains("Score"));
        // Unchecked checkbox is a real false, not an omission.
        assert!(text.contains("Done: false"));
    }

    #[test]
    fn unique_id_and_date_render_as_strings() {
        let text = generate_frontmatter(&sample_page()).unwrap();
        assert!(text.contains("Ticket: PREF-12"));
        assert!(text.contains("When: 2025-01-01 - 2025-01-05"));
    }

    #[test]
    fn workspace_parent_projects_null_id() {
        let mut page = sample_page();
        page.parent = Parent::Workspace;
        let text = generate_frontmatter(&page).unwrap();
        assert!(text.contains("parent_type: workspace"));
        assert!(text.contains("parent_id: null"));
    }

    #[test]
    fn database_schema_lists_property_configs() {
        let mut properties = IndexMap::new();
        properties.insert(
            "Stage".to_string(),
            DatabaseProperty {
                id: "abc".to_string(),
                config: PropertyConfig::Status {
                    groups: vec![StatusGroup {
                        name: "In progress".to_string(),
                        options: vec!["opt-1".to_string()],
                    }],
                },
            },
        );
        properties.insert(
            "Effort".to_string(),
            DatabaseProperty {
                id: "def".to_string(),
                config: PropertyConfig::Formula {
                    expression: "prop(\"Days\") * 8".to_string(),
                },
            },
        );

        let database = Database {
            id: DatabaseId::parse("99999999-8888-7777-6666-555555555555").unwrap(),
            title: vec![RichTextItem::plain_text("Projects")],
            created_time: "2025-01-01T00:00:00.000Z".to_string(),
            last_edited_time: "2025-01-02T00:00:00.000Z".to_string(),
            url: "https://www.notion.so/projects".to_string(),
            is_inline: false,
            properties,
        };

        let schema = generate_database_schema(&database).unwrap();
        assert!(schema.contains("title: Projects"));
        assert!(schema.contains("is_inline: false"));
        assert!(schema.contains("type: status"));
        assert!(schema.contains("name: In progress"));
        assert!(schema.contains("type: formula"));
        assert!(schema.contains("expression:"));
        // Status appears before Effort, insertion order preserved.
        assert!(schema.find("Stage:").unwrap() < schema.find("Effort:").unwrap());
    }
}
