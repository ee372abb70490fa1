// src/daily/mod.rs
//! Daily content: template rendering and publishing to a Notion page.

mod publisher;
mod template;

pub use publisher::{markdown_to_blocks, run_daily};
pub use template::TemplateEngine;
