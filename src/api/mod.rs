// src/api/mod.rs
//! Notion API access: HTTP client, rate limiting, response parsing,
//! and cursor pagination.

mod client;
pub mod parser;
mod pagination;
mod rate_limiter;

pub use client::{ApiResponse, NotionHttpClient};
pub use pagination::{PageBatch, Paginated};
pub use rate_limiter::{with_retry, RateLimiter};

use crate::backup::markdown::BlockSource;
use crate::config::Config;
use crate::constants::{NOTION_API_PAGE_SIZE, NOTION_REQUESTS_PER_SECOND};
use crate::error::AppError;
use crate::model::{Block, Database, Page};
use crate::types::{BlockId, DatabaseId, PageId};
use serde_json::{json, Value};

/// High-level Notion API client.
///
/// Every request goes through the shared rate limiter and the retry
/// wrapper, so callers see only final results.
pub struct NotionClient {
    http: NotionHttpClient,
    limiter: RateLimiter,
}

impl NotionClient {
    pub fn new(token: &str) -> Result<Self, AppError> {
        if token.is_empty() {
            return Err(AppError::MissingConfiguration("notion_token".to_string()));
        }
        Ok(Self {
            http: NotionHttpClient::new(token)?,
            limiter: RateLimiter::new(NOTION_REQUESTS_PER_SECOND),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(&config.notion_token)
    }

    /// All pages the integration can see, most recently edited first.
    pub fn pages(&self) -> Paginated<'_, Page> {
        self.search("page", parser::parse_page)
    }

    /// All databases the integration can see, most recently edited
    /// first.
    pub fn databases(&self) -> Paginated<'_, Database> {
        self.search("database", parser::parse_database)
    }

    fn search<T: 'static>(
        &self,
        object_kind: &'static str,
        parse_item: fn(&Value) -> Result<T, AppError>,
    ) -> Paginated<'_, T> {
        Paginated::new(move |cursor| {
            let mut body = json!({
                "page_size": NOTION_API_PAGE_SIZE,
                "sort": {
                    "direction": "descending",
                    "timestamp": "last_edited_time",
                },
                "filter": {
                    "property": "object",
                    "value": object_kind,
                },
            });
            if let Some(cursor) = cursor {
                body["start_cursor"] = json!(cursor);
            }
            let value = self.request("search", || self.http.post("search", &body))?;
            parser::parse_batch(&value, parse_item)
        })
    }

    pub fn get_page(&self, page_id: &PageId) -> Result<Page, AppError> {
        let endpoint = format!("pages/{}", page_id);
        let value = self.request("get_page", || self.http.get(&endpoint))?;
        parser::parse_page(&value)
    }

    pub fn get_database(&self, database_id: &DatabaseId) -> Result<Database, AppError> {
        let endpoint = format!("databases/{}", database_id);
        let value = self.request("get_database", || self.http.get(&endpoint))?;
        parser::parse_database(&value)
    }

    /// Direct children of a block (or of a page, which is a block for
    /// this endpoint). One level only; nesting is the caller's job.
    pub fn block_children(&self, block_id: &BlockId) -> Paginated<'_, Block> {
        let block_id = block_id.clone();
        Paginated::new(move |cursor| {
            let mut endpoint = format!(
                "blocks/{}/children?page_size={}",
                block_id, NOTION_API_PAGE_SIZE
            );
            if let Some(cursor) = cursor {
                endpoint.push_str(&format!("&start_cursor={}", cursor));
            }
            let value = self.request("block_children", || self.http.get(&endpoint))?;
            parser::parse_batch(&value, parser::parse_block)
        })
    }

    /// Rows of a database, as pages.
    pub fn database_pages(&self, database_id: &DatabaseId) -> Paginated<'_, Page> {
        let endpoint = format!("databases/{}/query", database_id);
        Paginated::new(move |cursor| {
            let mut body = json!({ "page_size": NOTION_API_PAGE_SIZE });
            if let Some(cursor) = cursor {
                body["start_cursor"] = json!(cursor);
            }
            let value = self.request("database_pages", || self.http.post(&endpoint, &body))?;
            parser::parse_batch(&value, parser::parse_page)
        })
    }

    /// Append pre-built block payloads to a page or block.
    pub fn append_block_children(
        &self,
        block_id: &BlockId,
        children: &[Value],
    ) -> Result<(), AppError> {
        let endpoint = format!("blocks/{}/children", block_id);
        let body = json!({ "children": children });
        self.request("append_block_children", || self.http.patch(&endpoint, &body))?;
        Ok(())
    }

    fn request(
        &self,
        name: &str,
        send: impl Fn() -> Result<ApiResponse, AppError>,
    ) -> Result<Value, AppError> {
        with_retry(name, || {
            self.limiter.wait();
            parser::into_json(send()?)
        })
    }
}

impl BlockSource for NotionClient {
    fn children(&self, block_id: &BlockId) -> Result<Vec<Block>, AppError> {
        self.block_children(block_id).collect()
    }
}
