// src/api/client.rs
//! Pure HTTP client wrapper for the Notion API.
//!
//! A thin wrapper around reqwest's blocking client. It handles
//! authentication headers and request/response plumbing without
//! parsing or business logic.

use crate::constants::{NOTION_API_BASE_URL, NOTION_API_VERSION};
use crate::error::AppError;
use reqwest::blocking::{Client, Response};
use reqwest::{header, StatusCode};
use std::time::Duration;

/// A thin wrapper around the blocking reqwest Client for Notion API
/// requests.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
}

impl NotionHttpClient {
    /// Creates a new HTTP client with Notion API authentication.
    pub fn new(token: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(token)?)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(token: &str) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", token);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::InvalidConfiguration(format!("invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_API_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Makes a GET request to the specified endpoint (path without
    /// the base URL).
    pub fn get(&self, endpoint: &str) -> Result<ApiResponse, AppError> {
        let url = format!("{}/{}", NOTION_API_BASE_URL, endpoint);
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?;
        extract_response(response)
    }

    /// Makes a POST request with a JSON body.
    pub fn post(&self, endpoint: &str, body: &serde_json::Value) -> Result<ApiResponse, AppError> {
        let url = format!("{}/{}", NOTION_API_BASE_URL, endpoint);
        log::debug!("POST {}", url);
        let response = self.client.post(url).json(body).send()?;
        extract_response(response)
    }

    /// Makes a PATCH request with a JSON body.
    pub fn patch(&self, endpoint: &str, body: &serde_json::Value) -> Result<ApiResponse, AppError> {
        let url = format!("{}/{}", NOTION_API_BASE_URL, endpoint);
        log::debug!("PATCH {}", url);
        let response = self.client.patch(url).json(body).send()?;
        extract_response(response)
    }
}

/// Response body plus the metadata the parser needs for error
/// classification.
#[derive(Debug)]
pub struct ApiResponse {
    pub body: String,
    pub status: StatusCode,
    pub url: String,
    /// Retry-After header from a 429 response, in seconds.
    pub retry_after: Option<f64>,
}

fn extract_response(response: Response) -> Result<ApiResponse, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());
    let body = response.text()?;

    Ok(ApiResponse {
        body,
        status,
        url,
        retry_after,
    })
}
