// src/backup/attachments.rs
//! Attachment download and block rewriting.
//!
//! Notion-hosted file URLs are signed and expire about an hour after
//! the API hands them out, so file-bearing blocks are dereferenced
//! during the export. External URLs are permanent and left alone.

use crate::error::AppError;
use crate::model::Block;
use crate::output::atomic_write;
use crate::types::{BlockId, PageId};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Type hint for a file-bearing block, picks the fallback extension
/// when the URL gives none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Pdf,
    File,
}

impl AttachmentKind {
    fn from_block(block: &Block) -> Option<Self> {
        match block {
            Block::Image(_) => Some(Self::Image),
            Block::Video(_) => Some(Self::Video),
            Block::Audio(_) => Some(Self::Audio),
            Block::Pdf(_) => Some(Self::Pdf),
            Block::File(_) => Some(Self::File),
            _ => None,
        }
    }

    fn default_extension(self) -> &'static str {
        match self {
            Self::Image => ".png",
            Self::Video => ".mp4",
            Self::Audio => ".mp3",
            Self::Pdf => ".pdf",
            Self::File => ".bin",
        }
    }
}

const KNOWN_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico", ".mp4", ".webm", ".mov", ".avi",
    ".mp3", ".wav", ".ogg", ".m4a", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    ".txt", ".md", ".json", ".csv", ".zip", ".tar", ".gz",
];

/// Downloads attachments into per-page `attachments/` directories.
pub struct AttachmentDownloader {
    output_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl AttachmentDownloader {
    pub fn new(output_dir: &Path) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            client,
        })
    }

    /// Download one attachment and return its path relative to the
    /// page directory, `None` on any failure. Download failures never
    /// fail the page export; the markdown keeps the remote URL.
    pub fn download(
        &self,
        url: &str,
        page_id: &PageId,
        block_id: &BlockId,
        kind: AttachmentKind,
    ) -> Option<String> {
        if url.is_empty() {
            return None;
        }

        let filename = attachment_filename(url, block_id, kind);
        let file_path = self
            .output_dir
            .join("pages")
            .join(page_id.as_str())
            .join("attachments")
            .join(&filename);

        log::debug!("Downloading attachment: {}", url);
        match self.fetch(url) {
            Ok(bytes) => match atomic_write(&file_path, &bytes) {
                Ok(()) => {
                    log::info!("Downloaded attachment: {}", filename);
                    Some(format!("attachments/{}", filename))
                }
                Err(e) => {
                    log::error!("Error saving attachment {}: {}", url, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to download attachment {}: {}", url, e);
                None
            }
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Deterministic local filename for an attachment.
///
/// The name is derived from the final URL path segment when it carries
/// an extension; otherwise the extension comes from the URL path or
/// the block type hint. The block ID prefix keeps names unique within
/// a page.
pub fn attachment_filename(url: &str, block_id: &BlockId, kind: AttachmentKind) -> String {
    let url_path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let segment = url_path.rsplit('/').next().unwrap_or("");
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let cleaned = sanitize(&decoded);

    if let Some(dot) = cleaned.rfind('.').filter(|&i| i > 0) {
        let stem: String = cleaned[..dot].chars().take(50).collect();
        let ext = &cleaned[dot..];
        return format!("{}_{}{}", block_id.short(), stem, ext);
    }

    let ext = extension_for(&url_path, kind);
    format!("{}{}", block_id.short(), ext)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn extension_for(url_path: &str, kind: AttachmentKind) -> &'static str {
    let lower = url_path.to_ascii_lowercase();
    KNOWN_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .copied()
        .unwrap_or_else(|| kind.default_extension())
}

/// Only Notion-hosted files expire and need to be captured locally.
pub fn is_notion_hosted(url: &str) -> bool {
    url.contains("secure.notion-static.com") || url.contains("prod-files-secure")
}

/// Download the Notion-hosted attachments of `blocks`, recording each
/// local path on its block. Returns the number of files downloaded.
pub fn process_blocks_for_attachments(
    blocks: &mut [Block],
    downloader: &AttachmentDownloader,
    page_id: &PageId,
) -> usize {
    let mut downloaded = 0;

    for block in blocks.iter_mut() {
        let Some(kind) = AttachmentKind::from_block(block) else {
            continue;
        };
        let block_id = block.id().clone();
        let Some(content) = block.file_content_mut() else {
            continue;
        };

        let url = content.remote_url().to_string();
        if url.is_empty() || !is_notion_hosted(&url) {
            continue;
        }

        if let Some(local_path) = downloader.download(&url, page_id, &block_id, kind) {
            content.local_path = Some(local_path);
            downloaded += 1;
        }
    }

    downloaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block_id() -> BlockId {
        BlockId::parse("abcdef01-2345-6789-abcd-ef0123456789").unwrap()
    }

    #[test]
    fn filename_from_url_keeps_extension() {
        let name = attachment_filename(
            "https://prod-files-secure.s3.us-west-2.amazonaws.com/x/y/photo.jpg?sig=abc",
            &block_id(),
            AttachmentKind::Image,
        );
        assert_eq!(name, "abcdef01_photo.jpg");
    }

    #[test]
    fn percent_encoded_names_are_decoded_then_sanitized() {
        let name = attachment_filename(
            "https://prod-files-secure.example.com/a/my%20report%20(final).pdf",
            &block_id(),
            AttachmentKind::Pdf,
        );
        assert_eq!(name, "abcdef01_my_report__final_.pdf");
    }

    #[test]
    fn extensionless_url_falls_back_to_type_hint() {
        let name = attachment_filename(
            "https://secure.notion-static.com/files/blob",
            &block_id(),
            AttachmentKind::Video,
        );
        assert_eq!(name, "abcdef01.mp4");
    }

    #[test]
    fn long_stems_are_truncated() {
        let stem = "a".repeat(80);
        let url = format!("https://example.com/{}.png", stem);
        let name = attachment_filename(&url, &block_id(), AttachmentKind::Image);
        assert_eq!(name, format!("abcdef01_{}.png", "a".repeat(50)));
    }

    #[test]
    fn filename_is_deterministic() {
        let url = "https://prod-files-secure.example.com/a/diagram.svg";
        let first = attachment_filename(url, &block_id(), AttachmentKind::Image);
        let second = attachment_filename(url, &block_id(), AttachmentKind::Image);
        assert_eq!(first, second);
    }

    #[test]
    fn hosted_url_detection() {
        assert!(is_notion_hosted(
            "https://prod-files-secure.s3.us-west-2.amazonaws.com/x/y.png"
        ));
        assert!(is_notion_hosted("https://secure.notion-static.com/a/b.png"));
        assert!(!is_notion_hosted("https://example.com/logo.png"));
    }
}
