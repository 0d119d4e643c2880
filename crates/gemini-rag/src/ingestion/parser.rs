//! Text extraction for plain text, Markdown and PDF files

use std::path::Path;
#[cfg(feature = "pdf")]
use std::sync::Arc;
#[cfg(feature = "pdf")]
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Seconds to wait on pdf-extract before falling back to lopdf
#[cfg(feature = "pdf")]
const PDF_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Parsed document with extracted text and metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

/// File parser for the formats the service accepts
pub struct FileParser;

impl FileParser {
    /// Read and parse a file from disk
    pub async fn load(path: &Path) -> Result<ParsedDocument> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let data = tokio::fs::read(path).await.map_err(|e| {
            Error::file_parse(&filename, format!("Failed to read file: {}", e))
        })?;

        Self::parse(&filename, data).await
    }

    /// Parse file bytes based on the file name's extension
    pub async fn parse(filename: &str, data: Vec<u8>) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename);

        if !file_type.is_supported() {
            let ext = Path::new(filename)
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            return Err(Error::UnsupportedFileType(format!(
                "{} - only text, Markdown and PDF files can be ingested",
                if ext.is_empty() { filename } else { ext.as_str() }
            )));
        }

        match file_type {
            #[cfg(feature = "pdf")]
            FileType::Pdf => Self::parse_pdf(filename, data).await,
            FileType::Txt | FileType::Markdown => Self::parse_text(filename, &data, file_type),
            _ => Err(Error::UnsupportedFileType(filename.to_string())),
        }
    }

    /// Parse plain text or Markdown
    fn parse_text(filename: &str, data: &[u8], file_type: FileType) -> Result<ParsedDocument> {
        let content = String::from_utf8_lossy(data).to_string();

        if content.trim().is_empty() {
            return Err(Error::file_parse(filename, "File contains no text"));
        }

        Ok(ParsedDocument {
            file_type,
            content,
            total_pages: None,
        })
    }

    /// Parse PDF document
    #[cfg(feature = "pdf")]
    async fn parse_pdf(filename: &str, data: Vec<u8>) -> Result<ParsedDocument> {
        let data = Arc::new(data);
        let content = Self::extract_pdf_with_timeout(filename, Arc::clone(&data)).await?;

        let content = cleanup_pdf_text(&content)
            .replace('\0', "")
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if content.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        let total_pages = tokio::task::spawn_blocking(move || {
            lopdf::Document::load_mem(&data)
                .map(|doc| doc.get_pages().len() as u32)
                .unwrap_or(1)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?;

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content,
            total_pages: Some(total_pages),
        })
    }

    /// Run pdf-extract on the blocking pool, falling back to lopdf on error,
    /// panic, empty output or timeout.
    ///
    /// A timed-out extraction is not cancelled: it keeps its blocking-pool
    /// thread until pdf-extract returns.
    #[cfg(feature = "pdf")]
    async fn extract_pdf_with_timeout(filename: &str, data: Arc<Vec<u8>>) -> Result<String> {
        let bytes = Arc::clone(&data);
        let extraction =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes));

        let reason = match tokio::time::timeout(
            Duration::from_secs(PDF_EXTRACT_TIMEOUT_SECS),
            extraction,
        )
        .await
        {
            Ok(Ok(Ok(text))) if !text.trim().is_empty() => return Ok(text),
            Ok(Ok(Ok(_))) => "returned no text".to_string(),
            Ok(Ok(Err(e))) => format!("failed: {}", e),
            Ok(Err(e)) => format!("crashed: {}", e),
            Err(_) => format!("timed out after {}s", PDF_EXTRACT_TIMEOUT_SECS),
        };
        tracing::warn!("pdf-extract {} for {}, trying lopdf", reason, filename);

        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || Self::extract_pdf_text_fallback(&filename, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    /// Page-by-page extraction with lopdf
    #[cfg(feature = "pdf")]
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut all_text = String::new();
        for page_num in doc.get_pages().keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) if !text.trim().is_empty() => {
                    all_text.push_str(&text);
                    all_text.push('\n');
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Could not extract text from page {}: {}", page_num, e);
                }
            }
        }

        if all_text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(all_text)
    }
}

/// Replace typographic characters pdf-extract leaves behind with ASCII
#[cfg(feature = "pdf")]
fn cleanup_pdf_text(text: &str) -> String {
    text.replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}
