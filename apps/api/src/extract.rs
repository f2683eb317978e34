//! Resume text extraction.
//!
//! PDFs go through `pdf-extract`; anything else must already be UTF-8 text.
//! Other document formats are rejected at upload time.

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("document is not valid UTF-8 text")]
    NotText,

    #[error("document contains no text")]
    Empty,
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError>;
}

/// Default extractor: PDF by magic bytes, plain text otherwise.
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        let text = if document.starts_with(PDF_MAGIC) {
            pdf_extract::extract_text_from_mem(document)
                .map_err(|e| ExtractionError::Pdf(e.to_string()))?
        } else {
            let text = std::str::from_utf8(document).map_err(|_| ExtractionError::NotText)?;
            text.trim_start_matches('\u{feff}').to_string()
        };

        let text = normalize_whitespace(&text);
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}

/// Trims every line and collapses runs of blank lines to one.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = false;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if blank_run {
            out.push('\n');
            blank_run = false;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_start());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let text = DocumentExtractor
            .extract(b"Experienced engineer with 8 years of Rust.")
            .unwrap();
        assert_eq!(text, "Experienced engineer with 8 years of Rust.");
    }

    #[test]
    fn test_blank_document_is_rejected() {
        assert!(matches!(
            DocumentExtractor.extract(b"  \n\n  \t"),
            Err(ExtractionError::Empty)
        ));
    }

    #[test]
    fn test_binary_document_is_rejected() {
        assert!(matches!(
            DocumentExtractor.extract(&[0xff, 0xfe, 0x00, 0x81]),
            Err(ExtractionError::NotText)
        ));
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let text = DocumentExtractor
            .extract("\u{feff}  Jane Doe  \n\n\n\n  Staff Engineer\n".as_bytes())
            .unwrap();
        assert_eq!(text, "Jane Doe\n\nStaff Engineer");
    }
}
