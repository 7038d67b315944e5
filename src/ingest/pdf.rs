//! PDF text extraction for statute ingestion.

use std::path::Path;

use anyhow::{Context, Result};

/// Extract the full text of a PDF.
///
/// Returns an empty string (with a warning) for scanned documents that
/// carry no text layer.
pub fn extract_text(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(String::new());
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error() {
        let result = extract_text(Path::new("/nonexistent/statutes.pdf"));
        assert!(result.is_err());
    }
}
