use std::path::Path;

use super::PdfError;

/// Extract the text layer of the PDF at `path`.
///
/// Parsing runs on the blocking pool; a parser panic is reported as an extraction error rather
/// than tearing down the calling task.
pub async fn extract_text(path: &Path) -> Result<String, PdfError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| PdfError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let byte_count = bytes.len();

    let text = tokio::task::spawn_blocking(move || extract_text_from_bytes(&bytes))
        .await
        .map_err(|error| PdfError::Extraction(format!("parser task failed: {error}")))??;

    tracing::info!(
        path = %path.display(),
        bytes = byte_count,
        characters = text.chars().count(),
        "Extracted text from PDF"
    );
    Ok(text)
}

/// Extract text from an in-memory PDF, terminating every non-empty page with a blank line.
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String, PdfError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|error| PdfError::Extraction(error.to_string()))?;
    Ok(join_pages(&raw))
}

/// `pdf-extract` separates pages with form feeds.
fn join_pages(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    for page in raw.split('\x0C') {
        if page.trim().is_empty() {
            continue;
        }
        text.push_str(page);
        text.push_str("\n\n");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{RenderOptions, render_pdf};

    #[test]
    fn pages_are_joined_with_blank_lines() {
        let joined = join_pages("first page\x0C\x0C  \x0Csecond page");
        assert_eq!(joined, "first page\n\nsecond page\n\n");
    }

    #[test]
    fn garbage_input_is_an_extraction_error() {
        let error = extract_text_from_bytes(b"definitely not a pdf").expect_err("invalid pdf");
        assert!(matches!(error, PdfError::Extraction(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let error = extract_text(Path::new("/nonexistent/input.pdf"))
            .await
            .expect_err("missing file");
        assert!(matches!(error, PdfError::Read { .. }));
    }

    #[tokio::test]
    async fn reads_text_from_generated_document() {
        let bytes = render_pdf(
            "Quarterly revenue grew steadily across every region.",
            &RenderOptions::default(),
        )
        .expect("render");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("input.pdf");
        tokio::fs::write(&path, bytes).await.expect("write");

        let text = extract_text(&path).await.expect("extract");
        assert!(text.contains("Quarterly"));
        assert!(text.ends_with("\n\n"));
    }
}
