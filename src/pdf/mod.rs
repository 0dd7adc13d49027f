//! PDF input and output: text extraction from uploads and rendering of summary documents.

mod extract;
mod render;

pub use extract::{extract_text, extract_text_from_bytes};
pub use render::{RenderOptions, render_pdf, write_pdf};

use thiserror::Error;

/// Errors raised while reading or writing PDF documents.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The input file could not be read.
    #[error("Cannot read PDF file {path}: {source}")]
    Read {
        /// Path of the file we attempted to read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The PDF parser rejected the document.
    #[error("Error extracting text from PDF: {0}")]
    Extraction(String),
    /// The output document could not be produced.
    #[error("Error generating PDF: {0}")]
    Render(String),
}
