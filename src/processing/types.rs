//! Core data types and error definitions for the PDF pipeline.

use crate::pdf::PdfError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while validating chunking parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// A zero-sized window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room to advance between windows.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested overlap.
        overlap: usize,
        /// Requested chunk size.
        chunk_size: usize,
    },
}

/// Errors emitted by the document processing pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Uploaded file name does not carry a `.pdf` extension.
    #[error("Only PDF files are supported")]
    UnsupportedFile,
    /// Input file is missing.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Input file or working directory could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Text extraction or summary rendering failed.
    #[error(transparent)]
    Pdf(#[from] PdfError),
    /// Chunk parameters were rejected.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// A backing client could not be constructed.
    #[error("Failed to initialize service: {0}")]
    Initialization(String),
}

/// Outcome of a completed pipeline run, stored on the job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Source PDF that was processed.
    pub input_pdf: PathBuf,
    /// Characters of text extracted from the source.
    pub extracted_text_length: usize,
    /// Chunks the text was split into.
    pub num_chunks: usize,
    /// Characters in the combined summary.
    pub summary_length: usize,
    /// Generated summary PDF.
    pub output_pdf: PathBuf,
    /// Chunks whose summary fell back to a truncated excerpt.
    #[serde(skip)]
    pub fallbacks: usize,
}
