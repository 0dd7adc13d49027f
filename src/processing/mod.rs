//! Document processing pipeline: extraction, chunking, summarization, and rendering.

pub mod chunking;
mod service;
pub mod summarize;
pub mod types;

pub use chunking::{ChunkConfig, TextChunk, chunk_spans, chunk_text};
pub use service::{
    NoopObserver, PdfApi, PdfService, Pipeline, PipelineObserver, ProcessedFile,
};
pub use summarize::Summarizer;
pub use types::{ChunkingError, PipelineReport, ProcessingError};
