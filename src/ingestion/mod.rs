//! Document ingestion: text extraction and chunking

pub mod chunker;
pub mod parser;

pub use chunker::chunk_text_with_overlap;
pub use parser::{parse_document, FileType};
