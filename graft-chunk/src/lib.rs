//! # Graft Chunk
//!
//! Statement decoders for the graft bulk loader.
//!
//! A decoder splits a byte stream into chunks and parses each chunk into a
//! sequence of [`Statement`]s. Two record-oriented formats are supported:
//!
//! - **RDF**: N-Quads-style lines, one statement per line.
//! - **JSON**: an array of objects, each describing one subject.
//!
//! The loader core only depends on the [`Chunker`] trait; the concrete
//! format is selected up front via [`Format`] (inferred from the file name
//! or passed explicitly).

pub mod error;
pub mod json;
pub mod rdf;

pub use error::{ChunkError, Result};
pub use json::JsonChunker;
pub use rdf::RdfChunker;

use graft_core::Statement;
use std::io::BufRead;
use std::path::Path;

/// Input format of a statement stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Rdf,
    Json,
}

impl Format {
    /// Infer the format from a file name (`.gz` suffix stripped first).
    pub fn infer(path: &Path) -> Result<Format> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(name);
        match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some("rdf") | Some("nq") | Some("nt") => Ok(Format::Rdf),
            Some("json") => Ok(Format::Json),
            _ => Err(ChunkError::UnknownFormat(name.to_string())),
        }
    }

    /// Parse an explicit format override (`"rdf"` or `"json"`).
    pub fn from_name(name: &str) -> Result<Format> {
        match name {
            "rdf" => Ok(Format::Rdf),
            "json" => Ok(Format::Json),
            _ => Err(ChunkError::UnknownFormat(name.to_string())),
        }
    }
}

/// A statement decoder: splits a byte stream into chunks and parses each
/// chunk into statements.
///
/// `next_chunk` returns `None` at end of stream. `finalize` is called once
/// after the last chunk and validates any trailing input.
pub trait Chunker: Send {
    fn next_chunk(&mut self, reader: &mut dyn BufRead) -> Result<Option<Vec<u8>>>;
    fn parse(&self, chunk: &[u8]) -> Result<Vec<Statement>>;
    fn finalize(&mut self, reader: &mut dyn BufRead) -> Result<()>;
}

/// Construct the chunker for a format.
pub fn new_chunker(format: Format) -> Box<dyn Chunker> {
    match format {
        Format::Rdf => Box::new(RdfChunker::new()),
        Format::Json => Box::new(JsonChunker::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_format() {
        assert_eq!(Format::infer(Path::new("data.rdf")).unwrap(), Format::Rdf);
        assert_eq!(Format::infer(Path::new("data.nq.gz")).unwrap(), Format::Rdf);
        assert_eq!(
            Format::infer(Path::new("dump.json.gz")).unwrap(),
            Format::Json
        );
        assert!(Format::infer(Path::new("data.csv")).is_err());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Format::from_name("rdf").unwrap(), Format::Rdf);
        assert_eq!(Format::from_name("json").unwrap(), Format::Json);
        assert!(Format::from_name("turtle").is_err());
    }
}
