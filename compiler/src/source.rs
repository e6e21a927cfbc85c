// source.rs — Component document loading
//
// Resolves a component URL to a parsed document. The network driver only
// depends on `ComponentSource`, so tests can serve documents from memory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::diag::{Result, TranslateError};
use crate::doc::Document;

/// Something that can turn a component URL into a document.
pub trait ComponentSource {
    fn load(&self, url: &str) -> Result<Document>;
}

/// Parse markup text, naming `path` in any parse error.
pub fn parse_document(path: &str, text: &str) -> Result<Document> {
    let result = crate::parser::parse(text);
    if !result.errors.is_empty() {
        return Err(TranslateError::Parse {
            path: path.to_string(),
            errors: result
                .errors
                .iter()
                .map(|e| format!("{} at {}..{}", e, e.span().start, e.span().end))
                .collect(),
        });
    }
    result.document.ok_or_else(|| TranslateError::Parse {
        path: path.to_string(),
        errors: vec!["no root element".to_string()],
    })
}

/// Reads component documents from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl ComponentSource for FileSource {
    fn load(&self, url: &str) -> Result<Document> {
        let text = std::fs::read_to_string(url).map_err(|source| TranslateError::Io {
            path: PathBuf::from(url),
            source,
        })?;
        parse_document(url, &text)
    }
}

/// Serves component documents from an in-memory table.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, text: impl Into<String>) {
        self.files.insert(url.into(), text.into());
    }

    pub fn with(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(url, text);
        self
    }
}

impl ComponentSource for MemorySource {
    fn load(&self, url: &str) -> Result<Document> {
        let text = self.files.get(url).ok_or_else(|| TranslateError::Io {
            path: PathBuf::from(url),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such document"),
        })?;
        parse_document(url, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::ErrorKind;

    #[test]
    fn memory_source_serves_documents() {
        let source = MemorySource::new().with("a.xml", "<SpineML/>");
        let doc = source.load("a.xml").unwrap();
        assert_eq!(doc.root.name, "SpineML");
    }

    #[test]
    fn missing_document_is_io_error() {
        let err = MemorySource::new().load("ghost.xml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(format!("{err}").contains("ghost.xml"));
    }

    #[test]
    fn malformed_markup_is_parse_error() {
        let err = parse_document("bad.xml", "<A><B></A>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(format!("{err}").starts_with("parse error[E0001]: bad.xml: "));
    }

    #[test]
    fn file_source_reports_missing_file() {
        let err = FileSource.load("/nonexistent/component.xml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
