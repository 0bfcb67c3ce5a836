//! Error types for figindex operations.

use thiserror::Error;

/// Errors that can occur while reading, indexing, or writing a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("UTF-8 decoding error: {0}")]
    Str(#[from] std::str::Utf8Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Unknown manifest item: {0}")]
    UnknownManifestItem(String),

    #[error("Manifest item already exists: {0}")]
    DuplicateManifestItem(String),
}

pub type Result<T> = std::result::Result<T, Error>;
