//! Whole-book figure indexing.
//!
//! Every text document is scanned in order; documents with at least one
//! figure are rewritten, and the collected captions become a new index page
//! appended to the book.

use serde::Serialize;
use tracing::info;

use crate::book::{Book, XHTML_MEDIA_TYPE};
use crate::error::Result;
use crate::index::{IndexOptions, render_index};
use crate::scan::{CaptionRecord, scan_document};

/// What a run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Figures in encounter order.
    pub captions: Vec<CaptionRecord>,
    /// Hrefs of documents that were rewritten.
    pub updated_documents: Vec<String>,
    /// Href of the generated index page, if one was added.
    pub index_href: Option<String>,
}

/// Anchor every captioned figure in the book.
///
/// Only documents containing a figure are written back.
pub fn anchor_figures(book: &mut Book) -> Result<RunReport> {
    let mut report = RunReport::default();

    for (id, href) in book.text_documents() {
        info!("processing {}...", href);
        let content = book.read_text(&id)?;
        let outcome = scan_document(&content, &href)?;

        if let Some(content) = outcome.content {
            info!("updating file {}...", href);
            book.write_text(&id, content)?;
            report.updated_documents.push(href);
        }
        report.captions.extend(outcome.captions);
    }

    Ok(report)
}

/// Render the index page for `captions` and add it to the book.
///
/// Returns the href of the new document.
pub fn add_index_page(
    book: &mut Book,
    captions: &[CaptionRecord],
    options: &IndexOptions,
) -> Result<String> {
    let page = render_index(captions, book.epub_version(), options);
    book.add_text_document(&options.manifest_id, &options.file_name, page, XHTML_MEDIA_TYPE)
}

/// Anchor all figures, then add an index page if any were found.
///
/// # Example
///
/// ```no_run
/// use figindex::{IndexOptions, index_figures, read_epub, write_epub};
///
/// let mut book = read_epub("book.epub")?;
/// let report = index_figures(&mut book, &IndexOptions::default())?;
/// if report.index_href.is_some() {
///     write_epub(&book, "book-indexed.epub")?;
/// }
/// # Ok::<(), figindex::Error>(())
/// ```
pub fn index_figures(book: &mut Book, options: &IndexOptions) -> Result<RunReport> {
    info!("Start processing book for images with captions...");
    let mut report = anchor_figures(book)?;

    if report.captions.is_empty() {
        info!("Nothing to do");
    } else {
        info!(figures = report.captions.len(), "Preparing the index of figures file");
        report.index_href = Some(add_index_page(book, &report.captions, options)?);
    }

    Ok(report)
}
