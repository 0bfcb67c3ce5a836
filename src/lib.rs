//! # figindex
//!
//! Anchor captioned figures in an EPUB and generate an index of figures.
//!
//! A figure is a paragraph holding an image, a line break and a caption span:
//!
//! ```text
//! <p><img alt="image010" src="../Images/image010.png"/><br/>
//! <span class="image_caption">Figure 8 - DSLR diagram</span></p>
//! ```
//!
//! Each such image is wrapped in `<a id="ref_image010">`, and a new
//! `IndexOfFigures.xhtml` page listing every caption with a link back to its
//! anchor is appended to the book.
//!
//! ## Quick Start
//!
//! ```no_run
//! use figindex::{IndexOptions, index_figures, read_epub, write_epub};
//!
//! let mut book = read_epub("input.epub")?;
//! let report = index_figures(&mut book, &IndexOptions::default())?;
//! println!("{} figures indexed", report.captions.len());
//! write_epub(&book, "output.epub")?;
//! # Ok::<(), figindex::Error>(())
//! ```
//!
//! ## Scanning a single document
//!
//! ```
//! use figindex::scan_document;
//!
//! let outcome = scan_document("<p>No figures here.</p>", "Text/ch1.xhtml")?;
//! assert!(outcome.content.is_none());
//! assert!(outcome.captions.is_empty());
//! # Ok::<(), figindex::Error>(())
//! ```

pub mod book;
pub mod epub;
mod error;
pub mod index;
pub mod markup;
pub mod run;
pub mod scan;

pub use book::{Book, ManifestItem, SpineItem};
pub use epub::{read_epub, read_epub_from_reader, write_epub, write_epub_to_writer};
pub use error::{Error, Result};
pub use index::{IndexOptions, Template, render_index};
pub use run::{RunReport, add_index_page, anchor_figures, index_figures};
pub use scan::{CaptionRecord, ScanOutcome, scan_document};
