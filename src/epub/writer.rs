use std::io::{Seek, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::reader::local_name;
use crate::book::{Book, strip_bom};
use crate::error::{Error, Result};
use crate::markup::Tag;

const MIMETYPE: &[u8] = b"application/epub+zip";

/// Write a [`Book`] to an EPUB file on disk.
///
/// # Example
///
/// ```no_run
/// use figindex::{read_epub, write_epub};
///
/// let book = read_epub("input.epub")?;
/// write_epub(&book, "output.epub")?;
/// # Ok::<(), figindex::Error>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
///
/// Entries are written in their original order and with their original
/// compression. The package document gains manifest and spine entries for
/// documents added since the book was read.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // 1. Write mimetype (must be first, uncompressed)
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    let package = patch_package(book)?;

    // 2. Write everything else in archive order
    for entry in &book.entries {
        if entry.path == "mimetype" {
            continue;
        }
        let options = if entry.compressed {
            options_deflate
        } else {
            options_stored
        };
        zip.start_file(entry.path.as_str(), options)?;
        if entry.path == book.package_path {
            zip.write_all(package.as_bytes())?;
        } else {
            zip.write_all(&entry.data)?;
        }
    }

    zip.finish()?;
    Ok(())
}

/// Package document text with `<item>`/`<itemref>` elements for added
/// documents inserted before `</manifest>` and `</spine>`.
fn patch_package(book: &Book) -> Result<String> {
    let data = book
        .entry(&book.package_path)
        .map(|e| strip_bom(&e.data))
        .ok_or_else(|| Error::InvalidEpub(format!("Missing package document: {}", book.package_path)))?;
    let package = String::from_utf8(data.to_vec())?;

    let added: Vec<_> = book.added_items().collect();
    if added.is_empty() {
        return Ok(package);
    }

    let manifest_end = find_end_tag(&package, b"manifest")?;
    let spine_end = find_end_tag(&package, b"spine")?;

    let items: String = added
        .iter()
        .map(|item| {
            Tag::single("item")
                .with_prefix(manifest_end.prefix.as_deref())
                .with_attr("id", &item.id)
                .with_attr("href", &item.href)
                .with_attr("media-type", &item.media_type)
                .to_markup()
        })
        .map(|markup| format!("  {markup}\n{}", manifest_end.indent))
        .collect();
    let itemrefs: String = added
        .iter()
        .map(|item| {
            Tag::single("itemref")
                .with_prefix(spine_end.prefix.as_deref())
                .with_attr("idref", &item.id)
                .to_markup()
        })
        .map(|markup| format!("  {markup}\n{}", spine_end.indent))
        .collect();

    // Insert at the later offset first so the earlier one stays valid
    let mut inserts = [(manifest_end.offset, items), (spine_end.offset, itemrefs)];
    inserts.sort_by(|a, b| b.0.cmp(&a.0));

    let mut patched = package;
    for (offset, text) in inserts {
        patched.insert_str(offset, &text);
    }
    Ok(patched)
}

/// Location of a closing tag in the package document.
struct EndTag {
    /// Byte offset of the `<`.
    offset: usize,
    prefix: Option<String>,
    /// Whitespace between the start of its line and the tag.
    indent: String,
}

fn find_end_tag(content: &str, name: &[u8]) -> Result<EndTag> {
    let mut reader = Reader::from_str(content);

    loop {
        match reader.read_event()? {
            Event::End(e) if local_name(e.name().as_ref()) == name => {
                let prefix = e
                    .name()
                    .prefix()
                    .map(|p| String::from_utf8(p.into_inner().to_vec()))
                    .transpose()?;
                // The reader stops right after the `>` of the end tag
                let end = reader.buffer_position() as usize;
                let offset = content[..end].rfind("</").ok_or_else(|| {
                    Error::InvalidEpub("Malformed closing tag in package document".into())
                })?;
                let line_start = content[..offset].rfind('\n').map_or(0, |i| i + 1);
                let indent = &content[line_start..offset];
                let indent = if indent.trim().is_empty() { indent } else { "" };
                return Ok(EndTag {
                    offset,
                    prefix,
                    indent: indent.to_string(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(format!(
        "Package document has no closing {} tag",
        String::from_utf8_lossy(name)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{ArchiveEntry, XHTML_MEDIA_TYPE};

    const PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <manifest>
    <item id="ch1" href="Text/ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
  </spine>
</package>"#;

    fn book_with_package(package: &str) -> Book {
        let mut book = Book {
            package_path: "OEBPS/content.opf".into(),
            entries: vec![
                ArchiveEntry {
                    path: "OEBPS/content.opf".into(),
                    data: package.as_bytes().to_vec(),
                    compressed: true,
                },
                ArchiveEntry {
                    path: "OEBPS/Text/ch1.xhtml".into(),
                    data: b"<html/>".to_vec(),
                    compressed: true,
                },
            ],
            ..Book::default()
        };
        book.manifest.push(crate::book::ManifestItem {
            id: "ch1".into(),
            href: "Text/ch1.xhtml".into(),
            media_type: XHTML_MEDIA_TYPE.into(),
            properties: None,
        });
        book.spine.push(crate::book::SpineItem {
            idref: "ch1".into(),
            linear: true,
        });
        book
    }

    #[test]
    fn test_patch_package_unchanged() {
        let book = book_with_package(PACKAGE);
        assert_eq!(patch_package(&book).unwrap(), PACKAGE);
    }

    #[test]
    fn test_patch_package_adds_item_and_itemref() {
        let mut book = book_with_package(PACKAGE);
        book.add_text_document("indexoffigures", "IndexOfFigures.xhtml", "<html/>", XHTML_MEDIA_TYPE)
            .unwrap();

        let patched = patch_package(&book).unwrap();
        assert!(patched.contains(
            "    <item id=\"ch1\" href=\"Text/ch1.xhtml\" media-type=\"application/xhtml+xml\"/>\n    <item id=\"indexoffigures\" href=\"Text/IndexOfFigures.xhtml\" media-type=\"application/xhtml+xml\"/>\n  </manifest>"
        ));
        assert!(patched.contains(
            "    <itemref idref=\"ch1\"/>\n    <itemref idref=\"indexoffigures\"/>\n  </spine>"
        ));
    }

    #[test]
    fn test_patch_package_keeps_prefix() {
        let package = r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf" version="2.0"><opf:manifest><opf:item id="ch1" href="Text/ch1.xhtml" media-type="application/xhtml+xml"/></opf:manifest><opf:spine><opf:itemref idref="ch1"/></opf:spine></opf:package>"#;
        let mut book = book_with_package(package);
        book.add_text_document("new", "New.xhtml", "", XHTML_MEDIA_TYPE)
            .unwrap();

        let patched = patch_package(&book).unwrap();
        assert!(patched.contains(r#"<opf:item id="new" href="Text/New.xhtml" media-type="application/xhtml+xml"/>"#));
        assert!(patched.contains("<opf:itemref idref=\"new\"/>\n</opf:spine>"));
    }

    #[test]
    fn test_patch_package_without_spine() {
        let mut book = book_with_package("<package><manifest></manifest></package>");
        book.add_text_document("new", "New.xhtml", "", XHTML_MEDIA_TYPE)
            .unwrap();
        assert!(matches!(patch_package(&book), Err(Error::InvalidEpub(_))));
    }
}
