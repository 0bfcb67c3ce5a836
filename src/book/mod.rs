//! In-memory EPUB container: archive entries, manifest and spine.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// Media type of XHTML content documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Version assumed when the package document does not declare one.
pub const DEFAULT_EPUB_VERSION: &str = "2.0";

/// Directory used for new text documents when the book has none to copy from.
const DEFAULT_TEXT_DIR: &str = "Text";

/// In-memory EPUB container.
///
/// Keeps every archive entry as-is so that a book can be written back with
/// only the documents that actually changed being different.
#[derive(Debug, Clone, Default)]
pub struct Book {
    /// Archive entries in archive order.
    pub entries: Vec<ArchiveEntry>,
    /// Archive path of the package document (e.g. `OEBPS/content.opf`).
    pub package_path: String,
    /// `version` attribute of the package element, if any.
    pub version: Option<String>,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    /// Manifest ids registered since the book was read.
    pub(crate) added: Vec<String>,
}

/// A file inside the EPUB archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    /// Whether the entry is deflated (otherwise stored).
    pub compressed: bool,
}

/// An `<item>` of the package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Raw href, relative to the package document.
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

/// An `<itemref>` of the package spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub idref: String,
    pub linear: bool,
}

impl Book {
    /// Format version reported by the package document.
    pub fn epub_version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_EPUB_VERSION)
    }

    /// Directory of the package document, without trailing slash.
    pub fn package_dir(&self) -> &str {
        self.package_path
            .rfind('/')
            .map(|i| &self.package_path[..i])
            .unwrap_or("")
    }

    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Ids registered with [`Book::add_text_document`] since the book was read.
    pub fn added_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.added.iter().filter_map(|id| self.manifest_item(id))
    }

    /// All XHTML documents as `(id, href)` pairs.
    ///
    /// Spine documents come first in reading order, followed by any XHTML
    /// manifest item that is not in the spine, in manifest order.
    pub fn text_documents(&self) -> Vec<(String, String)> {
        let spine_items = self
            .spine
            .iter()
            .filter_map(|itemref| self.manifest_item(&itemref.idref));
        let other_items = self
            .manifest
            .iter()
            .filter(|item| !self.spine.iter().any(|itemref| itemref.idref == item.id));

        let mut documents: Vec<(String, String)> = Vec::new();
        for item in spine_items.chain(other_items) {
            if item.media_type == XHTML_MEDIA_TYPE && !documents.iter().any(|(id, _)| id == &item.id) {
                documents.push((item.id.clone(), item.href.clone()));
            }
        }
        documents
    }

    /// Read a document's content as UTF-8.
    pub fn read_text(&self, id: &str) -> Result<String> {
        let entry = self.entry_for_item(id)?;
        Ok(String::from_utf8(strip_bom(&entry.data).to_vec())?)
    }

    /// Replace a document's content.
    pub fn write_text(&mut self, id: &str, content: impl Into<String>) -> Result<()> {
        let path = self.entry_for_item(id)?.path.clone();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.path == path) {
            entry.data = content.into().into_bytes();
        }
        Ok(())
    }

    /// Register a new text document and append it to the spine.
    ///
    /// The file is placed next to the first spine document (in `Text/` if
    /// the book has no text documents). Returns the new item's href.
    pub fn add_text_document(
        &mut self,
        id: &str,
        file_name: &str,
        content: impl Into<String>,
        media_type: &str,
    ) -> Result<String> {
        if self.manifest_item(id).is_some() {
            return Err(Error::DuplicateManifestItem(id.to_string()));
        }

        let dir = self
            .text_documents()
            .first()
            .map(|(_, href)| href_dir(href).to_string())
            .unwrap_or_else(|| DEFAULT_TEXT_DIR.to_string());
        let href = if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{dir}/{file_name}")
        };

        let path = resolve_path(self.package_dir(), &decode_href(&href));
        if self.entries.iter().any(|e| e.path == path)
            || self.manifest.iter().any(|item| item.href == href)
        {
            return Err(Error::DuplicateManifestItem(href));
        }

        self.entries.push(ArchiveEntry {
            path,
            data: content.into().into_bytes(),
            compressed: true,
        });
        self.manifest.push(ManifestItem {
            id: id.to_string(),
            href: href.clone(),
            media_type: media_type.to_string(),
            properties: None,
        });
        self.spine.push(SpineItem {
            idref: id.to_string(),
            linear: true,
        });
        self.added.push(id.to_string());

        Ok(href)
    }

    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Look up the archive entry behind a manifest href.
    pub fn entry_for_href(&self, href: &str) -> Option<&ArchiveEntry> {
        let dir = self.package_dir();
        // Try the href as written first, then percent-decoded (handles malformed EPUBs)
        self.entry(&resolve_path(dir, href))
            .or_else(|| self.entry(&resolve_path(dir, &decode_href(href))))
    }

    fn entry_for_item(&self, id: &str) -> Result<&ArchiveEntry> {
        let item = self
            .manifest_item(id)
            .ok_or_else(|| Error::UnknownManifestItem(id.to_string()))?;
        self.entry_for_href(&item.href).ok_or_else(|| {
            Error::InvalidEpub(format!("Missing file for manifest item {}: {}", id, item.href))
        })
    }
}

/// Strip UTF-8 BOM (byte order mark) if present
pub(crate) fn strip_bom(data: &[u8]) -> &[u8] {
    // UTF-8 BOM: EF BB BF
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

pub(crate) fn resolve_path(base: &str, href: &str) -> String {
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base, href)
    }
}

/// Undo XML escaping and percent-encoding of a manifest href.
fn decode_href(href: &str) -> String {
    let unescaped = quick_xml::escape::unescape(href).unwrap_or(Cow::Borrowed(href));
    percent_encoding::percent_decode_str(&unescaped)
        .decode_utf8_lossy()
        .into_owned()
}

fn href_dir(href: &str) -> &str {
    href.rfind('/').map(|i| &href[..i]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, href: &str, media_type: &str) -> ManifestItem {
        ManifestItem {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    fn entry(path: &str, data: &[u8]) -> ArchiveEntry {
        ArchiveEntry {
            path: path.into(),
            data: data.to_vec(),
            compressed: true,
        }
    }

    fn sample_book() -> Book {
        Book {
            entries: vec![
                entry("OEBPS/content.opf", b"<package/>"),
                entry("OEBPS/Text/ch1.xhtml", b"\xEF\xBB\xBF<html>one</html>"),
                entry("OEBPS/Text/ch 2.xhtml", b"<html>two</html>"),
                entry("OEBPS/Text/notes.xhtml", b"<html>notes</html>"),
                entry("OEBPS/Styles/style.css", b"p {}"),
            ],
            package_path: "OEBPS/content.opf".into(),
            version: None,
            manifest: vec![
                item("notes", "Text/notes.xhtml", XHTML_MEDIA_TYPE),
                item("css", "Styles/style.css", "text/css"),
                item("ch2", "Text/ch%202.xhtml", XHTML_MEDIA_TYPE),
                item("ch1", "Text/ch1.xhtml", XHTML_MEDIA_TYPE),
            ],
            spine: vec![
                SpineItem { idref: "ch1".into(), linear: true },
                SpineItem { idref: "ch2".into(), linear: true },
            ],
            added: Vec::new(),
        }
    }

    #[test]
    fn test_text_documents_order() {
        let book = sample_book();
        let ids: Vec<_> = book.text_documents().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["ch1", "ch2", "notes"]);
    }

    #[test]
    fn test_read_text_strips_bom_and_decodes_href() {
        let book = sample_book();
        assert_eq!(book.read_text("ch1").unwrap(), "<html>one</html>");
        assert_eq!(book.read_text("ch2").unwrap(), "<html>two</html>");
    }

    #[test]
    fn test_read_unknown_item() {
        let book = sample_book();
        assert!(matches!(book.read_text("nope"), Err(Error::UnknownManifestItem(_))));
    }

    #[test]
    fn test_write_text() {
        let mut book = sample_book();
        book.write_text("ch2", "<html>new</html>").unwrap();
        assert_eq!(book.read_text("ch2").unwrap(), "<html>new</html>");
        assert_eq!(book.entry("OEBPS/Text/ch 2.xhtml").unwrap().data, b"<html>new</html>");
    }

    #[test]
    fn test_epub_version_default() {
        let mut book = sample_book();
        assert_eq!(book.epub_version(), "2.0");
        book.version = Some("3.0".into());
        assert_eq!(book.epub_version(), "3.0");
    }

    #[test]
    fn test_add_text_document() {
        let mut book = sample_book();
        let href = book
            .add_text_document("index", "Index.xhtml", "<html/>", XHTML_MEDIA_TYPE)
            .unwrap();

        assert_eq!(href, "Text/Index.xhtml");
        assert_eq!(book.entries.last().unwrap().path, "OEBPS/Text/Index.xhtml");
        assert_eq!(book.spine.last().unwrap().idref, "index");
        assert_eq!(book.read_text("index").unwrap(), "<html/>");
        assert_eq!(book.added_items().count(), 1);
    }

    #[test]
    fn test_add_duplicate_id() {
        let mut book = sample_book();
        let err = book
            .add_text_document("ch1", "Other.xhtml", "", XHTML_MEDIA_TYPE)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateManifestItem(_)));
    }

    #[test]
    fn test_add_duplicate_path() {
        let mut book = sample_book();
        let err = book
            .add_text_document("other", "notes.xhtml", "", XHTML_MEDIA_TYPE)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateManifestItem(_)));
    }

    #[test]
    fn test_add_to_book_without_text() {
        let mut book = Book {
            package_path: "content.opf".into(),
            ..Book::default()
        };
        let href = book
            .add_text_document("index", "Index.xhtml", "", XHTML_MEDIA_TYPE)
            .unwrap();
        assert_eq!(href, "Text/Index.xhtml");
        assert_eq!(book.entries[0].path, "Text/Index.xhtml");
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBFabc"), b"abc");
        assert_eq!(strip_bom(b"abc"), b"abc");
    }
}
