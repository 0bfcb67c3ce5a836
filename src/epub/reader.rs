use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{Read, Seek};
use std::path::Path;
use zip::{CompressionMethod, ZipArchive};

use crate::book::{ArchiveEntry, Book, ManifestItem, SpineItem, strip_bom};
use crate::error::{Error, Result};

/// Parsed package document
struct PackageData {
    version: Option<String>,
    manifest: Vec<ManifestItem>,
    spine: Vec<SpineItem>,
}

/// Read an EPUB file from disk into a [`Book`].
///
/// # Example
///
/// ```no_run
/// use figindex::read_epub;
///
/// let book = read_epub("path/to/book.epub")?;
/// println!("EPUB version: {}", book.epub_version());
/// # Ok::<(), figindex::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Book> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
///
/// Every archive entry is loaded into memory; directory entries are skipped.
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Book> {
    let mut archive = ZipArchive::new(reader)?;

    // 1. Load every file in the archive
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let path = file.name().to_string();
        let compressed = file.compression() != CompressionMethod::Stored;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        entries.push(ArchiveEntry {
            path,
            data,
            compressed,
        });
    }

    let mut book = Book {
        entries,
        ..Book::default()
    };

    // 2. Find the package document path from container.xml
    let container = book
        .entry("META-INF/container.xml")
        .ok_or_else(|| Error::InvalidEpub("Missing META-INF/container.xml".into()))?;
    let package_path = find_package_path(&decode(&container.data)?)?;

    // 3. Parse the package document
    let package = book
        .entry(&package_path)
        .ok_or_else(|| Error::InvalidEpub(format!("Missing package document: {}", package_path)))?;
    let PackageData {
        version,
        manifest,
        spine,
    } = parse_package(&decode(&package.data)?)?;

    book.package_path = package_path;
    book.version = version;
    book.manifest = manifest;
    book.spine = spine;

    Ok(book)
}

fn decode(data: &[u8]) -> Result<String> {
    Ok(String::from_utf8(strip_bom(data).to_vec())?)
}

fn find_package_path(container: &str) -> Result<String> {
    let mut reader = Reader::from_str(container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path")? {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

fn parse_package(content: &str) -> Result<PackageData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut version = None;
    let mut manifest = Vec::new();
    let mut spine = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"package" => version = attribute(&e, b"version")?,
                b"item" => {
                    let Some(id) = attribute(&e, b"id")? else {
                        continue;
                    };
                    manifest.push(ManifestItem {
                        id,
                        href: attribute(&e, b"href")?.unwrap_or_default(),
                        media_type: attribute(&e, b"media-type")?.unwrap_or_default(),
                        properties: attribute(&e, b"properties")?,
                    });
                }
                b"itemref" => {
                    if let Some(idref) = attribute(&e, b"idref")? {
                        let linear = attribute(&e, b"linear")?.is_none_or(|v| v != "no");
                        spine.push(SpineItem { idref, linear });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(PackageData {
        version,
        manifest,
        spine,
    })
}

/// Raw value of the attribute called `key`.
fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

/// Extract local name from potentially namespaced XML name
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}
