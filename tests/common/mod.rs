//! Helpers for building EPUB archives in memory.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// One XHTML document of a test book: manifest id, href, body markup.
pub struct Doc<'a> {
    pub id: &'a str,
    pub href: &'a str,
    pub body: &'a str,
}

pub const FIGURE: &str = r#"<p><img alt="image010" src="../Images/image010.png"/><br/><span class="image_caption">Figure 8 - DSLR diagram</span></p>"#;

/// Wrap body markup in a minimal XHTML document.
pub fn xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>Chapter</title>
</head>
<body>
{body}
</body>
</html>"#
    )
}

pub fn package(version: &str, docs: &[Doc<'_>]) -> String {
    let mut opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="{version}" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Cameras</dc:title>
    <dc:identifier id="BookId">urn:uuid:1234</dc:identifier>
  </metadata>
  <manifest>
    <item id="img" href="Images/image010.png" media-type="image/png"/>
"#
    );
    for doc in docs {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            doc.id, doc.href
        ));
    }
    opf.push_str("  </manifest>\n  <spine>\n");
    for doc in docs {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", doc.id));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

/// Build a complete EPUB with the package at `OEBPS/content.opf`.
pub fn build_epub(version: &str, docs: &[Doc<'_>]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )
    .unwrap();

    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(package(version, docs).as_bytes()).unwrap();

    zip.start_file("OEBPS/Images/image010.png", stored).unwrap();
    zip.write_all(b"\x89PNG\r\n\x1a\n").unwrap();

    for doc in docs {
        zip.start_file(format!("OEBPS/{}", doc.href), deflated).unwrap();
        zip.write_all(xhtml(doc.body).as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Archive entry names in order.
pub fn entry_names(epub: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(epub)).unwrap();
    archive.file_names().map(str::to_string).collect()
}
