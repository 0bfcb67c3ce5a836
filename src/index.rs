//! Index of figures page generation.

use crate::markup::{Tag, escape};
use crate::scan::CaptionRecord;

/// Title and heading of the generated page.
pub const INDEX_TITLE: &str = "Index of figures";

/// File name of the generated page.
pub const INDEX_FILE_NAME: &str = "IndexOfFigures.xhtml";

/// Manifest id of the generated page.
pub const INDEX_MANIFEST_ID: &str = "indexoffigures";

/// Class set on every index entry paragraph.
pub const ENTRY_CLASS: &str = "iof_entry";

const DOC_V3: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
    <head>
        <title>
            {title}
        </title>
    </head>
    <body>
        <h1>{heading}</h1>
        {body}
    </body>
</html>"#;

const DOC_V2: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
    <head>
        <title>
            {title}
        </title>
    </head>
    <body>
        <h1>{heading}</h1>
        {body}
    </body>
</html>"#;

/// How the generated page is named and labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Unescaped text of `<title>`.
    pub title: String,
    /// Unescaped text of `<h1>`.
    pub heading: String,
    pub file_name: String,
    pub manifest_id: String,
    pub entry_class: String,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            title: INDEX_TITLE.to_string(),
            heading: INDEX_TITLE.to_string(),
            file_name: INDEX_FILE_NAME.to_string(),
            manifest_id: INDEX_MANIFEST_ID.to_string(),
            entry_class: ENTRY_CLASS.to_string(),
        }
    }
}

/// Document template, chosen by EPUB version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// XHTML 1.1 doctype.
    Epub2,
    /// HTML5 doctype.
    Epub3,
}

impl Template {
    pub fn for_version(version: &str) -> Self {
        if version.starts_with('3') {
            Template::Epub3
        } else {
            Template::Epub2
        }
    }

    fn source(self) -> &'static str {
        match self {
            Template::Epub2 => DOC_V2,
            Template::Epub3 => DOC_V3,
        }
    }

    /// Fill `{title}`, `{heading}` and `{body}`. Values are inserted verbatim.
    pub fn render(self, title: &str, heading: &str, body: &str) -> String {
        let mut out = String::new();
        let mut rest = self.source();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open..];
            let (value, len) = [("{title}", title), ("{heading}", heading), ("{body}", body)]
                .into_iter()
                .find(|(key, _)| after.starts_with(key))
                .map(|(key, value)| (value, key.len()))
                .unwrap_or(("{", 1));
            out.push_str(value);
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }
}

/// One `<p class><a href>caption</a></p>` line.
pub fn render_entry(record: &CaptionRecord, entry_class: &str) -> String {
    let target = format!("../{}#{}", record.href, record.anchor_id);

    let mut entry = Tag::begin("p").with_attr("class", escape(entry_class)).to_markup();
    entry.push_str(&Tag::begin("a").with_attr("href", target).to_markup());
    entry.push_str(record.caption.trim());
    entry.push_str(&Tag::end("a").to_markup());
    entry.push_str(&Tag::end("p").to_markup());
    entry
}

/// Render the index page listing `captions` in order.
///
/// # Example
///
/// ```
/// use figindex::index::{IndexOptions, render_index};
/// use figindex::scan::CaptionRecord;
///
/// let captions = vec![CaptionRecord {
///     anchor_id: "ref_fig1".into(),
///     caption: " A cat ".into(),
///     href: "Text/ch1.xhtml".into(),
/// }];
/// let page = render_index(&captions, "3.0", &IndexOptions::default());
///
/// assert!(page.contains(r#"<p class="iof_entry"><a href="../Text/ch1.xhtml#ref_fig1">A cat</a></p>"#));
/// ```
pub fn render_index(captions: &[CaptionRecord], version: &str, options: &IndexOptions) -> String {
    let body = captions
        .iter()
        .map(|record| render_entry(record, &options.entry_class))
        .collect::<Vec<_>>()
        .join("\n");

    Template::for_version(version).render(&escape(&options.title), &escape(&options.heading), &body)
}
