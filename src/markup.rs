//! Flat tokenizer and single-tag serializer for XHTML content documents.
//!
//! A document is turned into an ordered list of [`Token`]s: either a tag
//! (begin, end, or self-closing) or a run of raw text. Anything that is not
//! an element tag (character data, entity references, comments, CDATA, the
//! XML declaration, processing instructions, the doctype) is kept as raw
//! text, so concatenating the tokens' markup gives back an equivalent
//! document.
//!
//! Attribute values are kept raw (still escaped). Serializing a tag never
//! escapes them again.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;

/// Whether a tag opens, closes, or is self-closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `<name ...>`
    Begin,
    /// `</name>`
    End,
    /// `<name .../>`
    Single,
}

/// One element tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Namespace prefix (`epub` in `epub:switch`).
    pub prefix: Option<String>,
    /// Local name.
    pub name: String,
    pub kind: TagKind,
    /// Attributes in document order, values raw.
    pub attributes: Vec<(String, String)>,
}

/// One parse event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Tag(Tag),
}

impl Tag {
    pub fn new(name: impl Into<String>, kind: TagKind) -> Self {
        Self {
            prefix: None,
            name: name.into(),
            kind,
            attributes: Vec::new(),
        }
    }

    pub fn begin(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::Begin)
    }

    pub fn end(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::End)
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, TagKind::Single)
    }

    pub fn with_prefix(mut self, prefix: Option<impl Into<String>>) -> Self {
        self.prefix = prefix.map(Into::into);
        self
    }

    /// Append an attribute. `value` must already be escaped.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Raw value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// True if this tag has local name `name` and kind `kind`.
    pub fn is(&self, name: &str, kind: TagKind) -> bool {
        self.kind == kind && self.name == name
    }

    pub fn to_markup(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        if self.kind == TagKind::End {
            f.write_str("/")?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}:")?;
        }
        f.write_str(&self.name)?;

        if self.kind != TagKind::End {
            for (key, value) in &self.attributes {
                // A raw value can only contain `"` if it was single-quoted in the source.
                if value.contains('"') {
                    write!(f, " {key}='{value}'")?;
                } else {
                    write!(f, " {key}=\"{value}\"")?;
                }
            }
        }

        if self.kind == TagKind::Single {
            f.write_str("/")?;
        }
        f.write_str(">")
    }
}

impl Token {
    /// Markup for this token: text verbatim, tags serialized.
    pub fn to_markup(&self) -> String {
        match self {
            Token::Text(text) => text.clone(),
            Token::Tag(tag) => tag.to_markup(),
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Token::Tag(tag) => Some(tag),
            Token::Text(_) => None,
        }
    }
}

/// Split a document into tokens.
///
/// Malformed markup (mismatched end tags, broken attributes) is an error.
///
/// # Example
///
/// ```
/// use figindex::markup::{tokenize, Tag, Token};
///
/// let tokens = tokenize(r#"<p>Hi<br/></p>"#)?;
/// assert_eq!(tokens[1], Token::Text("Hi".into()));
/// assert_eq!(tokens[2], Token::Tag(Tag::single("br")));
/// # Ok::<(), figindex::Error>(())
/// ```
pub fn tokenize(content: &str) -> Result<Vec<Token>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut tokens = Vec::new();
    // Pending run of non-tag input.
    let mut text = String::new();

    loop {
        let tag = match reader.read_event()? {
            Event::Start(e) => read_tag(&e, TagKind::Begin)?,
            Event::Empty(e) => read_tag(&e, TagKind::Single)?,
            Event::End(e) => {
                let name = e.name();
                Tag::end(String::from_utf8(name.local_name().as_ref().to_vec())?)
                    .with_prefix(prefix_of(name.prefix().map(|p| p.into_inner().to_vec()))?)
            }
            Event::Text(e) => {
                text.push_str(std::str::from_utf8(&e)?);
                continue;
            }
            Event::GeneralRef(e) => {
                write_raw(&mut text, "&", &e, ";")?;
                continue;
            }
            Event::Comment(e) => {
                write_raw(&mut text, "<!--", &e, "-->")?;
                continue;
            }
            Event::CData(e) => {
                write_raw(&mut text, "<![CDATA[", &e, "]]>")?;
                continue;
            }
            Event::Decl(e) => {
                write_raw(&mut text, "<?", &e, "?>")?;
                continue;
            }
            Event::PI(e) => {
                write_raw(&mut text, "<?", &e, "?>")?;
                continue;
            }
            Event::DocType(e) => {
                write_raw(&mut text, "<!DOCTYPE ", &e, ">")?;
                continue;
            }
            Event::Eof => break,
        };

        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }
        tokens.push(Token::Tag(tag));
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }

    Ok(tokens)
}

/// Concatenate the markup of every token.
pub fn serialize(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_markup).collect()
}

/// Escape text for use inside markup.
pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

fn read_tag(e: &BytesStart<'_>, kind: TagKind) -> Result<Tag> {
    let name = e.name();
    let mut tag = Tag::new(String::from_utf8(name.local_name().as_ref().to_vec())?, kind)
        .with_prefix(prefix_of(name.prefix().map(|p| p.into_inner().to_vec()))?);

    for attr in e.attributes() {
        let attr = attr?;
        tag.attributes.push((
            String::from_utf8(attr.key.as_ref().to_vec())?,
            String::from_utf8(attr.value.to_vec())?,
        ));
    }

    Ok(tag)
}

/// Append `open` + raw event bytes + `close`.
fn write_raw(text: &mut String, open: &str, raw: &[u8], close: &str) -> Result<()> {
    text.push_str(open);
    text.push_str(std::str::from_utf8(raw)?);
    text.push_str(close);
    Ok(())
}

fn prefix_of(prefix: Option<Vec<u8>>) -> Result<Option<String>> {
    Ok(prefix.map(String::from_utf8).transpose()?)
}
