//! Captioned-figure scanner.
//!
//! Recognizes paragraphs of the form
//!
//! ```text
//! <p><img alt="image010" src="../Images/image010.png"/><br/>
//! <span class="image_caption">Figure 8 - DSLR diagram</span></p>
//! ```
//!
//! and wraps the image in `<a id="ref_image010">...</a>` so it can be linked
//! to. The scanner only checks that an image, a line break, and a span all
//! occur inside the paragraph; their order is not enforced.
//!
//! The anchor opens right after the paragraph's opening tag and closes after
//! the fragment that follows it. When that fragment is itself an opening tag
//! (`<p><span><img .../>...`), the rewritten paragraph is no longer
//! well-formed.
//!
//! Paragraphs are buffered until their closing tag. A paragraph that is still
//! open when the document ends is dropped from the output.

use std::borrow::Cow;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::markup::{Tag, TagKind, Token, tokenize};

/// Identifier used when a figure image has no `alt` attribute.
pub const UNNAMED_IMAGE: &str = "Noname";

/// Prefix prepended to the image identifier to form the anchor id.
pub const ANCHOR_PREFIX: &str = "ref_";

/// A recognized figure: where its anchor lives and what its caption says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionRecord {
    /// Id of the inserted anchor, `ref_` + image `alt`.
    pub anchor_id: String,
    /// Caption text, untrimmed and still escaped. See [`CaptionRecord::unescaped`].
    pub caption: String,
    /// Manifest href of the document containing the figure.
    pub href: String,
}

impl CaptionRecord {
    /// Copy of the record with character and entity references resolved in
    /// the anchor id and caption, for reporting outside of markup.
    ///
    /// Text with an unknown entity is kept as is.
    pub fn unescaped(&self) -> CaptionRecord {
        let unescape = |text: &str| {
            quick_xml::escape::unescape(text)
                .unwrap_or(Cow::Borrowed(text))
                .into_owned()
        };
        CaptionRecord {
            anchor_id: unescape(&self.anchor_id),
            caption: unescape(&self.caption),
            href: self.href.clone(),
        }
    }
}

/// Result of scanning one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Rewritten document, present only if at least one figure matched.
    pub content: Option<String>,
    pub captions: Vec<CaptionRecord>,
}

impl ScanOutcome {
    pub fn is_updated(&self) -> bool {
        self.content.is_some()
    }
}

/// Scan one document for captioned figures.
///
/// # Example
///
/// ```
/// use figindex::scan::scan_document;
///
/// let xhtml = r#"<p><img alt="fig1" src="a.png"/><br/><span>A cat</span></p>"#;
/// let outcome = scan_document(xhtml, "Text/ch1.xhtml")?;
///
/// assert_eq!(
///     outcome.content.as_deref(),
///     Some(r#"<p><a id="ref_fig1"><img alt="fig1" src="a.png"/></a><br/><span>A cat</span></p>"#)
/// );
/// assert_eq!(outcome.captions[0].caption, "A cat");
/// # Ok::<(), figindex::Error>(())
/// ```
pub fn scan_document(content: &str, href: &str) -> Result<ScanOutcome> {
    let mut scanner = Scanner::new(href);
    for token in tokenize(content)? {
        scanner.feed(token);
    }
    Ok(scanner.finish())
}

/// What has been seen so far in the current paragraph.
#[derive(Debug, Default)]
struct MatchState {
    image: Option<String>,
    line_break: bool,
    span: bool,
    caption: Option<String>,
}

impl MatchState {
    fn is_complete(&self) -> bool {
        self.image.is_some() && self.line_break && self.span
    }

    fn observe(&mut self, tag: &Tag) {
        match (tag.name.as_str(), tag.kind) {
            ("img", TagKind::Single) => {
                self.image = Some(tag.attr("alt").unwrap_or(UNNAMED_IMAGE).to_string());
            }
            ("br", TagKind::Single) => self.line_break = true,
            ("span", TagKind::Begin | TagKind::Single) => self.span = true,
            _ => {}
        }
    }
}

#[derive(Debug)]
enum State {
    Outside,
    Inside {
        paragraph: Vec<String>,
        found: MatchState,
    },
}

/// Single-pass state machine over a document's tokens.
#[derive(Debug)]
pub struct Scanner<'a> {
    href: &'a str,
    state: State,
    output: String,
    captions: Vec<CaptionRecord>,
    updated: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(href: &'a str) -> Self {
        Self {
            href,
            state: State::Outside,
            output: String::new(),
            captions: Vec::new(),
            updated: false,
        }
    }

    pub fn feed(&mut self, token: Token) {
        match &mut self.state {
            State::Outside => match token {
                Token::Tag(tag) if tag.is("p", TagKind::Begin) => {
                    self.state = State::Inside {
                        paragraph: vec![tag.to_markup()],
                        found: MatchState::default(),
                    };
                }
                Token::Text(text) => self.output.push_str(&text),
                Token::Tag(tag) => self.output.push_str(&tag.to_markup()),
            },
            State::Inside { paragraph, found } => {
                paragraph.push(token.to_markup());
                match token {
                    Token::Tag(tag) if tag.is("p", TagKind::End) => self.close_paragraph(),
                    Token::Tag(tag) => found.observe(&tag),
                    Token::Text(text) => {
                        if found.is_complete() {
                            found.caption = Some(text);
                        }
                    }
                }
            }
        }
    }

    fn close_paragraph(&mut self) {
        let State::Inside {
            mut paragraph,
            found,
        } = std::mem::replace(&mut self.state, State::Outside)
        else {
            return;
        };

        if found.is_complete() {
            let image = found.image.unwrap_or_else(|| UNNAMED_IMAGE.to_string());
            let anchor_id = format!("{ANCHOR_PREFIX}{image}");

            paragraph.insert(2, Tag::end("a").to_markup());
            paragraph.insert(1, Tag::begin("a").with_attr("id", &anchor_id).to_markup());

            debug!(href = self.href, anchor = %anchor_id, "anchored figure");
            self.captions.push(CaptionRecord {
                anchor_id,
                caption: found.caption.unwrap_or_default(),
                href: self.href.to_string(),
            });
            self.updated = true;
        }

        for fragment in paragraph {
            self.output.push_str(&fragment);
        }
    }

    pub fn finish(self) -> ScanOutcome {
        if let State::Inside { paragraph, .. } = &self.state {
            warn!(
                href = self.href,
                fragments = paragraph.len(),
                "unterminated paragraph dropped from output"
            );
        }

        ScanOutcome {
            content: self.updated.then_some(self.output),
            captions: self.captions,
        }
    }
}
