//! Highlight marker handling over region markup.
//!
//! A highlight marker is any element matching one of the configured
//! selectors (by default `span.suggestion-highlight` and `mark`). Markers
//! created here look like:
//!
//! ```text
//! <span class="suggestion-highlight" data-span-id="suggestion-span-…"
//!       data-suggestion="…" data-selected-text="…">selected text</span>
//! ```
//!
//! All parsing goes through lol_html's streaming rewriter, so the input is
//! never loaded into a DOM.

use crate::error::{MarginError, Result};
use lol_html::html_content::{ContentType, TextType};
use lol_html::{doc_text, element, rewrite_str, RewriteStrSettings};
use std::cell::{Cell, RefCell};

pub const DEFAULT_HIGHLIGHT_CLASS: &str = "suggestion-highlight";
pub const SPAN_ID_ATTR: &str = "data-span-id";
pub const SUGGESTION_ATTR: &str = "data-suggestion";
pub const SELECTED_TEXT_ATTR: &str = "data-selected-text";

const SKIPPED_TAGS: &[&str] = &["script", "style", "template"];
const BLOCK_TAGS: &[&str] = &[
    "br", "p", "div", "li", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "pre", "section", "article",
];

pub fn default_highlight_selectors() -> Vec<String> {
    vec![format!("span.{}", DEFAULT_HIGHLIGHT_CLASS), "mark".to_string()]
}

/// Attributes read from one marker element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerAttributes {
    pub span_id: Option<String>,
    pub suggestion_text: Option<String>,
    pub selected_text: Option<String>,
}

/// Attributes written into a new marker element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMarker<'a> {
    pub span_id: &'a str,
    pub suggestion_text: &'a str,
    pub selected_text: &'a str,
}

#[derive(Debug, Clone)]
pub struct HighlightMarkers {
    selectors: Vec<String>,
    class_name: String,
}

impl Default for HighlightMarkers {
    fn default() -> Self {
        Self {
            selectors: default_highlight_selectors(),
            class_name: DEFAULT_HIGHLIGHT_CLASS.to_string(),
        }
    }
}

impl HighlightMarkers {
    /// Validate `selectors` and make sure markers created with `class_name`
    /// are themselves recognized.
    pub fn new(selectors: Vec<String>, class_name: impl Into<String>) -> Result<Self> {
        let class_name = class_name.into();
        if class_name.trim().is_empty() || class_name.contains(char::is_whitespace) {
            return Err(MarginError::Config(format!(
                "invalid highlight class `{}`",
                class_name
            )));
        }

        let mut selectors = selectors;
        let own = format!("span.{}", class_name);
        if !selectors.contains(&own) {
            selectors.push(own);
        }

        for selector in &selectors {
            selector.parse::<lol_html::Selector>().map_err(|e| {
                MarginError::Config(format!("invalid highlight selector `{}`: {}", selector, e))
            })?;
        }

        Ok(Self {
            selectors,
            class_name,
        })
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Remove every marker, keeping its content.
    pub fn strip(&self, markup: &str) -> Result<String> {
        let handlers = self
            .selectors
            .iter()
            .map(|selector| {
                element!(selector.as_str(), |el| {
                    el.remove_and_keep_content();
                    Ok(())
                })
            })
            .collect::<Vec<_>>();

        rewrite(markup, handlers)
    }

    pub fn has_highlights(&self, markup: &str) -> Result<bool> {
        Ok(!self.markers(markup)?.is_empty())
    }

    /// Attributes of every marker, in document order.
    pub fn markers(&self, markup: &str) -> Result<Vec<MarkerAttributes>> {
        let cell = RefCell::new(Vec::new());
        {
            let found = &cell;
            let handlers = self
                .selectors
                .iter()
                .map(|selector| {
                    element!(selector.as_str(), move |el| {
                        found.borrow_mut().push(MarkerAttributes {
                            span_id: decoded_attribute(el.get_attribute(SPAN_ID_ATTR)),
                            suggestion_text: decoded_attribute(el.get_attribute(SUGGESTION_ATTR)),
                            selected_text: decoded_attribute(el.get_attribute(SELECTED_TEXT_ATTR)),
                        });
                        Ok(())
                    })
                })
                .collect::<Vec<_>>();

            rewrite(markup, handlers)?;
        }
        Ok(cell.into_inner())
    }

    /// Wrap the first occurrence of `marker.selected_text` that lies within a
    /// single text node. Returns `None` when no such occurrence exists, e.g.
    /// when the selection straddles element boundaries.
    ///
    /// Only document text is searched: attribute values, comments and the
    /// contents of `script`/`style`/`textarea` are never touched.
    pub fn wrap_selection(&self, markup: &str, marker: &NewMarker<'_>) -> Option<String> {
        if marker.selected_text.is_empty() {
            return None;
        }
        let needle = html_escape::encode_text(marker.selected_text);
        let open_tag = self.open_tag(marker);

        let wrapped = Cell::new(false);
        let pending = RefCell::new(String::new());
        let out = {
            let (wrapped, pending) = (&wrapped, &pending);
            let (needle, open_tag) = (&*needle, open_tag.as_str());
            rewrite_str(
                markup,
                RewriteStrSettings {
                    document_content_handlers: vec![doc_text!(move |chunk| {
                        if wrapped.get() || chunk.text_type() != TextType::Data {
                            return Ok(());
                        }
                        // A text node may arrive in several chunks; emit it whole
                        // from its last chunk.
                        let mut node = pending.borrow_mut();
                        node.push_str(chunk.as_str());
                        if !chunk.last_in_text_node() {
                            chunk.remove();
                            return Ok(());
                        }
                        let text = std::mem::take(&mut *node);
                        let replacement = match text.find(needle) {
                            Some(at) => {
                                let until = at + needle.len();
                                wrapped.set(true);
                                format!(
                                    "{}{}{}</span>{}",
                                    &text[..at],
                                    open_tag,
                                    &text[at..until],
                                    &text[until..]
                                )
                            }
                            None => text,
                        };
                        chunk.replace(&replacement, ContentType::Html);
                        Ok(())
                    })],
                    ..RewriteStrSettings::default()
                },
            )
            .ok()?
        };

        if !wrapped.get() || !self.wrap_is_sound(markup, &out, marker.span_id) {
            return None;
        }
        Some(out)
    }

    /// The new marker is recognized and removing it gives back the input.
    fn wrap_is_sound(&self, before: &str, after: &str, span_id: &str) -> bool {
        let found = self
            .markers(after)
            .map(|m| m.iter().any(|a| a.span_id.as_deref() == Some(span_id)))
            .unwrap_or(false);
        let restored = self.unwrap_span(after, span_id).ok();
        if !found || restored.as_deref() != Some(before) {
            tracing::warn!(span = %span_id, "highlight marker did not survive a re-parse, discarded");
            return false;
        }
        true
    }

    /// Unwrap the marker(s) carrying `span_id`, keeping their content.
    pub fn unwrap_span(&self, markup: &str, span_id: &str) -> Result<String> {
        let handlers = self
            .selectors
            .iter()
            .map(|selector| {
                element!(selector.as_str(), move |el| {
                    let id = decoded_attribute(el.get_attribute(SPAN_ID_ATTR));
                    if id.as_deref() == Some(span_id) {
                        el.remove_and_keep_content();
                    }
                    Ok(())
                })
            })
            .collect::<Vec<_>>();

        rewrite(markup, handlers)
    }

    fn open_tag(&self, marker: &NewMarker<'_>) -> String {
        format!(
            "<span class=\"{}\" {}=\"{}\" {}=\"{}\" {}=\"{}\">",
            self.class_name,
            SPAN_ID_ATTR,
            html_escape::encode_safe(marker.span_id),
            SUGGESTION_ATTR,
            html_escape::encode_safe(marker.suggestion_text),
            SELECTED_TEXT_ATTR,
            html_escape::encode_safe(marker.selected_text),
        )
    }
}

/// Entity-decoded text content with whitespace runs collapsed.
pub fn plain_text(markup: &str) -> Result<String> {
    let without_skipped = rewrite(
        markup,
        SKIPPED_TAGS
            .iter()
            .map(|tag| {
                element!(*tag, |el| {
                    el.remove();
                    Ok(())
                })
            })
            .collect(),
    )?;

    let cell = RefCell::new(String::new());
    {
        let text = &cell;
        let block_breaks = BLOCK_TAGS
            .iter()
            .map(|tag| {
                element!(*tag, move |_el| {
                    text.borrow_mut().push(' ');
                    Ok(())
                })
            })
            .collect::<Vec<_>>();

        rewrite_str(
            &without_skipped,
            RewriteStrSettings {
                element_content_handlers: block_breaks,
                document_content_handlers: vec![doc_text!(move |chunk| {
                    text.borrow_mut().push_str(chunk.as_str());
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| MarginError::Markup(e.to_string()))?;
    }

    let raw = cell.into_inner();
    let decoded = html_escape::decode_html_entities(&raw);
    Ok(decoded.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn rewrite<'h>(
    markup: &str,
    handlers: Vec<(
        std::borrow::Cow<'h, lol_html::Selector>,
        lol_html::ElementContentHandlers<'h>,
    )>,
) -> Result<String> {
    rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MarginError::Markup(e.to_string()))
}

fn decoded_attribute(value: Option<String>) -> Option<String> {
    value.map(|v| html_escape::decode_html_entities(&v).into_owned())
}
