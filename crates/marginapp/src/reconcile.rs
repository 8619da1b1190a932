//! # Span Reconciliation
//!
//! When the host re-renders a region it usually drops our highlight markers.
//! If the stored tool still knows a highlighted rendering, it is put back:
//!
//! ```text
//! live has markers?   stored htmlSpan != html?   action
//! ----------------    -----------------------   ------------------------
//! yes                 any                       trust the live markup
//! no                  no                        nothing to restore
//! no                  yes                       replace with htmlSpan,
//!                                               bind every marker
//! ```
//!
//! Replacement is all-or-nothing: positions are not re-anchored when the
//! underlying text changed since the highlights were saved.
//!
//! Each restored marker gets a [`MarkerBinding`] carrying what a click shows.
//! Markers written by older versions carry no suggestion attributes; for
//! those the suggestion is looked up by span id in the tool's list.

use crate::error::Result;
use crate::markup::HighlightMarkers;
use crate::model::Tool;
use crate::page::RegionHandle;
use serde::Serialize;

/// Click payload of one restored highlight marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerBinding {
    pub span_id: String,
    pub suggestion_id: Option<String>,
    pub suggestion_text: Option<String>,
    pub selected_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Live markup was left untouched.
    Untouched,
    /// Live markup was replaced by the stored `htmlSpan`.
    Restored { bindings: usize },
}

/// Re-apply stored highlights to `region` if its live render lost them.
///
/// Only tools with suggestions are considered.
pub fn reconcile<R: RegionHandle>(
    region: &mut R,
    tool: &Tool,
    markers: &HighlightMarkers,
) -> Result<Reconciliation> {
    if tool.suggestions.is_empty() {
        return Ok(Reconciliation::Untouched);
    }

    let has_live_spans = markers.has_highlights(region.live_markup())?;
    if has_live_spans || !tool.content.has_stored_spans() {
        return Ok(Reconciliation::Untouched);
    }

    let found = markers.markers(&tool.content.html_span)?;
    region.replace_markup(tool.content.html_span.clone());

    let mut bound = 0;
    for attrs in found {
        let Some(span_id) = attrs.span_id else {
            continue;
        };
        let stored = tool.find_suggestion_by_span(&span_id);
        region.bind_marker(MarkerBinding {
            suggestion_id: stored.map(|s| s.id.clone()),
            suggestion_text: attrs
                .suggestion_text
                .or_else(|| stored.map(|s| s.suggestion_text.clone())),
            selected_text: attrs
                .selected_text
                .or_else(|| stored.map(|s| s.selected_text.clone())),
            span_id,
        });
        bound += 1;
    }

    tracing::debug!(tool = %tool.id, bindings = bound, "restored stored highlights");
    Ok(Reconciliation::Restored { bindings: bound })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_tool;
    use crate::model::{new_span_id, Suggestion};
    use crate::page::{PageLocation, Region};

    const MARKED: &str = r#"<p>The <span class="suggestion-highlight" data-span-id="s1" data-suggestion="slow" data-selected-text="quick">quick</span> fox</p>"#;

    fn tool_with(html_span: &str, suggestions: usize) -> Tool {
        let region = Region::new("t1", "tool-text").with_text_markup(html_span);
        let mut tool = extract_tool(&region, &PageLocation::new("e", "w"), &HighlightMarkers::default());
        let list = (0..suggestions)
            .map(|_| Suggestion::new(&tool, "s1".into(), "quick".into(), "slow".into()))
            .collect();
        tool.set_suggestions(list);
        tool
    }

    #[test]
    fn test_restores_unmarked_live_render() {
        let markers = HighlightMarkers::default();
        let tool = tool_with(MARKED, 1);
        let mut region = Region::new("t1", "tool-text").with_text_markup("<p>The quick fox</p>");

        let outcome = reconcile(&mut region, &tool, &markers).unwrap();
        assert_eq!(outcome, Reconciliation::Restored { bindings: 1 });
        assert!(markers.has_highlights(region.live_markup()).unwrap());

        let binding = region.binding("s1").unwrap();
        assert_eq!(binding.suggestion_text.as_deref(), Some("slow"));
        assert_eq!(binding.suggestion_id.as_deref(), Some(tool.suggestions[0].id.as_str()));
    }

    #[test]
    fn test_live_markers_are_trusted() {
        let markers = HighlightMarkers::default();
        let tool = tool_with(MARKED, 1);
        let live = "<p>The <mark>quick</mark> fox</p>";
        let mut region = Region::new("t1", "tool-text").with_text_markup(live);

        assert_eq!(reconcile(&mut region, &tool, &markers).unwrap(), Reconciliation::Untouched);
        assert_eq!(region.live_markup(), live);
    }

    #[test]
    fn test_no_stored_spans_means_no_replacement() {
        let tool = tool_with("<p>The quick fox</p>", 1);
        let mut region = Region::new("t1", "tool-text").with_text_markup("<p>changed</p>");
        let outcome = reconcile(&mut region, &tool, &HighlightMarkers::default()).unwrap();
        assert_eq!(outcome, Reconciliation::Untouched);
        assert_eq!(region.live_markup(), "<p>changed</p>");
    }

    #[test]
    fn test_tools_without_suggestions_are_skipped() {
        let tool = tool_with(MARKED, 0);
        let mut region = Region::new("t1", "tool-text").with_text_markup("<p>The quick fox</p>");
        let outcome = reconcile(&mut region, &tool, &HighlightMarkers::default()).unwrap();
        assert_eq!(outcome, Reconciliation::Untouched);
    }

    #[test]
    fn test_legacy_marker_falls_back_to_span_lookup() {
        let span_id = new_span_id();
        let legacy = format!(
            r#"<p>The <span class="suggestion-highlight" data-span-id="{}">quick</span> fox</p>"#,
            span_id
        );
        let mut tool = tool_with(&legacy, 0);
        let suggestion = Suggestion::new(&tool, span_id.clone(), "quick".into(), "fast".into());
        tool.set_suggestions(vec![suggestion]);

        let mut region = Region::new("t1", "tool-text").with_text_markup("<p>The quick fox</p>");
        reconcile(&mut region, &tool, &HighlightMarkers::default()).unwrap();

        let binding = region.binding(&span_id).unwrap();
        assert_eq!(binding.suggestion_text.as_deref(), Some("fast"));
        assert_eq!(binding.selected_text.as_deref(), Some("quick"));
    }
}
