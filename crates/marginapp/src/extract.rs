//! # Content Extraction
//!
//! Turns a discovered [`Region`] into a [`Tool`] record without suggestions.
//!
//! The live markup of the region's text-bearing subregion becomes
//! `htmlSpan` as is. `html` is that same markup with every highlight marker
//! removed (inner content kept), so `html == strip(htmlSpan)` holds for every
//! extracted tool and the two are identical when no marker is present.
//! `plainText` is derived from `html`.
//!
//! Extraction only reads the region. A region without a text-bearing
//! subregion yields empty content, not an error.

use crate::markup::{self, HighlightMarkers};
use crate::model::{Tool, ToolContent};
use crate::page::{PageLocation, Region};
use crate::error::Result;
use chrono::Utc;

/// Either a region of the live page or a tool record from a snapshot cache.
///
/// Shared logic (suggestion creation, listing) works on tools; this is the
/// one place the two origins are normalized.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Live(Region),
    Cached(Tool),
}

impl ContentSource {
    pub fn tool_id(&self) -> &str {
        match self {
            ContentSource::Live(region) => &region.id,
            ContentSource::Cached(tool) => &tool.id,
        }
    }

    pub fn into_tool(self, location: &PageLocation, markers: &HighlightMarkers) -> Tool {
        match self {
            ContentSource::Live(region) => extract_tool(&region, location, markers),
            ContentSource::Cached(tool) => tool,
        }
    }
}

/// Content snapshot of a text-bearing subregion's live markup.
pub fn extract_content(live_markup: Option<&str>, markers: &HighlightMarkers) -> Result<ToolContent> {
    let Some(live) = live_markup else {
        return Ok(ToolContent::default());
    };

    let html = markers.strip(live)?;
    let plain_text = markup::plain_text(&html)?;
    Ok(ToolContent {
        plain_text,
        html,
        html_span: live.to_string(),
    })
}

/// Build the tool record for `region`.
///
/// A rewriter failure on the region's markup leaves the tool with empty
/// content; the tool is still reported so the weave's tool list stays
/// complete.
pub fn extract_tool(region: &Region, location: &PageLocation, markers: &HighlightMarkers) -> Tool {
    let content = extract_content(region.text_markup.as_deref(), markers).unwrap_or_else(|e| {
        tracing::warn!(tool = %region.id, error = %e, "content extraction failed");
        ToolContent::default()
    });

    Tool {
        id: region.id.clone(),
        tool_type: region.region_type.clone(),
        title: region.title.clone(),
        class_name: region.class_name.clone(),
        exposition_id: location.exposition_id.clone(),
        weave_id: location.weave_id.clone(),
        url: location.url.clone(),
        timestamp: Utc::now(),
        content,
        position: region.position,
        data_attributes: region.data_attributes.clone(),
        suggestions: Vec::new(),
        suggestion_count: 0,
    }
}

/// Extract every region of a page, in page order.
pub fn extract_all(regions: &[Region], location: &PageLocation, markers: &HighlightMarkers) -> Vec<Tool> {
    regions
        .iter()
        .map(|region| extract_tool(region, location, markers))
        .collect()
}
