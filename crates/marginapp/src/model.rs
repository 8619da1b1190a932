//! # Domain Model: Expositions, Weaves, Tools and Suggestions
//!
//! ```text
//! Exposition                      exposition_<expositionId>
//! └── Weave (one per sub-view)
//!     └── Tool (one per content region, in page order)
//!         └── Suggestion (user annotation on a span of the tool's text)
//!
//! suggestions_<expositionId>_<weaveId>  →  { toolId: [Suggestion, ...] }
//! ```
//!
//! Suggestions live in two places: the per-weave suggestion map (the list a
//! tool's suggestions are read from) and embedded in the tool records of the
//! exposition (what gets exported). Every write path updates both and then
//! calls [`Weave::recount`] / [`Exposition::recount`], so the derived
//! `suggestionCount`/`toolCount` fields always equal the lengths of the lists
//! they summarize.
//!
//! ## Tool Content
//!
//! A tool's [`ToolContent`] carries two markups:
//!
//! - `html`: canonical content, every highlight marker removed.
//! - `html_span`: last known live markup, may embed highlight markers.
//!
//! `html` is always what [`crate::markup::HighlightMarkers::strip`] produces
//! from `html_span`; when no marker is present the two are identical.
//!
//! ## Wire Format
//!
//! Field names serialize in camelCase. Storage records and the export
//! document share the same shapes, which is what lets the import path write
//! records indistinguishable from the ones the save path writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const EXPOSITION_KEY_PREFIX: &str = "exposition_";
pub const SUGGESTIONS_KEY_PREFIX: &str = "suggestions_";

/// Storage key of an exposition record.
pub fn exposition_key(exposition_id: &str) -> String {
    format!("{}{}", EXPOSITION_KEY_PREFIX, exposition_id)
}

/// Storage key of the per-weave suggestion map.
pub fn suggestions_key(exposition_id: &str, weave_id: &str) -> String {
    format!("{}{}_{}", SUGGESTIONS_KEY_PREFIX, exposition_id, weave_id)
}

/// Suggestions of one weave, keyed by tool id.
pub type SuggestionMap = BTreeMap<String, Vec<Suggestion>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exposition {
    pub exposition_id: String,
    #[serde(default)]
    pub weaves: BTreeMap<String, Weave>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub suggestion_count: usize,
}

impl Exposition {
    pub fn new(exposition_id: impl Into<String>) -> Self {
        Self {
            exposition_id: exposition_id.into(),
            weaves: BTreeMap::new(),
            last_updated: Utc::now(),
            suggestion_count: 0,
        }
    }

    /// Recompute every derived count from the tool lists and bump `last_updated`.
    pub fn recount(&mut self) {
        for weave in self.weaves.values_mut() {
            weave.recount();
        }
        self.suggestion_count = self.weaves.values().map(|w| w.suggestion_count).sum();
        self.last_updated = Utc::now();
    }

    pub fn tool_count(&self) -> usize {
        self.weaves.values().map(|w| w.tool_count).sum()
    }

    pub fn summary(&self) -> ExpositionSummary {
        ExpositionSummary {
            exposition_id: self.exposition_id.clone(),
            weave_count: self.weaves.len(),
            tool_count: self.tool_count(),
            suggestion_count: self.suggestion_count,
            last_updated: self.last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weave {
    pub weave_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub tool_count: usize,
    #[serde(default)]
    pub suggestion_count: usize,
    #[serde(default = "Utc::now")]
    pub last_visited: DateTime<Utc>,
    #[serde(default)]
    pub page_title: String,
}

impl Weave {
    pub fn new(weave_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            weave_id: weave_id.into(),
            url: url.into(),
            tools: Vec::new(),
            tool_count: 0,
            suggestion_count: 0,
            last_visited: Utc::now(),
            page_title: String::new(),
        }
    }

    pub fn recount(&mut self) {
        for tool in &mut self.tools {
            tool.suggestion_count = tool.suggestions.len();
        }
        self.tool_count = self.tools.len();
        self.suggestion_count = self.tools.iter().map(|t| t.suggestion_count).sum();
    }

    pub fn tool(&self, tool_id: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == tool_id)
    }

    pub fn tool_mut(&mut self, tool_id: &str) -> Option<&mut Tool> {
        self.tools.iter_mut().find(|t| t.id == tool_id)
    }

    /// The per-weave suggestion map as derived from the embedded tool lists.
    pub fn suggestion_map(&self) -> SuggestionMap {
        self.tools
            .iter()
            .filter(|t| !t.suggestions.is_empty())
            .map(|t| (t.id.clone(), t.suggestions.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContent {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub html_span: String,
}

impl ToolContent {
    /// Whether the live markup carries highlights the canonical markup does not.
    pub fn has_stored_spans(&self) -> bool {
        self.html_span != self.html
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    #[serde(rename = "type", default)]
    pub tool_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub exposition_id: String,
    #[serde(default)]
    pub weave_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub content: ToolContent,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub suggestion_count: usize,
}

impl Tool {
    pub fn set_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestion_count = suggestions.len();
        self.suggestions = suggestions;
    }

    pub fn find_suggestion_by_span(&self, span_id: &str) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| s.span_id == span_id)
    }
}

/// What the user selected inside a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    /// Marker id to use; generated when absent.
    pub span_id: Option<String>,
}

impl Selection {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub tool_id: String,
    #[serde(default)]
    pub exposition_id: String,
    #[serde(default)]
    pub weave_id: String,
    #[serde(default)]
    pub span_id: String,
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub suggestion_text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tool_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

impl Suggestion {
    /// Build a fresh suggestion for `tool`.
    pub fn new(tool: &Tool, span_id: String, selected_text: String, suggestion_text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tool_id: tool.id.clone(),
            exposition_id: tool.exposition_id.clone(),
            weave_id: tool.weave_id.clone(),
            span_id,
            selected_text,
            suggestion_text,
            timestamp: Utc::now(),
            url: tool.url.clone(),
            tool_type: tool.tool_type.clone(),
            imported_at: None,
        }
    }

    /// Two suggestions are duplicates when both texts match exactly.
    pub fn is_duplicate_of(&self, other: &Suggestion) -> bool {
        self.selected_text == other.selected_text && self.suggestion_text == other.suggestion_text
    }
}

/// Generate a globally unique highlight marker id.
pub fn new_span_id() -> String {
    format!("suggestion-span-{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpositionSummary {
    pub exposition_id: String,
    pub weave_count: usize,
    pub tool_count: usize,
    pub suggestion_count: usize,
    pub last_updated: DateTime<Utc>,
}

/// Header of an export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportHeader {
    pub id: String,
    pub export_timestamp: DateTime<Utc>,
    pub total_weaves: usize,
    pub total_tools: usize,
    pub total_suggestions: usize,
}

/// The export/import wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub exposition: ExportHeader,
    pub weaves: BTreeMap<String, Weave>,
}

impl ExportDocument {
    pub fn from_exposition(exposition: &Exposition) -> Self {
        let weaves = exposition.weaves.clone();
        Self {
            exposition: ExportHeader {
                id: exposition.exposition_id.clone(),
                export_timestamp: Utc::now(),
                total_weaves: weaves.len(),
                total_tools: weaves.values().map(|w| w.tools.len()).sum(),
                total_suggestions: weaves
                    .values()
                    .flat_map(|w| w.tools.iter())
                    .map(|t| t.suggestions.len())
                    .sum(),
            },
            weaves,
        }
    }
}
