//! # View State
//!
//! A [`PageSession`] drives one host page. It flips between two renderings:
//!
//! ```text
//!            enter_text_only                     leave_text_only
//!  Normal  ─────────────────▶  TextOnly  ─────────────────────────▶  Normal
//!  (live regions, highlights)  (listing built from cached tools)   restore + enhance
//! ```
//!
//! All mutable session state lives in one [`ViewState`]:
//!
//! - `mode`
//! - `original_structure`: the page structure captured once, when the
//!   session is first initialized and before any enhancement. Never taken
//!   while in text-only mode. Leaving text-only mode without it is a
//!   [`MarginError::RestoreFailure`]; the caller should offer a full reload.
//! - `text_only_cache`: tool snapshots the listing was built from. Suggestion
//!   creation in text-only mode works on these ([`ContentSource::Cached`]).
//! - `last_enhanced`: throttles mutation-triggered re-enhancement.
//!
//! Enhancement is discovery, extraction, storage and span reconciliation of
//! every region on the page.

use crate::error::{MarginError, Result};
use crate::extract::{extract_all, ContentSource};
use crate::markup::HighlightMarkers;
use crate::model::{Selection, Tool, Weave};
use crate::page::{HostPage, RegionHandle};
use crate::reconcile::{reconcile, MarkerBinding, Reconciliation};
use crate::repository::{Repository, SuggestionAdded};
use crate::store::backend::StorageBackend;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Normal,
    TextOnly,
}

/// One entry of the text-only listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    pub tool_id: String,
    pub tool_type: String,
    pub title: String,
    pub plain_text: String,
    pub suggestion_count: usize,
}

impl From<&Tool> for ListingItem {
    fn from(tool: &Tool) -> Self {
        Self {
            tool_id: tool.id.clone(),
            tool_type: tool.tool_type.clone(),
            title: tool.title.clone(),
            plain_text: tool.content.plain_text.clone(),
            suggestion_count: tool.suggestion_count,
        }
    }
}

/// Linear rendering of the page's text-bearing tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextOnlyListing {
    pub items: Vec<ListingItem>,
}

#[derive(Debug, Clone)]
pub struct ViewState<S> {
    mode: ViewMode,
    original_structure: Option<S>,
    text_only_cache: Vec<Tool>,
    last_enhanced: Option<Instant>,
    initialized: bool,
    reenhance_interval: Duration,
}

impl<S> ViewState<S> {
    pub fn new(reenhance_interval: Duration) -> Self {
        Self {
            mode: ViewMode::Normal,
            original_structure: None,
            text_only_cache: Vec::new(),
            last_enhanced: None,
            initialized: false,
            reenhance_interval,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn has_original_structure(&self) -> bool {
        self.original_structure.is_some()
    }

    pub fn cached_tools(&self) -> &[Tool] {
        &self.text_only_cache
    }

    pub fn cached_tool(&self, tool_id: &str) -> Option<&Tool> {
        self.text_only_cache.iter().find(|t| t.id == tool_id)
    }

    /// Whether enough time has passed since the last enhancement.
    pub fn should_reenhance(&self, now: Instant) -> bool {
        self.last_enhanced
            .map_or(true, |at| now.saturating_duration_since(at) >= self.reenhance_interval)
    }

    pub fn mark_enhanced(&mut self, at: Instant) {
        self.last_enhanced = Some(at);
    }
}

/// What one enhancement pass did.
#[derive(Debug, Clone)]
pub struct EnhanceReport {
    pub weave: Weave,
    /// Regions whose live markup was replaced by stored highlights.
    pub restored: usize,
}

pub struct PageSession<P: HostPage> {
    page: P,
    state: ViewState<P::Snapshot>,
    markers: HighlightMarkers,
}

impl<P: HostPage> PageSession<P> {
    pub fn new(page: P, markers: HighlightMarkers, reenhance_interval: Duration) -> Self {
        Self {
            page,
            state: ViewState::new(reenhance_interval),
            markers,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn state(&self) -> &ViewState<P::Snapshot> {
        &self.state
    }

    pub fn mode(&self) -> ViewMode {
        self.state.mode
    }

    /// Capture the original page structure on first use.
    pub fn initialize(&mut self) {
        if self.state.initialized {
            return;
        }
        if self.state.mode == ViewMode::Normal {
            self.state.original_structure = Some(self.page.snapshot_structure());
        }
        self.state.initialized = true;
    }

    /// Discover, store and reconcile every region of the page.
    ///
    /// Does nothing to the page while in text-only mode.
    pub async fn enhance<B: StorageBackend>(&mut self, repo: &Repository<B>) -> Result<EnhanceReport> {
        self.initialize();
        let location = self.page.location().clone();

        if self.state.mode == ViewMode::TextOnly {
            let mut weave = Weave::new(location.weave_id.as_str(), location.url.as_str());
            weave.tools = self.state.text_only_cache.clone();
            weave.recount();
            return Ok(EnhanceReport { weave, restored: 0 });
        }

        let tools = extract_all(self.page.regions(), &location, &self.markers);
        let weave = repo.upsert_weave_tools(&location, tools).await?;

        let mut restored = 0;
        for region in self.page.regions_mut() {
            let Some(tool) = weave.tool(&region.id) else {
                continue;
            };
            if let Reconciliation::Restored { .. } = reconcile(region, tool, &self.markers)? {
                restored += 1;
            }
        }

        self.state.mark_enhanced(Instant::now());
        tracing::debug!(weave = %location.weave_id, restored, "page enhanced");
        Ok(EnhanceReport { weave, restored })
    }

    /// Enhance again after a page mutation, unless the last pass was too recent.
    pub async fn reenhance<B: StorageBackend>(
        &mut self,
        repo: &Repository<B>,
    ) -> Result<Option<EnhanceReport>> {
        if self.state.mode == ViewMode::TextOnly || !self.state.should_reenhance(Instant::now()) {
            return Ok(None);
        }
        self.enhance(repo).await.map(Some)
    }

    /// Snapshot every text-bearing region and replace the page by a listing.
    pub async fn enter_text_only<B: StorageBackend>(
        &mut self,
        repo: &Repository<B>,
    ) -> Result<TextOnlyListing> {
        self.initialize();
        if self.state.mode == ViewMode::TextOnly {
            return Ok(self.listing());
        }

        let location = self.page.location().clone();
        let text_regions: Vec<_> = self
            .page
            .regions()
            .iter()
            .filter(|r| r.text_markup.is_some())
            .cloned()
            .collect();
        let mut tools = extract_all(&text_regions, &location, &self.markers);
        repo.attach_suggestions(&location.exposition_id, &location.weave_id, &mut tools)
            .await?;

        self.state.text_only_cache = tools;
        let listing = self.listing();
        self.page.show_listing(listing.clone());
        self.state.mode = ViewMode::TextOnly;

        tracing::debug!(items = listing.items.len(), "entered text-only view");
        Ok(listing)
    }

    /// Restore the original structure and enhance it again.
    pub async fn leave_text_only<B: StorageBackend>(
        &mut self,
        repo: &Repository<B>,
    ) -> Result<EnhanceReport> {
        if self.state.mode == ViewMode::Normal {
            return self.enhance(repo).await;
        }

        let snapshot = self
            .state
            .original_structure
            .clone()
            .ok_or(MarginError::RestoreFailure)?;
        self.page.restore_structure(snapshot);
        self.state.mode = ViewMode::Normal;
        self.state.text_only_cache.clear();

        self.enhance(repo).await
    }

    /// Flip the view mode. Returns the mode now active.
    pub async fn toggle<B: StorageBackend>(&mut self, repo: &Repository<B>) -> Result<ViewMode> {
        match self.state.mode {
            ViewMode::Normal => {
                self.enter_text_only(repo).await?;
            }
            ViewMode::TextOnly => {
                self.leave_text_only(repo).await?;
            }
        }
        Ok(self.state.mode)
    }

    /// Where the content of `tool_id` comes from in the current mode.
    pub fn content_source(&self, tool_id: &str) -> Option<ContentSource> {
        match self.state.mode {
            ViewMode::Normal => self
                .page
                .regions()
                .iter()
                .find(|r| r.id == tool_id)
                .cloned()
                .map(ContentSource::Live),
            ViewMode::TextOnly => self.state.cached_tool(tool_id).cloned().map(ContentSource::Cached),
        }
    }

    /// Create a suggestion on one tool of this page, in either mode.
    ///
    /// In normal mode the live region is updated with the new marker; in
    /// text-only mode the cached tool is replaced by the stored record.
    pub async fn add_suggestion<B: StorageBackend>(
        &mut self,
        repo: &Repository<B>,
        tool_id: &str,
        selection: Selection,
        suggestion_text: impl Into<String>,
    ) -> Result<SuggestionAdded> {
        let source = self
            .content_source(tool_id)
            .ok_or_else(|| MarginError::ToolNotFound(tool_id.to_string()))?;
        let location = self.page.location().clone();
        let tool = source.into_tool(&location, &self.markers);

        let added = repo.add_suggestion(&tool, selection, suggestion_text).await?;

        match self.state.mode {
            ViewMode::Normal => {
                if added.marker_applied {
                    if let Some(region) = self.page.regions_mut().iter_mut().find(|r| r.id == tool_id) {
                        region.replace_markup(added.tool.content.html_span.clone());
                        for binding in bindings_for(&added.tool, &self.markers)? {
                            region.bind_marker(binding);
                        }
                    }
                }
            }
            ViewMode::TextOnly => {
                if let Some(cached) = self.state.text_only_cache.iter_mut().find(|t| t.id == tool_id) {
                    *cached = added.tool.clone();
                }
            }
        }
        Ok(added)
    }

    fn listing(&self) -> TextOnlyListing {
        TextOnlyListing {
            items: self.state.text_only_cache.iter().map(ListingItem::from).collect(),
        }
    }
}

fn bindings_for(tool: &Tool, markers: &HighlightMarkers) -> Result<Vec<MarkerBinding>> {
    Ok(markers
        .markers(&tool.content.html_span)?
        .into_iter()
        .filter_map(|attrs| {
            let span_id = attrs.span_id?;
            let stored = tool.find_suggestion_by_span(&span_id);
            Some(MarkerBinding {
                suggestion_id: stored.map(|s| s.id.clone()),
                suggestion_text: attrs.suggestion_text,
                selected_text: attrs.selected_text,
                span_id,
            })
        })
        .collect())
}
