//! # Annotation Repository
//!
//! Owns the exposition/weave/tool/suggestion records in the store.
//!
//! A weave's suggestions live in two records:
//!
//! 1. `suggestions_<e>_<w>`: the per-weave map, the source of truth.
//! 2. `exposition_<e>`: the embedded copy inside each tool record, the tool's
//!    `htmlSpan` and all derived counts.
//!
//! Every operation that reads or writes either one locks both in a single
//! [`crate::store::Transaction`], reads the map under that lock and commits
//! both records together; a failed second write rolls the first one back.
//! After every write the derived counts equal the lengths of the lists they
//! summarize ([`Exposition::recount`]).
//!
//! ## Highlight Preservation
//!
//! A page re-enumeration replaces a weave's tool list wholesale. The host
//! often renders a region without our markers before reconciliation has run,
//! so a freshly extracted tool can arrive with `htmlSpan == html` while the
//! stored one still carries highlights. In that case the stored `htmlSpan`
//! is kept; otherwise a plain re-render would erase every highlight on the
//! next save.

use crate::error::{MarginError, Result};
use crate::markup::{HighlightMarkers, NewMarker};
use crate::model::{
    exposition_key, new_span_id, suggestions_key, Exposition, ExpositionSummary, Selection,
    Suggestion, SuggestionMap, Tool, Weave, EXPOSITION_KEY_PREFIX,
};
use crate::page::PageLocation;
use crate::store::backend::StorageBackend;
use crate::store::JsonStore;
use chrono::Utc;

/// Result of [`Repository::add_suggestion`].
#[derive(Debug, Clone)]
pub struct SuggestionAdded {
    pub suggestion: Suggestion,
    /// The stored tool after the write.
    pub tool: Tool,
    /// Whether the selection could be wrapped in a highlight marker.
    pub marker_applied: bool,
}

pub struct Repository<B: StorageBackend> {
    store: JsonStore<B>,
    markers: HighlightMarkers,
}

impl<B: StorageBackend> Repository<B> {
    pub fn new(store: JsonStore<B>, markers: HighlightMarkers) -> Self {
        Self { store, markers }
    }

    pub fn store(&self) -> &JsonStore<B> {
        &self.store
    }

    pub fn markers(&self) -> &HighlightMarkers {
        &self.markers
    }

    pub async fn load_exposition(&self, exposition_id: &str) -> Result<Option<Exposition>> {
        self.store.load(&exposition_key(exposition_id)).await
    }

    pub async fn load_suggestion_map(
        &self,
        exposition_id: &str,
        weave_id: &str,
    ) -> Result<SuggestionMap> {
        Ok(self
            .store
            .load(&suggestions_key(exposition_id, weave_id))
            .await?
            .unwrap_or_default())
    }

    /// Summaries of every stored exposition, ordered by id.
    pub async fn list_expositions(&self) -> Result<Vec<ExpositionSummary>> {
        let mut summaries = Vec::new();
        for key in self.store.keys_with_prefix(EXPOSITION_KEY_PREFIX).await? {
            if let Some(exposition) = self.store.load::<Exposition>(&key).await? {
                summaries.push(exposition.summary());
            }
        }
        summaries.sort_by(|a, b| a.exposition_id.cmp(&b.exposition_id));
        Ok(summaries)
    }

    /// Set `suggestions`/`suggestionCount` of each tool from the suggestion store.
    pub async fn attach_suggestions(
        &self,
        exposition_id: &str,
        weave_id: &str,
        tools: &mut [Tool],
    ) -> Result<()> {
        let map = self.load_suggestion_map(exposition_id, weave_id).await?;
        attach_from_map(&map, tools);
        Ok(())
    }

    /// Replace the tool list of the weave at `location`.
    ///
    /// Stored suggestions are attached to the incoming tools and the
    /// highlight preservation rule is applied per tool. Returns the weave as
    /// written.
    pub async fn upsert_weave_tools(
        &self,
        location: &PageLocation,
        mut tools: Vec<Tool>,
    ) -> Result<Weave> {
        let map_key = suggestions_key(&location.exposition_id, &location.weave_id);
        let exp_key = exposition_key(&location.exposition_id);
        let mut tx = self.store.transaction(&[&map_key, &exp_key]).await;

        let map: SuggestionMap = tx.load(&map_key).await?.unwrap_or_default();
        attach_from_map(&map, &mut tools);

        let mut exposition = tx
            .load::<Exposition>(&exp_key)
            .await?
            .unwrap_or_else(|| Exposition::new(location.exposition_id.as_str()));

        if let Some(previous) = exposition.weaves.get(&location.weave_id) {
            for tool in tools.iter_mut() {
                if let Some(stored) = previous.tool(&tool.id) {
                    preserve_highlights(tool, stored, &self.markers);
                }
            }
        }

        let mut weave = Weave::new(location.weave_id.as_str(), location.url.as_str());
        weave.page_title = location.page_title.clone();
        weave.last_visited = Utc::now();
        weave.tools = tools;
        exposition.weaves.insert(location.weave_id.clone(), weave);
        exposition.recount();

        let weave = exposition.weaves[&location.weave_id].clone();
        tx.stage(&exp_key, &exposition)?;
        tx.commit().await?;

        tracing::info!(
            exposition = %location.exposition_id,
            weave = %location.weave_id,
            tools = weave.tool_count,
            "weave tools saved"
        );
        Ok(weave)
    }

    /// Create a suggestion on `tool` for `selection`.
    ///
    /// The selected text of the stored `htmlSpan` is wrapped in a highlight
    /// marker. When the selection cannot be located in a single text node the
    /// suggestion is still saved and `marker_applied` is false. A tool the
    /// exposition record does not know yet is inserted into its weave.
    pub async fn add_suggestion(
        &self,
        tool: &Tool,
        selection: Selection,
        suggestion_text: impl Into<String>,
    ) -> Result<SuggestionAdded> {
        let span_id = selection.span_id.unwrap_or_else(new_span_id);
        let suggestion = Suggestion::new(tool, span_id, selection.text, suggestion_text.into());

        let map_key = suggestions_key(&tool.exposition_id, &tool.weave_id);
        let exp_key = exposition_key(&tool.exposition_id);
        let mut tx = self.store.transaction(&[&map_key, &exp_key]).await;

        let mut map: SuggestionMap = tx.load(&map_key).await?.unwrap_or_default();
        let list = map.entry(tool.id.clone()).or_default();
        list.push(suggestion.clone());
        let list = list.clone();

        let mut exposition = tx
            .load::<Exposition>(&exp_key)
            .await?
            .unwrap_or_else(|| Exposition::new(tool.exposition_id.as_str()));
        let weave = exposition
            .weaves
            .entry(tool.weave_id.clone())
            .or_insert_with(|| Weave::new(tool.weave_id.as_str(), tool.url.as_str()));

        if weave.tool(&tool.id).is_none() {
            weave.tools.push(tool.clone());
        }
        let Some(stored) = weave.tool_mut(&tool.id) else {
            return Err(MarginError::ToolNotFound(tool.id.clone()));
        };

        let wrapped = self.markers.wrap_selection(
            &stored.content.html_span,
            &NewMarker {
                span_id: &suggestion.span_id,
                suggestion_text: &suggestion.suggestion_text,
                selected_text: &suggestion.selected_text,
            },
        );
        let marker_applied = wrapped.is_some();
        if let Some(markup) = wrapped {
            stored.content.html_span = markup;
        }
        // The map is read under the same lock, so it is the complete list.
        stored.set_suggestions(list);
        let stored = stored.clone();
        exposition.recount();

        tx.stage(&map_key, &map)?;
        tx.stage(&exp_key, &exposition)?;
        tx.commit().await?;

        if !marker_applied {
            tracing::warn!(
                tool = %tool.id,
                span = %suggestion.span_id,
                "selection not found in a single text node, saved without marker"
            );
        }
        tracing::info!(tool = %tool.id, suggestion = %suggestion.id, "suggestion added");

        Ok(SuggestionAdded {
            suggestion,
            tool: stored,
            marker_applied,
        })
    }

    /// Remove one suggestion and unwrap its highlight marker.
    pub async fn delete_suggestion(
        &self,
        exposition_id: &str,
        weave_id: &str,
        tool_id: &str,
        suggestion_id: &str,
    ) -> Result<Suggestion> {
        let not_found = || MarginError::SuggestionNotFound(suggestion_id.to_string());

        let map_key = suggestions_key(exposition_id, weave_id);
        let exp_key = exposition_key(exposition_id);
        let mut tx = self.store.transaction(&[&map_key, &exp_key]).await;

        let mut map: SuggestionMap = tx.load(&map_key).await?.ok_or_else(not_found)?;
        let list = map.get_mut(tool_id).ok_or_else(not_found)?;
        let index = list
            .iter()
            .position(|s| s.id == suggestion_id)
            .ok_or_else(not_found)?;
        let removed = list.remove(index);
        let remaining = list.clone();
        if remaining.is_empty() {
            map.remove(tool_id);
        }
        tx.stage(&map_key, &map)?;

        if let Some(mut exposition) = tx.load::<Exposition>(&exp_key).await? {
            if let Some(tool) = exposition
                .weaves
                .get_mut(weave_id)
                .and_then(|w| w.tool_mut(tool_id))
            {
                if !removed.span_id.is_empty() {
                    tool.content.html_span =
                        self.markers.unwrap_span(&tool.content.html_span, &removed.span_id)?;
                }
                tool.set_suggestions(remaining);
            }
            exposition.recount();
            tx.stage(&exp_key, &exposition)?;
        }
        tx.commit().await?;

        tracing::info!(tool = %tool_id, suggestion = %suggestion_id, "suggestion deleted");
        Ok(removed)
    }

    /// Suggestions of an exposition, optionally narrowed to one weave and tool.
    ///
    /// Within a weave, suggestions come in page order of their tools.
    pub async fn list_suggestions(
        &self,
        exposition_id: &str,
        weave_id: Option<&str>,
        tool_id: Option<&str>,
    ) -> Result<Vec<Suggestion>> {
        let exposition = self.load_exposition(exposition_id).await?;

        let weave_ids: Vec<String> = match (weave_id, &exposition) {
            (Some(w), _) => vec![w.to_string()],
            (None, Some(exp)) => exp.weaves.keys().cloned().collect(),
            (None, None) => Vec::new(),
        };

        let mut out = Vec::new();
        for weave_id in weave_ids {
            let mut map = self.load_suggestion_map(exposition_id, &weave_id).await?;

            let page_order: Vec<String> = exposition
                .as_ref()
                .and_then(|exp| exp.weaves.get(&weave_id))
                .map(|w| w.tools.iter().map(|t| t.id.clone()).collect())
                .unwrap_or_default();

            let mut ordered = Vec::new();
            for id in page_order {
                if let Some(list) = map.remove(&id) {
                    ordered.push((id, list));
                }
            }
            ordered.extend(map);

            for (id, list) in ordered {
                if tool_id.map_or(true, |t| t == id) {
                    out.extend(list);
                }
            }
        }
        Ok(out)
    }
}

fn attach_from_map(map: &SuggestionMap, tools: &mut [Tool]) {
    for tool in tools {
        tool.set_suggestions(map.get(&tool.id).cloned().unwrap_or_default());
    }
}

/// Keep the stored highlighted markup when a fresh extraction lost it.
fn preserve_highlights(incoming: &mut Tool, stored: &Tool, markers: &HighlightMarkers) {
    if incoming.content.has_stored_spans() || !stored.content.has_stored_spans() {
        return;
    }

    let matches_new = markers
        .strip(&stored.content.html_span)
        .map(|stripped| stripped == incoming.content.html)
        .unwrap_or(false);
    if !matches_new {
        tracing::warn!(
            tool = %incoming.id,
            "content changed since highlights were saved, keeping stored highlighted markup"
        );
    }

    incoming.content.html_span = stored.content.html_span.clone();
}
