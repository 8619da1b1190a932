//! # Import and Merge
//!
//! An export document is validated as a whole before anything is written, so
//! a malformed file never leaves a partial merge behind.
//!
//! Merging into a target exposition, per imported weave:
//!
//! - weave unknown locally: stored as is, re-keyed to the target
//!   exposition. Suggestions keep their ids and get `importedAt`.
//! - tool unknown in a known weave: inserted whole, same treatment.
//! - tool known locally: only its suggestions are merged. A suggestion whose
//!   `selectedText` and `suggestionText` both equal those of one already
//!   present is a duplicate and dropped. Others get a fresh id and
//!   `importedAt`; `spanId` and the rest are kept, and the selection is
//!   wrapped in a marker in the local `htmlSpan` when it can be located.
//!
//! Importing the same document twice changes nothing the second time.
//! Afterwards the per-weave suggestion map of every touched weave is
//! rebuilt from the merged tool lists. Map entries for tools the weave does
//! not list are kept, with a warning.

use crate::error::{MarginError, Result};
use crate::markup::{HighlightMarkers, NewMarker};
use crate::model::{
    exposition_key, suggestions_key, ExportDocument, ExportHeader, Exposition, Suggestion,
    SuggestionMap, Tool, Weave,
};
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub exposition_id: String,
    pub weaves_created: usize,
    pub tools_inserted: usize,
    pub suggestions_added: usize,
    pub duplicates_skipped: usize,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.weaves_created == 0 && self.tools_inserted == 0 && self.suggestions_added == 0
    }
}

/// Parse and validate an export document.
///
/// The exposition id is read from `exposition.id`, or from a top-level
/// `expositionId` as older exports wrote it.
pub fn parse_document(raw: &str) -> Result<ExportDocument> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| MarginError::InvalidFormat(format!("not JSON: {}", e)))?;

    let exposition_id = value
        .get("exposition")
        .and_then(|e| e.get("id"))
        .or_else(|| value.get("expositionId"))
        .and_then(id_string)
        .ok_or_else(|| MarginError::InvalidFormat("missing exposition id".to_string()))?;

    let weaves = value
        .get("weaves")
        .filter(|w| w.is_object())
        .cloned()
        .ok_or_else(|| MarginError::InvalidFormat("missing weaves".to_string()))?;
    let weaves: BTreeMap<String, Weave> = serde_json::from_value(weaves)
        .map_err(|e| MarginError::InvalidFormat(format!("bad weave record: {}", e)))?;

    let export_timestamp = value
        .get("exposition")
        .and_then(|e| e.get("exportTimestamp"))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let total_tools = weaves.values().map(|w| w.tools.len()).sum();
    let total_suggestions = weaves
        .values()
        .flat_map(|w| w.tools.iter())
        .map(|t| t.suggestions.len())
        .sum();

    Ok(ExportDocument {
        exposition: ExportHeader {
            id: exposition_id,
            export_timestamp,
            total_weaves: weaves.len(),
            total_tools,
            total_suggestions,
        },
        weaves,
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merge `doc` into the exposition `target` (the document's own id if `None`).
///
/// The exposition and the suggestion maps of every imported weave are locked
/// together and written in one transaction.
pub async fn merge_into<B: StorageBackend>(
    repo: &Repository<B>,
    doc: ExportDocument,
    target: Option<&str>,
) -> Result<MergeReport> {
    let target = target.unwrap_or(&doc.exposition.id).to_string();
    let markers = repo.markers();
    let now = Utc::now();

    let exp_key = exposition_key(&target);
    let map_keys: Vec<(String, String)> = doc
        .weaves
        .keys()
        .map(|w| (w.clone(), suggestions_key(&target, w)))
        .collect();
    let mut keys: Vec<&str> = map_keys.iter().map(|(_, k)| k.as_str()).collect();
    keys.push(&exp_key);
    let mut tx = repo.store().transaction(&keys).await;

    let mut exposition = tx
        .load::<Exposition>(&exp_key)
        .await?
        .unwrap_or_else(|| Exposition::new(target.as_str()));
    let mut report = MergeReport {
        exposition_id: target.clone(),
        ..MergeReport::default()
    };

    for (weave_id, imported) in doc.weaves {
        match exposition.weaves.get_mut(&weave_id) {
            None => {
                let weave = rekey_weave(imported, &target, &weave_id, now);
                report.weaves_created += 1;
                report.suggestions_added +=
                    weave.tools.iter().map(|t| t.suggestions.len()).sum::<usize>();
                exposition.weaves.insert(weave_id, weave);
            }
            Some(local) => {
                for tool in imported.tools {
                    merge_tool(local, tool, &target, now, markers, &mut report)?;
                }
            }
        }
    }
    exposition.recount();

    for (weave_id, map_key) in &map_keys {
        let Some(weave) = exposition.weaves.get(weave_id) else {
            continue;
        };
        let stored: SuggestionMap = tx.load(map_key).await?.unwrap_or_default();
        let map = rebuild_suggestion_map(weave, stored);
        tx.stage(map_key, &map)?;
    }
    tx.stage(&exp_key, &exposition)?;
    tx.commit().await?;

    tracing::info!(
        exposition = %target,
        weaves_created = report.weaves_created,
        tools_inserted = report.tools_inserted,
        suggestions_added = report.suggestions_added,
        duplicates_skipped = report.duplicates_skipped,
        "import merged"
    );
    Ok(report)
}

/// The suggestion map of `weave` after a merge.
///
/// Entries of `stored` for tools the weave no longer lists are kept as they
/// are; the weave record cannot vouch for them.
fn rebuild_suggestion_map(weave: &Weave, stored: SuggestionMap) -> SuggestionMap {
    let mut map = weave.suggestion_map();
    for (tool_id, list) in stored {
        if weave.tool(&tool_id).is_some() {
            continue;
        }
        tracing::warn!(
            weave = %weave.weave_id,
            tool = %tool_id,
            suggestions = list.len(),
            "suggestions stored for a tool missing from the weave, keeping them"
        );
        map.insert(tool_id, list);
    }
    map
}

fn merge_tool(
    local: &mut Weave,
    imported: Tool,
    target: &str,
    now: DateTime<Utc>,
    markers: &HighlightMarkers,
    report: &mut MergeReport,
) -> Result<()> {
    let weave_id = local.weave_id.clone();
    let Some(existing) = local.tool_mut(&imported.id) else {
        let tool = rekey_tool(imported, target, &weave_id, now);
        report.tools_inserted += 1;
        report.suggestions_added += tool.suggestions.len();
        local.tools.push(tool);
        return Ok(());
    };

    for suggestion in imported.suggestions {
        if existing.suggestions.iter().any(|s| s.is_duplicate_of(&suggestion)) {
            report.duplicates_skipped += 1;
            continue;
        }

        let fresh = Suggestion {
            id: Uuid::new_v4().to_string(),
            tool_id: existing.id.clone(),
            exposition_id: target.to_string(),
            weave_id: weave_id.clone(),
            imported_at: Some(now),
            ..suggestion
        };

        let already_marked = fresh.span_id.is_empty()
            || markers
                .markers(&existing.content.html_span)?
                .iter()
                .any(|m| m.span_id.as_deref() == Some(fresh.span_id.as_str()));
        if !already_marked {
            if let Some(markup) = markers.wrap_selection(
                &existing.content.html_span,
                &NewMarker {
                    span_id: &fresh.span_id,
                    suggestion_text: &fresh.suggestion_text,
                    selected_text: &fresh.selected_text,
                },
            ) {
                existing.content.html_span = markup;
            }
        }

        existing.suggestions.push(fresh);
        report.suggestions_added += 1;
    }
    Ok(())
}

fn rekey_weave(mut weave: Weave, target: &str, weave_id: &str, now: DateTime<Utc>) -> Weave {
    weave.weave_id = weave_id.to_string();
    weave.tools = weave
        .tools
        .into_iter()
        .map(|tool| rekey_tool(tool, target, weave_id, now))
        .collect();
    weave
}

fn rekey_tool(mut tool: Tool, target: &str, weave_id: &str, now: DateTime<Utc>) -> Tool {
    tool.exposition_id = target.to_string();
    tool.weave_id = weave_id.to_string();
    for suggestion in &mut tool.suggestions {
        suggestion.tool_id = tool.id.clone();
        suggestion.exposition_id = target.to_string();
        suggestion.weave_id = weave_id.to_string();
        suggestion.imported_at = Some(now);
    }
    tool
}
