//! Export document construction.
//!
//! The document embeds full suggestion records under
//! `weaves[].tools[].suggestions[]`; [`crate::merge`] reads the same shape
//! back.

use crate::error::{MarginError, Result};
use crate::model::ExportDocument;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use chrono::{DateTime, Utc};

/// Build the export document of a stored exposition.
///
/// Suggestion lists come from the per-weave suggestion store, so the document
/// reflects every saved suggestion even for tools whose embedded copy is
/// stale.
pub async fn build_document<B: StorageBackend>(
    repo: &Repository<B>,
    exposition_id: &str,
) -> Result<ExportDocument> {
    let mut exposition = repo
        .load_exposition(exposition_id)
        .await?
        .ok_or(MarginError::NoContentFound)?;

    for weave in exposition.weaves.values_mut() {
        repo.attach_suggestions(exposition_id, &weave.weave_id, &mut weave.tools)
            .await?;
    }
    exposition.recount();

    Ok(ExportDocument::from_exposition(&exposition))
}

/// Default file name for an export written at `at`.
pub fn export_file_name(exposition_id: &str, at: DateTime<Utc>) -> String {
    let safe: String = exposition_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("margin-{}-{}.json", safe, at.format("%Y%m%d-%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_tool;
    use crate::markup::HighlightMarkers;
    use crate::model::Selection;
    use crate::page::{PageLocation, Region};
    use crate::store::mem_backend::MemBackend;
    use crate::store::JsonStore;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_build_document_totals_and_embedded_suggestions() {
        let repo = Repository::new(
            JsonStore::with_backend(MemBackend::new()),
            HighlightMarkers::default(),
        );
        let location = PageLocation::new("7", "1");
        let region = Region::new("t", "tool-text").with_text_markup("<p>hello world</p>");
        let tool = extract_tool(&region, &location, repo.markers());
        repo.upsert_weave_tools(&location, vec![tool.clone()]).await.unwrap();
        repo.add_suggestion(&tool, Selection::new("world"), "planet").await.unwrap();

        let doc = build_document(&repo, "7").await.unwrap();
        assert_eq!(doc.exposition.id, "7");
        assert_eq!(doc.exposition.total_weaves, 1);
        assert_eq!(doc.exposition.total_tools, 1);
        assert_eq!(doc.exposition.total_suggestions, 1);

        let json = serde_json::to_value(&doc).unwrap();
        let embedded = &json["weaves"]["1"]["tools"][0]["suggestions"][0];
        assert_eq!(embedded["suggestionText"], "planet");
        assert!(json["exposition"].get("exportTimestamp").is_some());
    }

    #[tokio::test]
    async fn test_build_document_for_missing_exposition() {
        let repo = Repository::new(
            JsonStore::with_backend(MemBackend::new()),
            HighlightMarkers::default(),
        );
        let res = build_document(&repo, "nope").await;
        assert!(matches!(res, Err(MarginError::NoContentFound)));
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(export_file_name("12/3", at), "margin-12_3-20240309-140500.json");
    }
}
