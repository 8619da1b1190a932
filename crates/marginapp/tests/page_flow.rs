//! End-to-end flows over the filesystem backend.

use marginapp::api::MarginApi;
use marginapp::config::MarginConfig;
use marginapp::markup::HighlightMarkers;
use marginapp::model::{Exposition, Selection};
use marginapp::page::{HostPage, MemoryPage, PageCapture, RegionHandle};
use marginapp::store::fs_backend::FsBackend;
use marginapp::view::ViewMode;
use tempfile::TempDir;

const CAPTURE: &str = r#"{
    "expositionId": "3001",
    "weaveId": "3002",
    "url": "https://example.org/view/3001/3002",
    "pageTitle": "Field notes",
    "regions": [
        {"id": "tool-a", "type": "tool-text", "title": "Intro",
         "textMarkup": "<p>The river bends <em>twice</em> before the mill.</p>"},
        {"id": "tool-b", "type": "tool-image"},
        {"id": "tool-c", "type": "tool-text",
         "textMarkup": "<p>Notes &amp; sketches from the bank.</p>"}
    ]
}"#;

fn api(dir: &TempDir) -> MarginApi<FsBackend> {
    MarginApi::new(FsBackend::new(dir.path().to_path_buf()), MarginConfig::default()).unwrap()
}

fn page() -> MemoryPage {
    serde_json::from_str::<PageCapture>(CAPTURE).unwrap().into()
}

fn assert_html_matches_stripped_span(exposition: &Exposition) {
    let markers = HighlightMarkers::default();
    for weave in exposition.weaves.values() {
        for tool in &weave.tools {
            assert_eq!(
                markers.strip(&tool.content.html_span).unwrap(),
                tool.content.html,
                "tool {}",
                tool.id
            );
        }
    }
}

#[tokio::test]
async fn test_suggestions_survive_a_fresh_visit() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir);

    let mut session = api.open_page(page());
    api.enhance_page(&mut session).await.unwrap();
    api.add_suggestion(
        &mut session,
        "tool-a",
        Selection::new("bends"),
        "curves".into(),
    )
    .await
    .unwrap();

    // A new visit: the host renders the original markup again, no markers.
    let api = self::api(&dir);
    let mut session = api.open_page(page());
    let result = api.enhance_page(&mut session).await.unwrap();
    assert_eq!(result.weave.unwrap().suggestion_count, 1);

    let region = session.page().region("tool-a").unwrap();
    assert!(HighlightMarkers::default()
        .has_highlights(region.live_markup())
        .unwrap());
    assert_eq!(region.bindings.len(), 1);
    assert_eq!(region.bindings[0].suggestion_text.as_deref(), Some("curves"));

    let exposition = api
        .repository()
        .load_exposition("3001")
        .await
        .unwrap()
        .unwrap();
    assert_html_matches_stripped_span(&exposition);
}

#[tokio::test]
async fn test_export_import_round_trip_between_stores() {
    let source_dir = TempDir::new().unwrap();
    let source = api(&source_dir);
    let mut session = source.open_page(page());
    source.enhance_page(&mut session).await.unwrap();
    source
        .add_suggestion(&mut session, "tool-a", Selection::new("mill"), "bakery".into())
        .await
        .unwrap();
    source
        .add_suggestion(&mut session, "tool-c", Selection::new("sketches"), "drawings".into())
        .await
        .unwrap();

    let saved = source.save_page(&mut session).await.unwrap();
    let raw = serde_json::to_string_pretty(&saved.document.unwrap()).unwrap();

    let target_dir = TempDir::new().unwrap();
    let target = api(&target_dir);
    let first = target.import_document(&raw, None).await.unwrap();
    assert_eq!(first.merge.unwrap().suggestions_added, 2);

    let second = target.import_document(&raw, None).await.unwrap();
    let report = second.merge.unwrap();
    assert_eq!(report.suggestions_added, 0);
    assert_eq!(report.duplicates_skipped, 2);

    let listed = target.list_suggestions("3001", None, None).await.unwrap();
    let texts: Vec<_> = listed
        .suggestions
        .iter()
        .map(|s| s.suggestion_text.as_str())
        .collect();
    assert_eq!(texts, vec!["bakery", "drawings"]);

    let exposition = target
        .repository()
        .load_exposition("3001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exposition.suggestion_count, 2);
    assert_html_matches_stripped_span(&exposition);
}

#[tokio::test]
async fn test_text_only_round_trip_on_disk() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir);
    let mut session = api.open_page(page());
    api.enhance_page(&mut session).await.unwrap();

    let before: Vec<String> = session.page().regions().iter().map(|r| r.id.clone()).collect();
    let status_before = api.status().await.unwrap();

    let entered = api.toggle_view(&mut session).await.unwrap();
    assert_eq!(entered.mode, Some(ViewMode::TextOnly));
    let listing = entered.listing.unwrap();
    assert_eq!(listing.items.len(), 2);
    assert_eq!(listing.items[1].plain_text, "Notes & sketches from the bank.");

    let left = api.toggle_view(&mut session).await.unwrap();
    assert_eq!(left.mode, Some(ViewMode::Normal));
    let after: Vec<String> = session.page().regions().iter().map(|r| r.id.clone()).collect();
    assert_eq!(before, after);

    let status_after = api.status().await.unwrap();
    assert_eq!(
        status_before.expositions[0].tool_count,
        status_after.expositions[0].tool_count
    );
    assert_eq!(
        status_before.expositions[0].suggestion_count,
        status_after.expositions[0].suggestion_count
    );
}

#[tokio::test]
async fn test_anti_data_loss_on_disk() {
    let dir = TempDir::new().unwrap();
    let api = api(&dir);

    let capture = r#"{"expositionId": "1", "weaveId": "1",
        "regions": [{"id": "t", "type": "tool-text", "textMarkup": "a<mark>b</mark>c"}]}"#;
    let marked: MemoryPage = serde_json::from_str::<PageCapture>(capture).unwrap().into();
    let mut session = api.open_page(marked);
    api.enhance_page(&mut session).await.unwrap();

    let plain = capture.replace("a<mark>b</mark>c", "abc");
    let unmarked: MemoryPage = serde_json::from_str::<PageCapture>(&plain).unwrap().into();
    let mut session = api.open_page(unmarked);
    api.enhance_page(&mut session).await.unwrap();

    let exposition = api.repository().load_exposition("1").await.unwrap().unwrap();
    let tool = &exposition.weaves["1"].tools[0];
    assert_eq!(tool.content.html, "abc");
    assert_eq!(tool.content.html_span, "a<mark>b</mark>c");
}
