use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::merge::{merge_into, parse_document};
use crate::repository::Repository;
use crate::store::backend::StorageBackend;

/// Merge a raw export document into `target` (or the document's own exposition).
///
/// The document is validated in full before anything is written.
pub async fn run<B: StorageBackend>(
    repo: &Repository<B>,
    raw: &str,
    target: Option<&str>,
) -> Result<CmdResult> {
    let document = parse_document(raw)?;
    let report = merge_into(repo, document, target).await?;

    let mut result = CmdResult::default();
    if report.is_noop() {
        result.add_message(CmdMessage::info(format!(
            "Nothing new to import into exposition {}",
            report.exposition_id
        )));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Imported {} suggestions into exposition {}",
            report.suggestions_added, report.exposition_id
        )));
    }
    if report.duplicates_skipped > 0 {
        result.add_message(CmdMessage::info(format!(
            "Skipped {} duplicate suggestions",
            report.duplicates_skipped
        )));
    }
    result.merge = Some(report);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session};
    use crate::commands::MessageLevel;
    use crate::error::MarginError;
    use crate::export::build_document;
    use crate::model::Selection;

    #[tokio::test]
    async fn test_import_twice_reports_duplicates() {
        let source = repo();
        let mut session = session();
        session.enhance(&source).await.unwrap();
        session
            .add_suggestion(&source, "t1", Selection::new("fox"), "hound")
            .await
            .unwrap();
        let raw = serde_json::to_string(&build_document(&source, "100").await.unwrap()).unwrap();

        let target = repo();
        let first = run(&target, &raw, None).await.unwrap();
        assert!(first.has_level(MessageLevel::Success));
        assert_eq!(first.merge.unwrap().suggestions_added, 1);

        let second = run(&target, &raw, None).await.unwrap();
        assert!(!second.has_level(MessageLevel::Success));
        assert_eq!(second.merge.unwrap().duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn test_import_invalid_document() {
        let res = run(&repo(), r#"{"weaves": {}}"#, None).await;
        assert!(matches!(res, Err(MarginError::InvalidFormat(_))));
    }
}
