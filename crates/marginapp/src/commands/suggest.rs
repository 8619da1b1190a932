use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::Selection;
use crate::page::HostPage;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use crate::view::PageSession;

/// Attach a suggestion to the selected text of one tool.
///
/// Works in both view modes: the tool comes from the live page in normal
/// mode and from the snapshot cache in text-only mode.
pub async fn run<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
    tool_id: &str,
    selection: Selection,
    suggestion_text: String,
) -> Result<CmdResult> {
    let added = session
        .add_suggestion(repo, tool_id, selection, suggestion_text)
        .await?;

    let mut result = CmdResult::default();
    if added.marker_applied {
        result.add_message(CmdMessage::success(format!(
            "Suggestion added to {}",
            tool_id
        )));
    } else {
        result.add_message(CmdMessage::warning(format!(
            "Suggestion saved, but \"{}\" could not be highlighted in {}",
            added.suggestion.selected_text, tool_id
        )));
    }
    Ok(result.with_suggestions(vec![added.suggestion]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session};
    use crate::commands::MessageLevel;
    use crate::error::MarginError;

    #[tokio::test]
    async fn test_suggest_highlights_selection() {
        let repo = repo();
        let mut session = session();
        session.enhance(&repo).await.unwrap();

        let result = run(&mut session, &repo, "t1", Selection::new("brown"), "red".into())
            .await
            .unwrap();
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].suggestion_text, "red");
        assert!(result.has_level(MessageLevel::Success));

        let region = session.page().region("t1").unwrap();
        assert!(region.binding(&result.suggestions[0].span_id).is_some());
    }

    #[tokio::test]
    async fn test_suggest_unlocatable_selection_warns() {
        let repo = repo();
        let mut session = session();
        let result = run(&mut session, &repo, "t1", Selection::new("not there"), "x".into())
            .await
            .unwrap();
        assert!(result.has_level(MessageLevel::Warning));
        assert_eq!(repo.list_suggestions("100", None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_suggest_unknown_tool() {
        let repo = repo();
        let mut session = session();
        let res = run(&mut session, &repo, "zz", Selection::new("x"), "y".into()).await;
        assert!(matches!(res, Err(MarginError::ToolNotFound(_))));
    }
}
