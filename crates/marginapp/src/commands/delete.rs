use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;

/// Delete one suggestion of a tool and unwrap its highlight.
pub async fn run<B: StorageBackend>(
    repo: &Repository<B>,
    exposition_id: &str,
    weave_id: &str,
    tool_id: &str,
    suggestion_id: &str,
) -> Result<CmdResult> {
    let removed = repo
        .delete_suggestion(exposition_id, weave_id, tool_id, suggestion_id)
        .await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Deleted suggestion on \"{}\"",
        removed.selected_text
    )));
    Ok(result.with_suggestions(vec![removed]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session};
    use crate::error::MarginError;
    use crate::model::Selection;

    #[tokio::test]
    async fn test_delete_removes_suggestion() {
        let repo = repo();
        let mut session = session();
        session.enhance(&repo).await.unwrap();
        let added = session
            .add_suggestion(&repo, "t2", Selection::new("lazy"), "sleepy")
            .await
            .unwrap();

        let result = run(&repo, "100", "200", "t2", &added.suggestion.id).await.unwrap();
        assert_eq!(result.suggestions[0].id, added.suggestion.id);

        let exp = repo.load_exposition("100").await.unwrap().unwrap();
        assert_eq!(exp.suggestion_count, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown() {
        let repo = repo();
        let res = run(&repo, "100", "200", "t2", "missing").await;
        assert!(matches!(res, Err(MarginError::SuggestionNotFound(_))));
    }
}
