use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;

/// List the suggestions of an exposition, optionally narrowed to a weave and tool.
pub async fn run<B: StorageBackend>(
    repo: &Repository<B>,
    exposition_id: &str,
    weave_id: Option<&str>,
    tool_id: Option<&str>,
) -> Result<CmdResult> {
    let suggestions = repo
        .list_suggestions(exposition_id, weave_id, tool_id)
        .await?;

    let mut result = CmdResult::default();
    if suggestions.is_empty() {
        result.add_message(CmdMessage::info("No suggestions found"));
    }
    Ok(result.with_suggestions(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session};
    use crate::model::Selection;

    #[tokio::test]
    async fn test_list_by_tool() {
        let repo = repo();
        let mut session = session();
        session.enhance(&repo).await.unwrap();
        session
            .add_suggestion(&repo, "t1", Selection::new("quick"), "slow")
            .await
            .unwrap();
        session
            .add_suggestion(&repo, "t2", Selection::new("dog"), "cat")
            .await
            .unwrap();

        let all = run(&repo, "100", None, None).await.unwrap();
        assert_eq!(all.suggestions.len(), 2);

        let t2 = run(&repo, "100", Some("200"), Some("t2")).await.unwrap();
        assert_eq!(t2.suggestions.len(), 1);
        assert_eq!(t2.suggestions[0].suggestion_text, "cat");
    }

    #[tokio::test]
    async fn test_list_empty_has_message() {
        let result = run(&repo(), "100", None, None).await.unwrap();
        assert!(result.suggestions.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
