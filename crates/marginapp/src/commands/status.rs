use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;

/// Overview of every stored exposition.
pub async fn run<B: StorageBackend>(repo: &Repository<B>) -> Result<CmdResult> {
    let expositions = repo.list_expositions().await?;

    let mut result = CmdResult::default();
    if expositions.is_empty() {
        result.add_message(CmdMessage::info("No expositions stored yet"));
    }
    result.expositions = expositions;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session};
    use crate::model::Selection;

    #[tokio::test]
    async fn test_status_summarizes() {
        let repo = repo();
        let mut session = session();
        session.enhance(&repo).await.unwrap();
        session
            .add_suggestion(&repo, "t1", Selection::new("quick"), "slow")
            .await
            .unwrap();

        let result = run(&repo).await.unwrap();
        assert_eq!(result.expositions.len(), 1);
        let summary = &result.expositions[0];
        assert_eq!(summary.weave_count, 1);
        assert_eq!(summary.tool_count, 2);
        assert_eq!(summary.suggestion_count, 1);
    }

    #[tokio::test]
    async fn test_status_empty() {
        let result = run(&repo()).await.unwrap();
        assert!(result.expositions.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
