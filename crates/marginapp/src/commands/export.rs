use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::export::build_document;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;

/// Produce the export document of a stored exposition.
pub async fn run<B: StorageBackend>(repo: &Repository<B>, exposition_id: &str) -> Result<CmdResult> {
    let document = build_document(repo, exposition_id).await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Exported {} weaves, {} tools, {} suggestions",
        document.exposition.total_weaves,
        document.exposition.total_tools,
        document.exposition.total_suggestions
    )));
    Ok(result.with_document(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session};
    use crate::error::MarginError;

    #[tokio::test]
    async fn test_export_after_enhance() {
        let repo = repo();
        let mut session = session();
        session.enhance(&repo).await.unwrap();

        let result = run(&repo, "100").await.unwrap();
        assert_eq!(result.document.unwrap().exposition.total_tools, 2);
    }

    #[tokio::test]
    async fn test_export_unknown_exposition() {
        let res = run(&repo(), "404").await;
        assert!(matches!(res, Err(MarginError::NoContentFound)));
    }
}
