use crate::commands::{CmdMessage, CmdResult};
use crate::error::{MarginError, Result};
use crate::export::build_document;
use crate::page::HostPage;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use crate::view::PageSession;

/// Store every tool of the page and produce the exposition's export document.
///
/// A page without discoverable tools yields an info message and no document.
pub async fn run<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    match save_page(session, repo).await {
        Ok(result) => Ok(result),
        Err(MarginError::NoContentFound) => {
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::info(MarginError::NoContentFound.to_string()));
            Ok(result)
        }
        Err(e) => Err(e),
    }
}

async fn save_page<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    if session.page().regions().is_empty() && session.state().cached_tools().is_empty() {
        return Err(MarginError::NoContentFound);
    }

    let report = session.enhance(repo).await?;
    let exposition_id = session.page().location().exposition_id.clone();
    let document = build_document(repo, &exposition_id).await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Saved {} tools ({} suggestions) in exposition {}",
        report.weave.tool_count, report.weave.suggestion_count, exposition_id
    )));
    Ok(result.with_weave(report.weave).with_document(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session, session_with};
    use crate::commands::MessageLevel;

    #[tokio::test]
    async fn test_save_produces_document() {
        let repo = repo();
        let mut session = session();
        let result = run(&mut session, &repo).await.unwrap();

        let doc = result.document.as_ref().unwrap();
        assert_eq!(doc.exposition.id, "100");
        assert_eq!(doc.exposition.total_tools, 2);
        assert!(result.has_level(MessageLevel::Success));
    }

    #[tokio::test]
    async fn test_save_without_content_is_info() {
        let repo = repo();
        let mut session = session_with(vec![]);
        let result = run(&mut session, &repo).await.unwrap();

        assert!(result.document.is_none());
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].level, MessageLevel::Info);
        assert!(repo.list_expositions().await.unwrap().is_empty());
    }
}
