use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::page::HostPage;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use crate::view::{PageSession, ViewMode};

/// Switch to the text-only listing.
pub async fn enter_text_only<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    let listing = session.enter_text_only(repo).await?;
    let mut result = CmdResult::default();
    if listing.items.is_empty() {
        result.add_message(CmdMessage::info("No text content on this page"));
    }
    result.listing = Some(listing);
    result.mode = Some(ViewMode::TextOnly);
    Ok(result)
}

/// Restore the original page.
///
/// Fails with [`crate::error::MarginError::RestoreFailure`] when no original
/// structure was captured; the client should offer a full reload.
pub async fn leave_text_only<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    let report = session.leave_text_only(repo).await?;
    let mut result = CmdResult::default().with_weave(report.weave);
    result.mode = Some(ViewMode::Normal);
    Ok(result)
}

pub async fn toggle<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    match session.mode() {
        ViewMode::Normal => enter_text_only(session, repo).await,
        ViewMode::TextOnly => leave_text_only(session, repo).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{repo, session, session_with};
    use crate::page::Region;

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let repo = repo();
        let mut session = session();
        session.enhance(&repo).await.unwrap();

        let result = toggle(&mut session, &repo).await.unwrap();
        assert_eq!(result.mode, Some(ViewMode::TextOnly));
        assert_eq!(result.listing.unwrap().items.len(), 2);

        let result = toggle(&mut session, &repo).await.unwrap();
        assert_eq!(result.mode, Some(ViewMode::Normal));
        assert_eq!(result.weave.unwrap().tool_count, 2);
    }

    #[tokio::test]
    async fn test_text_only_without_text_regions() {
        let repo = repo();
        let mut session = session_with(vec![Region::new("pic", "tool-picture")]);
        let result = enter_text_only(&mut session, &repo).await.unwrap();
        assert!(result.listing.unwrap().items.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
