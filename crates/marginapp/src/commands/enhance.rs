use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::page::HostPage;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use crate::view::{EnhanceReport, PageSession};

/// Discover, store and reconcile every region of the page.
pub async fn run<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    let report = session.enhance(repo).await?;
    Ok(report_result(report))
}

/// Enhance after a page mutation, unless throttled.
pub async fn after_mutation<P: HostPage, B: StorageBackend>(
    session: &mut PageSession<P>,
    repo: &Repository<B>,
) -> Result<CmdResult> {
    match session.reenhance(repo).await? {
        Some(report) => Ok(report_result(report)),
        None => {
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::info("Re-enhancement skipped (throttled)"));
            Ok(result)
        }
    }
}

fn report_result(report: EnhanceReport) -> CmdResult {
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Found {} tools, {} suggestions",
        report.weave.tool_count, report.weave.suggestion_count
    )));
    if report.restored > 0 {
        result.add_message(CmdMessage::info(format!(
            "Restored highlights in {} tools",
            report.restored
        )));
    }
    result.with_weave(report.weave)
}
