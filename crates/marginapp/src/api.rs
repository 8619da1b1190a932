//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the
//! single entry point for every margin operation, whatever the client.
//!
//! The facade:
//! - **Dispatches** to the appropriate command function
//! - **Owns** the repository and the resolved configuration
//! - **Opens** page sessions configured with the same highlight markers and
//!   re-enhancement interval the repository uses
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no business logic (that belongs in `commands/*.rs`) and no I/O.
//!
//! ## Generic Over StorageBackend
//!
//! `MarginApi<B: StorageBackend>`:
//! - Production: `MarginApi<FsBackend>`
//! - Testing: `MarginApi<MemBackend>`

use crate::commands::{self, CmdResult};
use crate::config::MarginConfig;
use crate::error::Result;
use crate::model::Selection;
use crate::page::HostPage;
use crate::repository::Repository;
use crate::store::backend::StorageBackend;
use crate::store::JsonStore;
use crate::view::PageSession;

pub struct MarginApi<B: StorageBackend> {
    repo: Repository<B>,
    config: MarginConfig,
}

impl<B: StorageBackend> MarginApi<B> {
    /// Build the API over `backend`. Fails on an invalid highlight configuration.
    pub fn new(backend: B, config: MarginConfig) -> Result<Self> {
        let markers = config.markers()?;
        Ok(Self {
            repo: Repository::new(JsonStore::with_backend(backend), markers),
            config,
        })
    }

    pub fn repository(&self) -> &Repository<B> {
        &self.repo
    }

    pub fn config(&self) -> &MarginConfig {
        &self.config
    }

    /// Start a session on a host page. Nothing is captured until first use.
    pub fn open_page<P: HostPage>(&self, page: P) -> PageSession<P> {
        PageSession::new(
            page,
            self.repo.markers().clone(),
            self.config.reenhance_interval(),
        )
    }

    pub async fn enhance_page<P: HostPage>(&self, session: &mut PageSession<P>) -> Result<CmdResult> {
        commands::enhance::run(session, &self.repo).await
    }

    pub async fn page_mutated<P: HostPage>(&self, session: &mut PageSession<P>) -> Result<CmdResult> {
        commands::enhance::after_mutation(session, &self.repo).await
    }

    pub async fn save_page<P: HostPage>(&self, session: &mut PageSession<P>) -> Result<CmdResult> {
        commands::save::run(session, &self.repo).await
    }

    pub async fn add_suggestion<P: HostPage>(
        &self,
        session: &mut PageSession<P>,
        tool_id: &str,
        selection: Selection,
        suggestion_text: String,
    ) -> Result<CmdResult> {
        commands::suggest::run(session, &self.repo, tool_id, selection, suggestion_text).await
    }

    pub async fn toggle_view<P: HostPage>(&self, session: &mut PageSession<P>) -> Result<CmdResult> {
        commands::view::toggle(session, &self.repo).await
    }

    pub async fn text_only_view<P: HostPage>(
        &self,
        session: &mut PageSession<P>,
    ) -> Result<CmdResult> {
        commands::view::enter_text_only(session, &self.repo).await
    }

    pub async fn list_suggestions(
        &self,
        exposition_id: &str,
        weave_id: Option<&str>,
        tool_id: Option<&str>,
    ) -> Result<CmdResult> {
        commands::list::run(&self.repo, exposition_id, weave_id, tool_id).await
    }

    pub async fn delete_suggestion(
        &self,
        exposition_id: &str,
        weave_id: &str,
        tool_id: &str,
        suggestion_id: &str,
    ) -> Result<CmdResult> {
        commands::delete::run(&self.repo, exposition_id, weave_id, tool_id, suggestion_id).await
    }

    pub async fn export_exposition(&self, exposition_id: &str) -> Result<CmdResult> {
        commands::export::run(&self.repo, exposition_id).await
    }

    pub async fn import_document(&self, raw: &str, target: Option<&str>) -> Result<CmdResult> {
        commands::import::run(&self.repo, raw, target).await
    }

    pub async fn status(&self) -> Result<CmdResult> {
        commands::status::run(&self.repo).await
    }
}
