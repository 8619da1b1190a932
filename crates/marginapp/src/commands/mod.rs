//! # Command Layer
//!
//! Each user-facing action lives in its own submodule as a plain async
//! function over the [`Repository`](crate::repository::Repository) and, for
//! page actions, a [`PageSession`](crate::view::PageSession).
//!
//! Commands are UI-agnostic:
//! - no stdout/stderr, no prompts, no exit codes
//! - they return a structured [`CmdResult`] and let the client render it
//!
//! Expected conditions that are not failures from the user's point of view
//! (e.g. saving a page without content) become messages, not errors.
//!
//! ## Command Modules
//!
//! - [`enhance`]: discover, store and reconcile a page; throttled re-enhance
//! - [`save`]: enhance then produce the export document
//! - [`suggest`]: create a suggestion on one tool
//! - [`delete`]: delete a suggestion
//! - [`list`]: view suggestions
//! - [`export`]: export a stored exposition
//! - [`import`]: merge an export document
//! - [`view`]: text-only view toggling
//! - [`status`]: overview of stored expositions

use crate::merge::MergeReport;
use crate::model::{ExportDocument, ExpositionSummary, Suggestion, Weave};
use crate::view::{TextOnlyListing, ViewMode};
use serde::Serialize;

pub mod delete;
pub mod enhance;
pub mod export;
pub mod import;
pub mod list;
pub mod save;
pub mod status;
pub mod suggest;
pub mod view;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Suggestions created, deleted or listed by the command.
    pub suggestions: Vec<Suggestion>,
    /// The weave as stored after an enhancement.
    pub weave: Option<Weave>,
    pub expositions: Vec<ExpositionSummary>,
    pub document: Option<ExportDocument>,
    pub merge: Option<MergeReport>,
    pub listing: Option<TextOnlyListing>,
    pub mode: Option<ViewMode>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_suggestions(mut self, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_weave(mut self, weave: Weave) -> Self {
        self.weave = Some(weave);
        self
    }

    pub fn with_document(mut self, document: ExportDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn has_level(&self, level: MessageLevel) -> bool {
        self.messages.iter().any(|m| m.level == level)
    }
}

/// Shared fixtures for command tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::markup::HighlightMarkers;
    use crate::page::{MemoryPage, PageLocation, Region};
    use crate::repository::Repository;
    use crate::store::mem_backend::MemBackend;
    use crate::store::JsonStore;
    use crate::view::PageSession;
    use std::time::Duration;

    pub fn repo() -> Repository<MemBackend> {
        Repository::new(JsonStore::with_backend(MemBackend::new()), HighlightMarkers::default())
    }

    pub fn location() -> PageLocation {
        PageLocation {
            exposition_id: "100".into(),
            weave_id: "200".into(),
            url: "https://example.org/view/100/200".into(),
            page_title: "Chapter one".into(),
        }
    }

    pub fn session_with(regions: Vec<Region>) -> PageSession<MemoryPage> {
        PageSession::new(
            MemoryPage::new(location(), regions),
            HighlightMarkers::default(),
            Duration::from_millis(1500),
        )
    }

    pub fn session() -> PageSession<MemoryPage> {
        session_with(vec![
            Region::new("t1", "tool-text").with_text_markup("<p>The quick brown fox</p>"),
            Region::new("t2", "tool-text").with_text_markup("<p>jumps over the lazy dog</p>"),
        ])
    }
}
