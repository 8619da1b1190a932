//! # margin Architecture
//!
//! margin overlays a suggestion workflow onto documents it does not own. It
//! finds content regions ("tools") in a foreign page, lets a user attach
//! free-text suggestions to selected spans of their text, and keeps those
//! suggestions across visits to the sub-views ("weaves") of a larger work
//! (an "exposition").
//!
//! This crate is the **UI-agnostic engine**. The `margin` binary is one client.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Client (the margin CLI, a browser host, ...)               │
//! │  - Provides the page (HostPage), renders CmdResult          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs) → Command Layer (commands/*.rs)         │
//! │  - One entry point per user action, structured results      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine                                                     │
//! │  extract   region → Tool content snapshot                   │
//! │  reconcile restore stored highlights into a live render     │
//! │  view      normal / text-only session state                 │
//! │  merge     validate and merge export documents              │
//! │  repository expositions, weaves, tools, suggestions         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - async key → JSON, serialized read-modify-write per key   │
//! │  - FsBackend (production), MemBackend (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward, code never writes to stdout/stderr and never
//! assumes a terminal. Diagnostics go through `tracing`; whoever runs the
//! engine decides whether and where they are printed.
//!
//! ## Testing Strategy
//!
//! 1. **Engine and commands**: unit tests over `MemBackend` and `MemoryPage`.
//! 2. **API** (`api.rs`): dispatch tests through the facade.
//! 3. **Integration** (`tests/`): filesystem backend, full page flows.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: One module per user action
//! - [`model`]: Exposition, Weave, Tool, Suggestion and the export document
//! - [`page`]: Host page interface and the in-memory page
//! - [`extract`]: Content extraction
//! - [`markup`]: Highlight marker handling over markup
//! - [`repository`]: Annotation persistence
//! - [`reconcile`]: Span reconciliation
//! - [`merge`]: Import validation and merge
//! - [`export`]: Export document construction
//! - [`view`]: View state and page sessions
//! - [`store`]: Storage abstraction and implementations
//! - [`config`]: Configuration management
//! - [`init`]: Data directory resolution and context setup
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod init;
pub mod markup;
pub mod merge;
pub mod model;
pub mod page;
pub mod reconcile;
pub mod repository;
pub mod store;
pub mod view;
