//! # margin CLI Architecture
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this
//! file only invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/marginapp/`: the UI-agnostic engine (extraction, persistence,
//!   reconciliation, merge, view state)
//! - `crates/margin/`: this CLI, one client of the engine
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/margin/src/cli/)                         │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Context wiring + dispatch (commands.rs)                  │
//! │  - Terminal rendering (render.rs)                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/marginapp/src/api.rs)                    │
//! │  - Opens page sessions, dispatches to command modules       │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The terminal has no live document, so pages arrive as JSON captures
//! (`{ expositionId, weaveId, url, pageTitle, regions: [...] }`) that are
//! loaded into a `MemoryPage`.
//!
//! ## Testing Approach
//!
//! - **Engine**: unit and integration tests in `marginapp`.
//! - **CLI**: argument parsing and rendering tests next to the code, plus
//!   end-to-end runs of the binary in `tests/`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
