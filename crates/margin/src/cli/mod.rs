//! # CLI Behavior
//!
//! This is **one possible UI client** for margin, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes and
//! output formatting.
//!
//! For the overall architecture, see the crate-level documentation in [`crate`].
//!
//! ## Page Captures
//!
//! Commands that act on a page (`scan`, `save`, `suggest`, `read`) take a
//! capture file. Each run is a fresh visit: the capture is enhanced against
//! the store first, so stored highlights are restored before anything else
//! happens.
//!
//! ## Logging
//!
//! Engine diagnostics go to stderr through `tracing`. `MARGIN_LOG` takes an
//! `EnvFilter` directive; without it the level is `warn`, or `debug` with `-v`.
//!
//! ## Module Structure
//!
//! - `commands`: context setup and per-command handlers that call the API
//! - `render`: output formatting (styles, relative times, messages)
//! - `setup`: argument parsing via clap

mod commands;
mod render;
pub mod setup;

pub use commands::run;
