//! Watch Go and Python model sources and regenerate TypeScript definitions.
//!
//! The generation itself is done by external tools (`tygo`, `pydantic2ts`);
//! this crate resolves what to watch, debounces changes, invokes the tools
//! and reports the outcome.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod language;
pub mod module_name;
pub mod output;
pub mod reserved;
pub mod runner;
pub mod session;
pub mod tygo;
pub mod walker;
pub mod watcher;

pub use error::{Error, Result};
pub use language::Language;
