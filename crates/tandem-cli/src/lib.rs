//! Terminal shell for the Tandem link
//!
//! A thin line-based front end over [`tandem_core::Controller`]. Operator
//! input is parsed into [`Command`]s, link events are rendered as text lines.
//! All connection logic lives in `tandem-core`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod commands;
pub mod error;
pub mod runtime;
pub mod terminal;

pub use args::{Cli, Role};
pub use commands::Command;
pub use error::CliError;
pub use runtime::{run_client, run_listener};
pub use terminal::Terminal;
