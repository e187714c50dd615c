//! Shell error types.

use std::io;

use tandem_core::LinkError;
use thiserror::Error;

/// Errors that end the shell.
#[derive(Debug, Error)]
pub enum CliError {
    /// Terminal or socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The listen address could not be bound.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Link failure that could not be reported and survived.
    #[error(transparent)]
    Link(#[from] LinkError),
}
