//! Error types for extraction and installation.

use std::io;

use apm::FormatError;

use crate::install::InstallStage;

/// Everything that can abort an invocation.
///
/// There is no recoverable class: every variant ends the run at the point it
/// is detected, without rolling back blocks already written.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Open, read, seek or write failure on the device, dump, boot block or
    /// output file
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// On-disk or dump record failed validation
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Flag combination cannot be executed
    #[error("{0}")]
    Config(&'static str),

    /// Dump ended in the middle of a driver record header
    #[error("driver dump truncated in header of driver record {index}")]
    TruncatedRecord { index: usize },

    /// Dump holds more drivers than the descriptor table can list
    #[error("driver dump holds more than {max} drivers")]
    TooManyDrivers { max: usize },

    /// Block size cannot address the device
    #[error("unsupported block size {0}")]
    UnsupportedBlockSize(u32),

    /// Block number does not fit its on-disk field
    #[error("{what} {value} does not fit in 32 bits")]
    BlockCountOverflow { what: &'static str, value: u64 },

    /// Layout does not fit on the device
    #[error("device too small: layout needs {needed} blocks, device has {available}")]
    DeviceTooSmall { needed: u64, available: u64 },

    /// Dump header ended before the bootstrap parameters
    #[error("driver dump required to populate bootstrap parameters")]
    MissingBootstrapParameters,

    /// Failure during installation, tagged with the last completed stage
    #[error("install failed after {stage}: {source}")]
    Install {
        stage: InstallStage,
        #[source]
        source: Box<Error>,
    },
}

/// Result type for this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Attach a context string to an I/O result.
pub(crate) trait IoContext<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| Error::Io { context, source })
    }
}

impl Error {
    /// Underlying I/O error kind, if this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            Self::Install { source, .. } => source.io_kind(),
            _ => None,
        }
    }
}
