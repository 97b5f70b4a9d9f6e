//! Exchange error types.
//!
//! Every step of an exchange run reports failures through [`ExchangeError`].
//! The orchestrator wraps the cause of an aborted run in
//! [`ExchangeError::StepFailed`] so the failing step is named while the
//! inner error stays reachable through `#[source]`.

use thiserror::Error;

use crate::exchange::ExchangeStep;
use crate::package::DocumentKind;

/// Exchange errors.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// `catalog.checkauth` failed or its response could not be parsed.
    #[error("Authentication failed: {message}")]
    Auth {
        /// What went wrong.
        message: String,
        /// Server log of the failing response.
        log: Vec<String>,
    },

    /// `catalog.init` did not declare usable capabilities.
    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    /// Capabilities were needed before `catalog.init` ran.
    #[error("Server capabilities not negotiated")]
    CapabilitiesMissing,

    /// Local file I/O, HTTP transport failure or timeout.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Archive creation failed.
    #[error("Packaging error: {0}")]
    Packaging(String),

    /// The server finished an import with a non-success status.
    #[error("Import of {kind} rejected: {}", .log.join(" | "))]
    ImportRejected {
        /// Document whose import was rejected.
        kind: DocumentKind,
        /// Server log of the final poll.
        log: Vec<String>,
    },

    /// The import was still in progress when the configured poll bound ran out.
    #[error("Import of {kind} still in progress after {polls} polls")]
    PollLimitExceeded {
        /// Document being imported.
        kind: DocumentKind,
        /// Number of polls issued.
        polls: u32,
    },

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Catalog generation failed.
    #[error("Generator error: {0}")]
    Generator(String),

    /// A run aborted at `step`.
    #[error("{step} failed: {source}")]
    StepFailed {
        /// Step that was running.
        step: ExchangeStep,
        /// Underlying cause.
        #[source]
        source: Box<ExchangeError>,
    },
}

/// Result type alias for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

impl ExchangeError {
    /// Innermost error, looking through [`ExchangeError::StepFailed`].
    pub fn root(&self) -> &ExchangeError {
        match self {
            ExchangeError::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Server log carried by the failure, if the server produced one.
    pub fn server_log(&self) -> Option<&[String]> {
        match self.root() {
            ExchangeError::Auth { log, .. } | ExchangeError::ImportRejected { log, .. } => {
                Some(log)
            },
            _ => None,
        }
    }

    pub(crate) fn at(self, step: ExchangeStep) -> Self {
        ExchangeError::StepFailed {
            step,
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Transfer(format!("Request timed out: {err}"))
        } else {
            ExchangeError::Transfer(err.to_string())
        }
    }
}

impl From<zip::result::ZipError> for ExchangeError {
    fn from(err: zip::result::ZipError) -> Self {
        ExchangeError::Packaging(err.to_string())
    }
}

impl From<toml::de::Error> for ExchangeError {
    fn from(err: toml::de::Error) -> Self {
        ExchangeError::Config(format!("Failed to parse config: {err}"))
    }
}
