//! Exchange runs.
//!
//! # Document States
//!
//! | State           | Description                          | Valid Transitions        |
//! |-----------------|--------------------------------------|--------------------------|
//! | `Staged`        | Copied to staging, images resolved   | → Bundled, Failed        |
//! | `Bundled`       | Archived, or left loose without zip  | → ImagesSent, MainSent   |
//! | `ImagesSent`    | Loose images uploaded (import only)  | → MainSent, Failed       |
//! | `MainSent`      | Every part of the main file uploaded | → ImportPending          |
//! | `ImportPending` | Polling `catalog.import`             | → ImportDone, Failed     |
//! | `ImportDone`    | Server finished the import           | (terminal)               |
//! | `Failed`        | Any step failed                      | (terminal)               |
//!
//! A failed document aborts the whole run: offers and rests reference
//! entities created by the import, so nothing after a failure is sent,
//! including `catalog.complete`.

mod orchestrator;
mod poller;

use std::fmt;

use serde::Serialize;

pub use orchestrator::ExchangeOrchestrator;
pub use poller::ImportPoller;

use crate::package::DocumentKind;

/// Step of an exchange run, named in failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "kind", rename_all = "snake_case")]
pub enum ExchangeStep {
    /// `catalog.checkauth`
    CheckAuth,
    /// `catalog.init`
    Init,
    /// Staging a document
    Prepare(DocumentKind),
    /// Archiving a document
    Bundle(DocumentKind),
    /// Uploading loose images
    Images(DocumentKind),
    /// Uploading the main file
    MainFile(DocumentKind),
    /// Polling the import
    Import(DocumentKind),
    /// `catalog.complete`
    Complete,
}

impl fmt::Display for ExchangeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeStep::CheckAuth => f.write_str("checkauth"),
            ExchangeStep::Init => f.write_str("init"),
            ExchangeStep::Prepare(kind) => write!(f, "prepare {kind}"),
            ExchangeStep::Bundle(kind) => write!(f, "bundle {kind}"),
            ExchangeStep::Images(kind) => write!(f, "upload {kind} images"),
            ExchangeStep::MainFile(kind) => write!(f, "upload {kind}"),
            ExchangeStep::Import(kind) => write!(f, "import {kind}"),
            ExchangeStep::Complete => f.write_str("complete"),
        }
    }
}

/// Per-document progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Copied to staging
    Staged,
    /// Archived, or left loose
    Bundled,
    /// Loose images uploaded
    ImagesSent,
    /// Main file uploaded
    MainSent,
    /// Import polling in progress
    ImportPending,
    /// Import finished
    ImportDone,
    /// A step failed
    Failed,
}

impl DocumentState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentState::ImportDone | DocumentState::Failed)
    }
}

/// Outcome of one document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Document kind
    pub kind: DocumentKind,
    /// Last state reached
    pub state: DocumentState,
    /// Whether the main file went as an archive
    pub zipped: bool,
    /// `catalog.file` requests sent, images included
    pub parts_sent: u32,
    /// `catalog.import` requests sent
    pub polls: u32,
}

impl DocumentReport {
    fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            state: DocumentState::Staged,
            zipped: false,
            parts_sent: 0,
            polls: 0,
        }
    }
}

/// Summary of an exchange run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExchangeReport {
    /// Documents in the order they were exchanged
    pub documents: Vec<DocumentReport>,
    /// Whether `catalog.complete` was sent
    pub completed: bool,
    /// Total requests sent
    pub requests: usize,
    /// Wall time of the run in seconds
    pub elapsed_secs: f64,
}

impl ExchangeReport {
    /// Report for `kind`, if that document was started
    pub fn document(&self, kind: DocumentKind) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.kind == kind)
    }

    /// Whether every started document finished its import
    pub fn all_done(&self) -> bool {
        self.documents
            .iter()
            .all(|d| d.state == DocumentState::ImportDone)
    }
}
