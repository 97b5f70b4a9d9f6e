//! # CML2 Emulator - CommerceML2 Exchange Client
//!
//! Emulates the accounting-system side of a CommerceML2 catalog exchange:
//! uploads catalog, offer and stock documents to a commerce platform's
//! exchange endpoint, negotiating capabilities and transferring large files
//! in size-bounded parts.
//!
//! ## Features
//!
//! - **Session negotiation**: `checkauth` with cookie capture, `init` capability discovery
//! - **Packaging**: staging of documents and referenced images, zip bundling when accepted
//! - **Chunked transfer**: ordered `file` uploads bounded by the server's `file_limit`
//! - **Import polling**: `import` repeated until the server reports a terminal status
//! - **Catalog generator**: random but consistent CommerceML 2.08 documents for load tests
//!
//! ## Protocol Overview
//!
//! ```text
//! Emulator                                 Exchange endpoint
//!    |                                           |
//!    |---- checkauth ------------------------->|
//!    |<--- success / cookie -------------------|
//!    |---- init ------------------------------>|
//!    |<--- zip=yes / file_limit=N -------------|
//!    |                                           |
//!    |  for import, offers, rests:               |
//!    |---- file (images, then document) ------>|
//!    |---- import (until success | fail) ----->|
//!    |                                           |
//!    |---- complete -------------------------->|
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cml::{Config, ExchangeOrchestrator};
//!
//! let config = Config::from_file(Config::default_path())?;
//! let mut orchestrator = ExchangeOrchestrator::from_config(&config)?;
//!
//! let report = orchestrator.run_full().await?;
//! println!("{} requests", report.requests);
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: Request dispatch, response envelope, session negotiation
//! - [`transport`]: HTTP and in-memory transports
//! - [`package`]: Document staging and zip bundling
//! - [`transfer`]: Part splitting and ordered upload
//! - [`exchange`]: Import polling and run orchestration
//! - [`generator`]: Random catalog generator
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod error;
pub mod exchange;
pub mod generator;
pub mod package;
pub mod protocol;
pub mod transfer;
pub mod transport;

// Re-exports for convenience
pub use config::{Config, ExchangeEndpoint, ExchangeSettings, GeneratorConfig, PathsConfig};
pub use error::{ExchangeError, Result};
pub use exchange::{
    DocumentReport, DocumentState, ExchangeOrchestrator, ExchangeReport, ExchangeStep,
    ImportPoller,
};
pub use generator::{CatalogGenerator, GenerationSummary};
pub use package::{DocumentKind, FilePackager, StagedDocument};
pub use protocol::{
    ExchangeSession, FileTarget, Method, RequestDispatcher, ResponseEnvelope, ResponseStatus,
    ServerCapabilities, SessionState,
};
pub use transfer::{split_parts, ChunkedTransfer};
pub use transport::{HttpTransport, ScriptedTransport, SessionCookie, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CommerceML schema version
pub const SCHEMA_VERSION: &str = protocol::SCHEMA_VERSION;
