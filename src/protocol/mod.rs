//! CommerceML2 exchange protocol.
//!
//! The exchange endpoint is a single URL addressed with `type`/`mode`
//! query parameters. Responses are plain text with an optional status word
//! on the first line.
//!
//! # Message Flow
//!
//! ```text
//! Client                                   Server
//!    |                                        |
//!    |---- catalog.checkauth --------------->|  Basic auth
//!    |<--- success / cookie name / value ----|
//!    |                                        |
//!    |---- catalog.init ------------------->|  Capability negotiation
//!    |<--- zip=yes / file_limit=N ----------|
//!    |                                        |
//!    |---- catalog.file (part 1..n) ------->|  Chunked upload, in order
//!    |<--- success -------------------------|
//!    |                                        |
//!    |---- catalog.import ----------------->|  Repeated while progress
//!    |<--- progress | success | fail -------|
//!    |                                        |
//!    |---- catalog.complete --------------->|  End of exchange
//! ```
//!
//! # Session States
//!
//! | State           | Description                    | Valid Transitions |
//! |-----------------|--------------------------------|-------------------|
//! | `Initial`       | Nothing sent yet               | → Authenticated   |
//! | `Authenticated` | `checkauth` succeeded          | → Ready           |
//! | `Ready`         | Capabilities negotiated        | (terminal)        |

mod capabilities;
mod dispatcher;
mod envelope;
mod method;
mod session;

pub use capabilities::ServerCapabilities;
pub use dispatcher::{format_elapsed, AuditEntry, FileTarget, RequestDispatcher};
pub use envelope::{ResponseEnvelope, ResponseStatus};
pub use method::Method;
pub use session::{ExchangeSession, SessionState};

/// CommerceML schema version written by the generator
pub const SCHEMA_VERSION: &str = "2.08";

/// Default per-request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 180;

/// User agent sent with every request
pub const USER_AGENT: &str = "CommerceML2 emulator";
