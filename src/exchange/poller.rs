//! Import polling.

use bytes::Bytes;

use crate::error::{ExchangeError, Result};
use crate::package::DocumentKind;
use crate::protocol::{ExchangeSession, FileTarget, Method, ResponseStatus};

/// Drives `catalog.import` until the server reports a terminal status.
///
/// Polls back to back with no delay. Without `max_polls` the loop only ends
/// when the server stops answering `progress`. Only `fail` rejects the
/// import; a reply without a status word ends polling like `success`.
#[derive(Debug)]
pub struct ImportPoller<'a> {
    session: &'a mut ExchangeSession,
    max_polls: Option<u32>,
    polls: u32,
}

impl<'a> ImportPoller<'a> {
    /// Poll over `session`
    pub fn new(session: &'a mut ExchangeSession, max_polls: Option<u32>) -> Self {
        Self {
            session,
            max_polls,
            polls: 0,
        }
    }

    /// Polls sent by the last `run`, including one that ended in an error
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Poll the import of `kind`, returning the number of requests sent.
    ///
    /// Always addresses `<kind>.xml`, even when an archive was uploaded.
    pub async fn run(&mut self, kind: DocumentKind) -> Result<u32> {
        let target = FileTarget::new(kind.xml_name());
        self.polls = 0;

        loop {
            if self.max_polls.is_some_and(|max| self.polls >= max) {
                return Err(ExchangeError::PollLimitExceeded {
                    kind,
                    polls: self.polls,
                });
            }

            self.polls += 1;
            let envelope = self
                .session
                .send(Method::Import, Some(&target), Bytes::new())
                .await?;

            match envelope.status {
                ResponseStatus::Progress => {},
                ResponseStatus::Success => return Ok(self.polls),
                ResponseStatus::Unknown => {
                    tracing::warn!(
                        document = kind.as_str(),
                        "Import ended without a status: {}",
                        envelope.log.join(" | ")
                    );
                    return Ok(self.polls);
                },
                ResponseStatus::Fail => {
                    return Err(ExchangeError::ImportRejected {
                        kind,
                        log: envelope.log,
                    })
                },
            }
        }
    }
}
