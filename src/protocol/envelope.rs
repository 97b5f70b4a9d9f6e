//! Line-oriented response envelope.
//!
//! Every exchange response is plain text. The first line may be a status
//! word (`progress`, `success` or `fail`, any case); everything else is
//! free-form server diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status word of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Server is still working, ask again
    Progress,
    /// Step succeeded
    Success,
    /// Step failed
    Fail,
    /// First line was not a status word
    Unknown,
}

impl ResponseStatus {
    /// Parse a status word, case-insensitive
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "progress" => Some(Self::Progress),
            "success" => Some(Self::Success),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Status from the first line
    pub status: ResponseStatus,
    /// Remaining lines, trimmed, in order
    pub log: Vec<String>,
}

impl ResponseEnvelope {
    /// Parse a response body.
    ///
    /// The body is split on `\n` and every line trimmed. A recognized status
    /// word on the first line is removed from the log; otherwise the status
    /// is [`ResponseStatus::Unknown`] and the whole body is the log. A blank
    /// body yields an empty log.
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self {
                status: ResponseStatus::Unknown,
                log: Vec::new(),
            };
        }

        let mut log: Vec<String> = trimmed.split('\n').map(|l| l.trim().to_string()).collect();

        match ResponseStatus::from_word(&log[0]) {
            Some(status) => {
                log.remove(0);
                Self { status, log }
            },
            None => Self {
                status: ResponseStatus::Unknown,
                log,
            },
        }
    }

    /// Check for `success`
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Check for `progress`
    pub fn is_progress(&self) -> bool {
        self.status == ResponseStatus::Progress
    }

    /// Check for `fail`
    pub fn is_fail(&self) -> bool {
        self.status == ResponseStatus::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_is_removed() {
        let env = ResponseEnvelope::parse("success\r\nPHPSESSID\r\nabc123\r\n");
        assert_eq!(env.status, ResponseStatus::Success);
        assert_eq!(env.log, vec!["PHPSESSID", "abc123"]);
    }

    #[test]
    fn test_status_is_case_insensitive() {
        assert_eq!(
            ResponseEnvelope::parse("  PROGRESS \nImported 10 of 450").status,
            ResponseStatus::Progress
        );
        assert!(ResponseEnvelope::parse("Fail\nbad xml").is_fail());
    }

    #[test]
    fn test_unknown_keeps_whole_body() {
        let env = ResponseEnvelope::parse("zip=yes\nfile_limit=500000");
        assert_eq!(env.status, ResponseStatus::Unknown);
        assert_eq!(env.log, vec!["zip=yes", "file_limit=500000"]);
    }

    #[test]
    fn test_status_must_be_whole_line() {
        let env = ResponseEnvelope::parse("success: imported");
        assert_eq!(env.status, ResponseStatus::Unknown);
        assert_eq!(env.log.len(), 1);
    }

    #[test]
    fn test_blank_body() {
        let env = ResponseEnvelope::parse(" \n ");
        assert_eq!(env.status, ResponseStatus::Unknown);
        assert!(env.log.is_empty());
    }
}
