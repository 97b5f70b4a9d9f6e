//! Server capabilities declared by `catalog.init`.
//!
//! The server answers `init` with `key=value` lines. Two keys matter:
//! `zip`, a boolean-like token telling whether archives are accepted, and
//! `file_limit`, the largest request body the server takes in bytes.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};

lazy_static! {
    static ref ZIP_TRUE: Regex = Regex::new(r"(?i)^(1|on|y|yes|true)$").unwrap();
}

/// Capabilities negotiated with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Server accepts zip archives
    pub supports_zip: bool,
    /// Maximum bytes per uploaded part
    pub max_part_bytes: usize,
}

impl ServerCapabilities {
    /// Create capabilities directly
    pub fn new(supports_zip: bool, max_part_bytes: usize) -> Self {
        Self {
            supports_zip,
            max_part_bytes,
        }
    }

    /// Parse the log lines of an `init` response.
    ///
    /// Keys are case-insensitive. Lines without `=` and unknown keys are
    /// skipped. Both `zip` and a positive integer `file_limit` must be
    /// present.
    pub fn from_init_log<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut supports_zip = None;
        let mut max_part_bytes = None;

        for line in lines {
            let Some((key, value)) = line.as_ref().split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "zip" => supports_zip = Some(ZIP_TRUE.is_match(value)),
                "file_limit" => {
                    let limit = value.parse::<usize>().map_err(|_| {
                        ExchangeError::Negotiation(format!("Malformed file_limit: {value:?}"))
                    })?;
                    if limit == 0 {
                        return Err(ExchangeError::Negotiation(
                            "file_limit must be positive".to_string(),
                        ));
                    }
                    max_part_bytes = Some(limit);
                },
                other => tracing::debug!("Ignoring init parameter {other}={value}"),
            }
        }

        let supports_zip = supports_zip
            .ok_or_else(|| ExchangeError::Negotiation("init response missing zip".to_string()))?;
        let max_part_bytes = max_part_bytes.ok_or_else(|| {
            ExchangeError::Negotiation("init response missing file_limit".to_string())
        })?;

        Ok(Self {
            supports_zip,
            max_part_bytes,
        })
    }
}
