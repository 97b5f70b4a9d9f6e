//! Exchange request methods.
//!
//! The exchange endpoint is addressed with `type` and `mode` query
//! parameters. Each request this client issues is one of the variants of
//! [`Method`]; the dotted name (`catalog.init`) is only a display form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Exchange request types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Authenticate and obtain the session cookie
    CheckAuth,
    /// Negotiate server capabilities
    Init,
    /// Upload one part of a file
    File,
    /// Ask the server to import an uploaded document
    Import,
    /// Signal the end of the catalog exchange
    Complete,
}

impl Method {
    /// All methods in protocol order
    pub const ALL: [Method; 5] = [
        Method::CheckAuth,
        Method::Init,
        Method::File,
        Method::Import,
        Method::Complete,
    ];

    /// Value of the `type` query parameter
    pub fn exchange_type(&self) -> &'static str {
        "catalog"
    }

    /// Value of the `mode` query parameter
    pub fn mode(&self) -> &'static str {
        match self {
            Method::CheckAuth => "checkauth",
            Method::Init => "init",
            Method::File => "file",
            Method::Import => "import",
            Method::Complete => "complete",
        }
    }

    /// Dotted name, e.g. `catalog.checkauth`
    pub fn name(&self) -> &'static str {
        match self {
            Method::CheckAuth => "catalog.checkauth",
            Method::Init => "catalog.init",
            Method::File => "catalog.file",
            Method::Import => "catalog.import",
            Method::Complete => "catalog.complete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (exchange_type, mode) = s
            .split_once('.')
            .ok_or_else(|| format!("Method must be <type>.<mode>: {s}"))?;

        if !exchange_type.eq_ignore_ascii_case("catalog") {
            return Err(format!("Unsupported exchange type: {exchange_type}"));
        }

        Method::ALL
            .into_iter()
            .find(|m| m.mode().eq_ignore_ascii_case(mode))
            .ok_or_else(|| format!("Unknown exchange mode: {mode}"))
    }
}
