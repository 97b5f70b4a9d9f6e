//! Document staging and bundling.
//!
//! Each exchange document goes through the staging directory before it is
//! transferred:
//!
//! ```text
//! templates/import.xml ──copy──> temp/import.xml ──scan──> temp/<N>.jpg
//!                                        │
//!                                        └── zip (server accepts archives) ──> temp/import.zip
//! ```
//!
//! Only the `import` document references images. Stale artifacts of the same
//! kind are removed before every `prepare`, so a run never uploads files the
//! current document does not reference.

mod archive;
mod scan;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use archive::write_zip_archive;
pub use scan::{is_image_name, scan_image_refs};

use crate::config::PathsConfig;
use crate::error::{ExchangeError, Result};
use crate::protocol::ServerCapabilities;

/// One of the three exchange documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Catalog and classifier
    Import,
    /// Priced offers
    Offers,
    /// Stock levels
    Rests,
}

impl DocumentKind {
    /// All kinds in exchange order
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Import, DocumentKind::Offers, DocumentKind::Rests];

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Import => "import",
            DocumentKind::Offers => "offers",
            DocumentKind::Rests => "rests",
        }
    }

    /// `<kind>.xml`
    pub fn xml_name(self) -> String {
        format!("{}.xml", self.as_str())
    }

    /// `<kind>.zip`
    pub fn zip_name(self) -> String {
        format!("{}.zip", self.as_str())
    }

    /// Whether this document references image assets
    pub fn has_images(self) -> bool {
        self == DocumentKind::Import
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "import" => Ok(DocumentKind::Import),
            "offers" => Ok(DocumentKind::Offers),
            "rests" => Ok(DocumentKind::Rests),
            other => Err(ExchangeError::Config(format!("Unknown document kind: {other}"))),
        }
    }
}

/// A document copied into the staging directory
#[derive(Debug, Clone)]
pub struct StagedDocument {
    /// Document kind
    pub kind: DocumentKind,
    /// Staging directory holding the document and its images
    pub staging_dir: PathBuf,
    /// Raw XML bytes
    pub xml: Bytes,
    /// Referenced image file names, first-seen order (import only)
    pub images: Vec<String>,
    /// Archive bytes, when the document was bundled
    pub archive: Option<Bytes>,
}

impl StagedDocument {
    /// Name the main payload is uploaded under
    pub fn main_file_name(&self) -> String {
        if self.archive.is_some() {
            self.kind.zip_name()
        } else {
            self.kind.xml_name()
        }
    }

    /// Main payload: the archive if bundled, the raw XML otherwise
    pub fn main_payload(&self) -> Bytes {
        self.archive.clone().unwrap_or_else(|| self.xml.clone())
    }

    /// Whether the document was bundled into an archive
    pub fn is_bundled(&self) -> bool {
        self.archive.is_some()
    }

    /// Staged path of an image
    pub fn image_path(&self, name: &str) -> PathBuf {
        self.staging_dir.join(name)
    }

    /// Read a staged image
    pub fn read_image(&self, name: &str) -> Result<Bytes> {
        read_file(&self.image_path(name))
    }
}

/// Stages documents and bundles them according to server capabilities
#[derive(Debug, Clone)]
pub struct FilePackager {
    paths: PathsConfig,
    no_copy: bool,
}

impl FilePackager {
    /// Create a packager over `paths`.
    ///
    /// With `no_copy` the previously staged document is reused instead of a
    /// fresh copy of the template.
    pub fn new(paths: PathsConfig, no_copy: bool) -> Self {
        Self { paths, no_copy }
    }

    /// Configured paths
    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }

    /// Stage `kind` and, for `import`, every image it references
    pub fn prepare(&self, kind: DocumentKind) -> Result<StagedDocument> {
        let staging = &self.paths.staging_dir;
        std::fs::create_dir_all(staging).map_err(|e| io_error("create", staging, &e))?;

        self.clear_stale(kind)?;

        let staged_xml = staging.join(kind.xml_name());
        if self.no_copy {
            tracing::debug!("Reusing staged {}", staged_xml.display());
        } else {
            let template = self.paths.templates_dir.join(kind.xml_name());
            copy_file(&template, &staged_xml)?;
        }

        let xml = read_file(&staged_xml)?;

        let images = if kind.has_images() {
            let images = scan_image_refs(&xml);
            for image in &images {
                copy_file(&self.paths.images_dir.join(image), &staging.join(image))?;
            }
            images
        } else {
            Vec::new()
        };

        tracing::info!(
            kind = %kind,
            bytes = xml.len(),
            images = images.len(),
            "Staged {}",
            kind.xml_name()
        );

        Ok(StagedDocument {
            kind,
            staging_dir: staging.clone(),
            xml,
            images,
            archive: None,
        })
    }

    /// Bundle the staged document into `<kind>.zip` when the server accepts archives.
    ///
    /// Leaves the document untouched otherwise.
    pub fn bundle(&self, doc: &mut StagedDocument, caps: &ServerCapabilities) -> Result<()> {
        if !caps.supports_zip {
            return Ok(());
        }

        let mut entries = vec![(doc.staging_dir.join(doc.kind.xml_name()), doc.kind.xml_name())];
        for image in &doc.images {
            entries.push((doc.image_path(image), image.clone()));
        }

        let archive_path = doc.staging_dir.join(doc.kind.zip_name());
        write_zip_archive(&archive_path, &entries)?;

        let bytes = std::fs::read(&archive_path).map_err(|e| {
            ExchangeError::Packaging(format!("Failed to read {}: {e}", archive_path.display()))
        })?;
        tracing::info!(kind = %doc.kind, bytes = bytes.len(), "Bundled {}", doc.kind.zip_name());

        doc.archive = Some(Bytes::from(bytes));
        Ok(())
    }

    fn clear_stale(&self, kind: DocumentKind) -> Result<()> {
        let staging = &self.paths.staging_dir;

        remove_if_exists(&staging.join(kind.zip_name()))?;

        if kind.has_images() {
            let entries = std::fs::read_dir(staging).map_err(|e| io_error("read", staging, &e))?;
            for entry in entries {
                let entry = entry.map_err(|e| io_error("read", staging, &e))?;
                let is_image = entry.file_name().to_str().is_some_and(is_image_name);
                if is_image && entry.path().is_file() {
                    remove_if_exists(&entry.path())?;
                }
            }
        }

        Ok(())
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to).map_err(|e| {
        ExchangeError::Transfer(format!(
            "Failed to copy {} to {}: {e}",
            from.display(),
            to.display()
        ))
    })?;
    Ok(())
}

fn read_file(path: &Path) -> Result<Bytes> {
    std::fs::read(path)
        .map(Bytes::from)
        .map_err(|e| io_error("read", path, &e))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed stale {}", path.display());
            Ok(())
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error("remove", path, &e)),
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> ExchangeError {
    ExchangeError::Transfer(format!("Failed to {action} {}: {err}", path.display()))
}
