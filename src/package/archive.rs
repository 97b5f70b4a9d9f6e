//! Zip bundling of a staged document and its images.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use zip::write::FileOptions;

use crate::error::{ExchangeError, Result};

/// Write `entries` (source path, bare entry name) into a new archive at `archive_path`
pub fn write_zip_archive(archive_path: &Path, entries: &[(PathBuf, String)]) -> Result<()> {
    if entries.is_empty() {
        return Err(ExchangeError::Packaging("No files to archive".to_string()));
    }

    let file = File::create(archive_path).map_err(|e| {
        ExchangeError::Packaging(format!(
            "Failed to create zip archive {}: {e}",
            archive_path.display()
        ))
    })?;
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (source_path, entry_name) in entries {
        let mut source = File::open(source_path).map_err(|e| {
            ExchangeError::Packaging(format!("Failed to open {}: {e}", source_path.display()))
        })?;
        writer.start_file(entry_name.as_str(), options)?;
        io::copy(&mut source, &mut writer).map_err(|e| {
            ExchangeError::Packaging(format!(
                "Failed to add {} to zip: {e}",
                source_path.display()
            ))
        })?;
    }

    writer.finish()?;
    tracing::debug!(
        path = %archive_path.display(),
        entries = entries.len(),
        "Archive written"
    );
    Ok(())
}
