//! Dedicated ZIP decoder.
//!
//! ZIP support is native (zip crate), so whole `.zip` files skip the
//! general-purpose chain entirely. The password is applied per entry, only
//! when one is configured and the entry carries the encryption flag.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use tracing::debug;

use super::backend::Backend;
use super::kind::ArchiveCandidate;

/// `zip` crate decoder (ZipCrypto and AES).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipDecoder;

impl Backend for ZipDecoder {
    fn name(&self) -> &str {
        "zip"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn extract(
        &self,
        candidate: &ArchiveCandidate,
        output_dir: &Path,
        password: Option<&str>,
    ) -> Result<()> {
        let count = extract_zip(candidate.path(), output_dir, password)?;
        debug!("{}: {} files", candidate.file_name(), count);
        Ok(())
    }
}

/// Extract a ZIP archive into `output_dir`, returning the number of files written.
///
/// Entries whose names would escape `output_dir` are skipped.
pub fn extract_zip(archive_path: &Path, output_dir: &Path, password: Option<&str>) -> Result<usize> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open ZIP: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read ZIP: {}", archive_path.display()))?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let encrypted = archive.by_index_raw(i)?.encrypted();

        let mut entry = match password {
            Some(pw) if encrypted => archive
                .by_index_decrypt(i, pw.as_bytes())
                .with_context(|| format!("Failed to decrypt entry {} (wrong password?)", i))?,
            _ => archive
                .by_index(i)
                .with_context(|| format!("Failed to read entry {}", i))?,
        };

        let Some(entry_path) = entry.enclosed_name() else {
            debug!("Skipping unsafe ZIP entry: {}", entry.name());
            continue;
        };
        let out_path = output_dir.join(entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            io::copy(&mut entry, &mut out)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
            count += 1;
        }
    }

    Ok(count)
}
