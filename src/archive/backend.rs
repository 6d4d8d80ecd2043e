//! Backend selection and the extraction boundary.
//!
//! [`Extractor`] owns an ordered list of [`Backend`]s. Whole `.zip` files go
//! straight to the dedicated ZIP decoder; every other recognized format walks
//! the general-purpose chain (7z binary first, library fallback second) and
//! stops at the first backend that succeeds.
//!
//! Nothing escapes [`Extractor::extract`]: backend errors are logged with the
//! archive name and cause, then reported to the caller as `false`.

use anyhow::{anyhow, bail, Result};
use std::path::Path;
use tracing::{debug, warn};

use super::kind::ArchiveCandidate;
use super::native::NativeBackend;
use super::sevenzip::SevenZipTool;
use super::zipfile::ZipDecoder;

/// A concrete extraction mechanism (external tool or library).
pub trait Backend {
    /// Short name used in logs and the startup banner.
    fn name(&self) -> &str;

    /// Whether this backend can run on this host at all.
    fn is_available(&self) -> bool;

    /// Decode `candidate` into `output_dir`, creating it (and its parents)
    /// first. `password` is applied only where the format supports encryption.
    fn extract(
        &self,
        candidate: &ArchiveCandidate,
        output_dir: &Path,
        password: Option<&str>,
    ) -> Result<()>;
}

/// Dispatches archives to backends and converts every failure into `false`.
pub struct Extractor {
    dedicated: Box<dyn Backend>,
    chain: Vec<Box<dyn Backend>>,
}

impl Extractor {
    /// Standard backend set: ZIP decoder for `.zip`, then `7z` binary and the
    /// library fallback for everything else.
    ///
    /// `seven_zip` overrides where the 7z binary is looked up.
    pub fn standard(seven_zip: Option<&Path>) -> Self {
        Self::with_backends(
            Box::new(ZipDecoder),
            vec![
                Box::new(SevenZipTool::locate(seven_zip)),
                Box::new(NativeBackend),
            ],
        )
    }

    /// Build an extractor from explicit backends, `chain` in priority order.
    pub fn with_backends(dedicated: Box<dyn Backend>, chain: Vec<Box<dyn Backend>>) -> Self {
        Self { dedicated, chain }
    }

    /// Names of the general-purpose backends usable on this host, in priority order.
    pub fn available_backends(&self) -> Vec<&str> {
        self.chain
            .iter()
            .filter(|b| b.is_available())
            .map(|b| b.name())
            .collect()
    }

    /// Fail if no general-purpose backend is usable. Checked once at startup.
    pub fn ensure_available(&self) -> Result<()> {
        if self.available_backends().is_empty() {
            bail!(
                "No extraction backend available. Install 7-Zip (p7zip) so that `7z` or `7zz` is on PATH."
            );
        }
        Ok(())
    }

    /// Extract `candidate` into `output_dir`. Never panics or propagates
    /// backend errors; returns whether extraction succeeded.
    pub fn extract(
        &self,
        candidate: &ArchiveCandidate,
        output_dir: &Path,
        password: Option<&str>,
    ) -> bool {
        match self.try_extract(candidate, output_dir, password) {
            Ok(backend) => {
                debug!(
                    "Extracted {} with {} -> {}",
                    candidate.file_name(),
                    backend,
                    output_dir.display()
                );
                true
            }
            Err(e) => {
                warn!("Failed to extract {}: {:#}", candidate.file_name(), e);
                eprintln!("  Error extracting {}: {:#}", candidate.file_name(), e);
                false
            }
        }
    }

    /// Run the backends for `candidate`, returning the name of the one that succeeded.
    fn try_extract(
        &self,
        candidate: &ArchiveCandidate,
        output_dir: &Path,
        password: Option<&str>,
    ) -> Result<&str> {
        if candidate.uses_dedicated_decoder() {
            self.dedicated.extract(candidate, output_dir, password)?;
            return Ok(self.dedicated.name());
        }

        let mut last_error = None;
        for backend in &self.chain {
            if !backend.is_available() {
                debug!("Backend {} unavailable, skipping", backend.name());
                continue;
            }

            match backend.extract(candidate, output_dir, password) {
                Ok(()) => return Ok(backend.name()),
                Err(e) => {
                    debug!(
                        "Backend {} failed on {}: {:#}",
                        backend.name(),
                        candidate.file_name(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow!(
                "no extraction backend available for {} archives",
                candidate.kind()
            )
        }))
    }
}
