//! 7z binary backend.
//!
//! The preferred general-purpose backend: 7-Zip decodes every recognized
//! format (7z, RAR, tar, gz, bz2, xz, split volumes) and handles edge cases
//! the pure-Rust decoders don't.
//!
//! # Command
//!
//! `7z x <archive> -o<output_dir> -y [-p<password>]`
//!
//! - `x`: extract with full paths
//! - `-o{dir}`: output directory
//! - `-y`: yes to all prompts (overwrite existing files)
//! - `-p{password}`: inline password, only when one is configured
//!
//! stdin is closed so a missing password fails instead of prompting.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::backend::Backend;
use super::kind::ArchiveCandidate;

/// Binary names searched on PATH, in order.
const BINARY_NAMES: [&str; 3] = ["7zz", "7z", "7za"];

/// External 7z command-line tool.
#[derive(Debug, Clone)]
pub struct SevenZipTool {
    binary: Option<PathBuf>,
}

impl SevenZipTool {
    /// Locate the binary, preferring `override_path` when it exists.
    pub fn locate(override_path: Option<&Path>) -> Self {
        if let Some(path) = override_path {
            if path.is_file() {
                return Self::at(path);
            }
            warn!(
                "Configured 7z binary not found at {}, searching PATH instead",
                path.display()
            );
        }

        match find_7z_binary() {
            Ok(binary) => Self::at(&binary),
            Err(e) => {
                debug!("{:#}", e);
                Self { binary: None }
            }
        }
    }

    /// Use a specific binary without searching.
    pub fn at(binary: &Path) -> Self {
        Self {
            binary: Some(binary.to_path_buf()),
        }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}

impl Backend for SevenZipTool {
    fn name(&self) -> &str {
        "7z"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn extract(
        &self,
        candidate: &ArchiveCandidate,
        output_dir: &Path,
        password: Option<&str>,
    ) -> Result<()> {
        let Some(binary) = &self.binary else {
            bail!("7z binary not found");
        };

        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let output = Command::new(binary)
            .args(extract_args(candidate.path(), output_dir, password))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to run 7z on {}", candidate.path().display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let cause = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("unknown error");
            bail!("7z exited with {}: {}", output.status, cause);
        }

        #[cfg(unix)]
        {
            let changed = grant_owner_access(output_dir);
            if changed > 0 {
                debug!("{}: fixed mode on {} entries", candidate.file_name(), changed);
            }
        }

        Ok(())
    }
}

/// Arguments for `7z x <archive> -o<output_dir> -y [-p<password>]`.
pub fn extract_args(archive: &Path, output_dir: &Path, password: Option<&str>) -> Vec<OsString> {
    let mut out_flag = OsString::from("-o");
    out_flag.push(output_dir);

    let mut args = vec![
        OsString::from("x"),
        archive.as_os_str().to_owned(),
        out_flag,
        OsString::from("-y"),
    ];
    if let Some(pw) = password {
        args.push(OsString::from(format!("-p{}", pw)));
    }
    args
}

/// Find the 7z binary.
///
/// Looks in the following locations:
/// 1. `bin/7zz` or `7zz` next to the executable
/// 2. System PATH (`7zz`, `7z`, then `7za`)
pub fn find_7z_binary() -> Result<PathBuf> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            for candidate in [exe_dir.join("bin/7zz"), exe_dir.join("7zz")] {
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }
    }

    for name in BINARY_NAMES {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    bail!("7z binary not found. Please install p7zip or place 7zz next to the executable.")
}

/// Give the owner access to everything under `dir` (Unix only).
///
/// Archives packed on Windows can carry attributes that map to modes the
/// owner can't read. Returns how many entries were changed.
#[cfg(unix)]
fn grant_owner_access(dir: &Path) -> usize {
    use std::os::unix::fs::PermissionsExt;

    let mut changed = 0;
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let needed = if metadata.is_dir() { 0o700 } else { 0o600 };
        let mode = metadata.permissions().mode();
        if mode & needed == needed {
            continue;
        }

        match fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode | needed)) {
            Ok(()) => changed += 1,
            Err(e) => warn!("Could not change mode of {}: {}", entry.path().display(), e),
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_extract_args_with_password() {
        let args = extract_args(
            Path::new("/dl/set.7z"),
            Path::new("/dl/set_extracted"),
            Some("secret"),
        );
        assert_eq!(
            args,
            vec![
                OsString::from("x"),
                OsString::from("/dl/set.7z"),
                OsString::from("-o/dl/set_extracted"),
                OsString::from("-y"),
                OsString::from("-psecret"),
            ]
        );
    }

    #[test]
    fn test_extract_args_without_password() {
        let args = extract_args(Path::new("a.rar"), Path::new("a_extracted"), None);
        assert_eq!(args.len(), 4);
        assert!(!args.iter().any(|a| a.to_string_lossy().starts_with("-p")));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let tool = SevenZipTool { binary: None };
        assert!(!tool.is_available());

        let c = ArchiveCandidate::classify(Path::new("a.7z")).unwrap();
        let dir = tempdir().unwrap();
        assert!(tool.extract(&c, dir.path(), None).is_err());
    }

    #[test]
    fn test_nonzero_exit_is_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.7z");
        std::fs::write(&archive, b"definitely not a 7z archive").unwrap();

        // Skip if 7z not available
        let Ok(binary) = find_7z_binary() else {
            return;
        };

        let tool = SevenZipTool::at(&binary);
        let c = ArchiveCandidate::classify(&archive).unwrap();
        assert!(tool
            .extract(&c, &dir.path().join("broken_extracted"), Some("pw"))
            .is_err());
    }

    #[test]
    fn test_extract_zip_with_7z() -> Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("test.zip");
        let output_dir = dir.path().join("test_extracted");

        {
            let file = std::fs::File::create(&zip_path)?;
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("file1.txt", options)?;
            zip.write_all(b"one")?;

            zip.start_file("sub/file2.txt", options)?;
            zip.write_all(b"two")?;

            zip.finish()?;
        }

        // Skip if 7z not available
        let Ok(binary) = find_7z_binary() else {
            return Ok(());
        };

        let tool = SevenZipTool::at(&binary);
        let c = ArchiveCandidate::classify(&zip_path).unwrap();
        tool.extract(&c, &output_dir, Some("unused"))?;

        assert_eq!(std::fs::read(output_dir.join("file1.txt"))?, b"one");
        assert_eq!(std::fs::read(output_dir.join("sub/file2.txt"))?, b"two");

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_grant_owner_access() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked.txt");
        let fine = dir.path().join("fine.txt");
        std::fs::write(&locked, b"x").unwrap();
        std::fs::write(&fine, b"y").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o200)).unwrap();
        std::fs::set_permissions(&fine, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(grant_owner_access(dir.path()), 1);
        let mode = std::fs::metadata(&locked).unwrap().permissions().mode();
        assert_eq!(mode & 0o600, 0o600);

        // Nothing left to change
        assert_eq!(grant_owner_access(dir.path()), 0);
    }

    #[test]
    fn test_locate_prefers_existing_override() {
        let dir = tempdir().unwrap();
        let fake = dir.path().join("my7z");
        std::fs::write(&fake, b"").unwrap();

        let tool = SevenZipTool::locate(Some(&fake));
        assert_eq!(tool.binary(), Some(fake.as_path()));
    }
}
