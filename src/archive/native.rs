//! Library fallback backend.
//!
//! Used when the 7z binary is missing or exits non-zero. Routes by declared
//! format to pure-Rust or linked decoders:
//!
//! - `.7z`  -> sevenz-rust2 (AES-256 password support)
//! - `.rar` -> unrar (FFI to the unrar library)
//! - `.tar`, `.tar.gz` -> tar (+ flate2)
//! - `.gz`  -> flate2, decoded into a single file named after the stem
//!
//! `.bz2`, `.xz`, their tar forms and split volumes need the 7z binary.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::backend::Backend;
use super::kind::{ArchiveCandidate, ArchiveKind};
use super::zipfile;

/// Decoder crates linked into the binary; always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl Backend for NativeBackend {
    fn name(&self) -> &str {
        "library"
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
        if candidate.is_split_volume() {
            bail!("split-volume archives require the 7z binary");
        }

        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let archive_path = candidate.path();
        match candidate.kind() {
            ArchiveKind::SevenZ => extract_7z(archive_path, output_dir, password),
            ArchiveKind::Rar => extract_rar(archive_path, output_dir, password),
            ArchiveKind::Zip => zipfile::extract_zip(archive_path, output_dir, password).map(|_| ()),
            ArchiveKind::Tar => unpack_tar(open(archive_path)?, output_dir),
            ArchiveKind::TarGz => unpack_tar(GzDecoder::new(open(archive_path)?), output_dir),
            ArchiveKind::Gz => decompress_gz(archive_path, &output_dir.join(candidate.stem())),
            kind @ (ArchiveKind::Bz2 | ArchiveKind::Xz | ArchiveKind::TarBz2 | ArchiveKind::TarXz) => {
                bail!("{} archives are not supported by the library backend", kind)
            }
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn extract_7z(archive_path: &Path, output_dir: &Path, password: Option<&str>) -> Result<()> {
    let result = match password {
        Some(pw) => sevenz_rust2::decompress_file_with_password(archive_path, output_dir, pw.into()),
        None => sevenz_rust2::decompress_file(archive_path, output_dir),
    };

    result.with_context(|| format!("Failed to decompress 7z archive: {}", archive_path.display()))
}

fn extract_rar(archive_path: &Path, output_dir: &Path, password: Option<&str>) -> Result<()> {
    let archive = match password {
        Some(pw) => unrar::Archive::with_password(archive_path, pw),
        None => unrar::Archive::new(archive_path),
    };

    let mut archive = archive
        .open_for_processing()
        .with_context(|| format!("Failed to open RAR: {}", archive_path.display()))?;

    while let Some(header) = archive.read_header().context("Failed to read RAR header")? {
        archive = if header.entry().is_file() {
            let name = header.entry().filename.to_string_lossy().to_string();
            header
                .extract_with_base(output_dir)
                .with_context(|| format!("Failed to extract RAR entry: {}", name))?
        } else {
            header.skip().context("Failed to skip RAR entry")?
        };
    }

    Ok(())
}

fn unpack_tar<R: Read>(reader: R, output_dir: &Path) -> Result<()> {
    tar::Archive::new(reader)
        .unpack(output_dir)
        .with_context(|| format!("Failed to unpack tar into {}", output_dir.display()))
}

fn decompress_gz(archive_path: &Path, target: &Path) -> Result<()> {
    let mut decoder = GzDecoder::new(open(archive_path)?);
    let mut out = File::create(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    io::copy(&mut decoder, &mut out)
        .with_context(|| format!("Failed to decompress {}", archive_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
        let enc = GzEncoder::new(File::create(path)?, Compression::default());
        let mut builder = tar::Builder::new(enc);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data)?;
        }
        builder.into_inner()?.finish()?;
        Ok(())
    }

    #[test]
    fn test_tar_gz() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("photos.tar.gz");
        write_tar_gz(
            &archive,
            &[("set/one.jpg", &b"jpg-bytes"[..]), ("inner.zip", &b"zip"[..])],
        )?;

        let c = ArchiveCandidate::classify(&archive).unwrap();
        let out = c.output_dir();
        NativeBackend.extract(&c, &out, Some("ignored"))?;

        assert_eq!(out, dir.path().join("photos.tar_extracted"));
        assert_eq!(fs::read(out.join("set/one.jpg"))?, b"jpg-bytes");
        assert!(out.join("inner.zip").is_file());
        Ok(())
    }

    #[test]
    fn test_bare_gz_decodes_to_stem() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("notes.txt.gz");
        let mut enc = GzEncoder::new(File::create(&archive)?, Compression::default());
        enc.write_all(b"hello")?;
        enc.finish()?;

        let c = ArchiveCandidate::classify(&archive).unwrap();
        let out = c.output_dir();
        NativeBackend.extract(&c, &out, None)?;

        assert_eq!(fs::read(out.join("notes.txt"))?, b"hello");
        Ok(())
    }

    #[test]
    fn test_unsupported_formats_fail() {
        let dir = tempdir().unwrap();
        for name in ["a.xz", "a.bz2", "a.tar.xz", "a.tar.bz2"] {
            let path = dir.path().join(name);
            fs::write(&path, b"data").unwrap();
            let c = ArchiveCandidate::classify(&path).unwrap();
            assert!(NativeBackend.extract(&c, &c.output_dir(), None).is_err(), "{}", name);
        }

        let split = dir.path().join("a.7z.001");
        fs::write(&split, b"data").unwrap();
        let c = ArchiveCandidate::classify_with(&split, true).unwrap();
        assert!(NativeBackend.extract(&c, &c.output_dir(), None).is_err());
    }

    #[test]
    fn test_corrupt_7z_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.7z");
        fs::write(&path, b"not a 7z archive").unwrap();

        let c = ArchiveCandidate::classify(&path).unwrap();
        assert!(NativeBackend.extract(&c, &c.output_dir(), Some("pw")).is_err());
        // The output directory is still created before decoding
        assert!(c.output_dir().is_dir());
        // Source archive untouched
        assert!(path.is_file());
    }

    #[test]
    fn test_always_available() {
        assert!(NativeBackend.is_available());
    }
}
