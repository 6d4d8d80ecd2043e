//! Archive recognition by file name.
//!
//! Classification looks at the name suffix only, never at file content, and
//! is case-insensitive. Compound suffixes (`.tar.gz`, `.tar.bz2`, `.tar.xz`)
//! are checked before their single-part counterparts, so `foo.tar.gz` is a
//! [`ArchiveKind::TarGz`] and never a bare [`ArchiveKind::Gz`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix appended to an archive's stem to name its output directory.
pub const EXTRACTED_DIR_SUFFIX: &str = "_extracted";

/// First-volume suffix of a split archive (`name.7z.001`).
const FIRST_VOLUME_SUFFIX: &str = ".001";

/// Archive format declared by a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// `.7z`
    SevenZ,
    /// `.zip`
    Zip,
    /// `.rar`
    Rar,
    /// `.tar`
    Tar,
    /// `.gz`
    Gz,
    /// `.bz2`
    Bz2,
    /// `.xz`
    Xz,
    /// `.tar.gz`
    TarGz,
    /// `.tar.bz2`
    TarBz2,
    /// `.tar.xz`
    TarXz,
}

/// Recognized suffixes, compound forms first so they win over `.gz`/`.bz2`/`.xz`.
const RECOGNIZED: [(&str, ArchiveKind); 10] = [
    (".tar.gz", ArchiveKind::TarGz),
    (".tar.bz2", ArchiveKind::TarBz2),
    (".tar.xz", ArchiveKind::TarXz),
    (".7z", ArchiveKind::SevenZ),
    (".zip", ArchiveKind::Zip),
    (".rar", ArchiveKind::Rar),
    (".tar", ArchiveKind::Tar),
    (".gz", ArchiveKind::Gz),
    (".bz2", ArchiveKind::Bz2),
    (".xz", ArchiveKind::Xz),
];

impl ArchiveKind {
    /// Classify a file name by its suffix (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        RECOGNIZED
            .iter()
            .find(|(suffix, _)| ends_with_ignore_ascii_case(name, suffix))
            .map(|(_, kind)| *kind)
    }

    /// The canonical (lowercase) suffix for this kind, including the leading dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            ArchiveKind::SevenZ => ".7z",
            ArchiveKind::Zip => ".zip",
            ArchiveKind::Rar => ".rar",
            ArchiveKind::Tar => ".tar",
            ArchiveKind::Gz => ".gz",
            ArchiveKind::Bz2 => ".bz2",
            ArchiveKind::Xz => ".xz",
            ArchiveKind::TarGz => ".tar.gz",
            ArchiveKind::TarBz2 => ".tar.bz2",
            ArchiveKind::TarXz => ".tar.xz",
        }
    }

    /// Whether the suffix has two parts (`.tar.*`).
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            ArchiveKind::TarGz | ArchiveKind::TarBz2 | ArchiveKind::TarXz
        )
    }

    /// Last dotted part of the suffix: `.gz` for both `.tar.gz` and `.gz`.
    pub fn final_suffix(&self) -> &'static str {
        let suffix = self.suffix();
        if self.is_compound() {
            &suffix[".tar".len()..]
        } else {
            suffix
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A file identified by name as an archive that needs extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCandidate {
    path: PathBuf,
    kind: ArchiveKind,
    split_volume: bool,
}

impl ArchiveCandidate {
    /// Classify a path against the recognized extension set.
    ///
    /// Returns `None` for anything that isn't an archive by name.
    pub fn classify(path: &Path) -> Option<Self> {
        Self::classify_with(path, false)
    }

    /// Like [`classify`](Self::classify), optionally also accepting the first
    /// volume of a split archive (`name.<ext>.001`). Later volumes are never
    /// candidates; the backend picks them up from the first one.
    pub fn classify_with(path: &Path, split_volumes: bool) -> Option<Self> {
        let name = path.file_name()?.to_str()?;

        if let Some(kind) = ArchiveKind::from_name(name) {
            return Some(Self {
                path: path.to_path_buf(),
                kind,
                split_volume: false,
            });
        }

        if split_volumes && ends_with_ignore_ascii_case(name, FIRST_VOLUME_SUFFIX) {
            let base = &name[..name.len() - FIRST_VOLUME_SUFFIX.len()];
            if let Some(kind) = ArchiveKind::from_name(base) {
                return Some(Self {
                    path: path.to_path_buf(),
                    kind,
                    split_volume: true,
                });
            }
        }

        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Whether this is the `.001` volume of a split archive.
    pub fn is_split_volume(&self) -> bool {
        self.split_volume
    }

    /// Only whole `.zip` files go to the dedicated ZIP decoder; everything
    /// else (including split ZIP volumes) uses the general-purpose chain.
    pub fn uses_dedicated_decoder(&self) -> bool {
        self.kind == ArchiveKind::Zip && !self.split_volume
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its final extension (and volume suffix).
    ///
    /// `report.zip` -> `report`, `photos.TAR.GZ` -> `photos.TAR`,
    /// `set.7z.001` -> `set`. Only the last part of a compound suffix goes,
    /// so `foo.tar.gz` and `foo.zip` never share an output directory.
    pub fn stem(&self) -> String {
        let name = self.file_name();
        let mut end = name.len();
        if self.split_volume {
            end -= FIRST_VOLUME_SUFFIX.len();
        }
        end -= self.kind.final_suffix().len();
        name[..end].to_string()
    }

    /// Sibling output directory: `<parent>/<stem>_extracted`.
    pub fn output_dir(&self) -> PathBuf {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}{}", self.stem(), EXTRACTED_DIR_SUFFIX))
    }
}

/// ASCII case-insensitive suffix test that never splits a UTF-8 character.
fn ends_with_ignore_ascii_case(name: &str, suffix: &str) -> bool {
    if name.len() < suffix.len() {
        return false;
    }
    let start = name.len() - suffix.len();
    name.is_char_boundary(start) && name[start..].eq_ignore_ascii_case(suffix)
}
