//! File-system side of a compile request: referenced-input checks before a
//! fallback launch and PDB relocation after a command-line build.

use crate::error::AdapterResult;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Existence check for referenced inputs
pub trait ArtifactProbe {
    /// Paths from `paths` that do not exist, in input order
    fn missing(&self, paths: &[PathBuf]) -> Vec<PathBuf>;
}

/// Resolve `path` the way the compiler sees it when launched in `base`.
pub fn resolve_in(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

/// Probe backed by the real file system. Relative paths are checked
/// against `base` (the compiler's working directory) when one is set.
#[derive(Debug, Clone, Default)]
pub struct FsProbe {
    base: Option<PathBuf>,
}

impl FsProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(base: Option<PathBuf>) -> Self {
        Self { base }
    }
}

impl ArtifactProbe for FsProbe {
    fn missing(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|p| !resolve_in(self.base.as_deref(), p).exists())
            .cloned()
            .collect()
    }
}

/// Check every referenced artifact, logging one error per missing path.
pub fn missing_references(probe: &dyn ArtifactProbe, references: &[PathBuf]) -> Vec<PathBuf> {
    let missing = probe.missing(references);
    for path in &missing {
        error!(
            reference = %path.display(),
            "Referenced file does not exist; the command-line compiler would fail on it"
        );
    }
    missing
}

/// The PDB location the compiler writes: next to the output, same stem.
pub fn default_pdb_path(output_assembly: &Path) -> PathBuf {
    output_assembly.with_extension("pdb")
}

/// Requested PDB path with a `.pdb` extension appended when missing.
pub fn desired_pdb_path(pdb_file: &Path) -> PathBuf {
    let has_pdb_ext = pdb_file
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdb"));
    if has_pdb_ext {
        pdb_file.to_path_buf()
    } else {
        let mut name = OsString::from(pdb_file.as_os_str());
        name.push(".pdb");
        PathBuf::from(name)
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    let a = std::path::absolute(a).unwrap_or_else(|_| a.to_path_buf());
    let b = std::path::absolute(b).unwrap_or_else(|_| b.to_path_buf());
    if cfg!(windows) {
        a.to_string_lossy()
            .eq_ignore_ascii_case(&b.to_string_lossy())
    } else {
        a == b
    }
}

/// Move `<output>.pdb` to the requested location after a command-line build.
///
/// Returns the new path when a move happened. Nothing is done when the two
/// locations coincide or the compiler produced no PDB.
pub fn relocate_pdb(output_assembly: &Path, pdb_file: &Path) -> AdapterResult<Option<PathBuf>> {
    let actual = default_pdb_path(output_assembly);
    let desired = desired_pdb_path(pdb_file);

    if same_location(&actual, &desired) || !actual.exists() {
        return Ok(None);
    }

    if desired.exists() {
        std::fs::remove_file(&desired)?;
    }

    if std::fs::rename(&actual, &desired).is_err() {
        // rename fails across volumes
        std::fs::copy(&actual, &desired)?;
        std::fs::remove_file(&actual)?;
    }

    debug!(from = %actual.display(), to = %desired.display(), "Relocated PDB");
    Ok(Some(desired))
}
