use std::fmt;
use std::path::{Path, PathBuf};

/// The browser implementation family, independent of executable location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Chromium,
    Firefox,
    Webkit,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Chromium => "chromium",
            EngineKind::Firefox => "firefox",
            EngineKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving a user-supplied engine identifier.
///
/// The keyword-derived [`EngineKind`] is always retained; when the identifier
/// also names an existing file, the path is carried separately instead of
/// overwriting the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSelection {
    kind: EngineKind,
    executable: Option<PathBuf>,
    raw: String,
}

impl EngineSelection {
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Set when the raw identifier names an existing file on disk.
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    pub fn is_executable_path(&self) -> bool {
        self.executable.is_some()
    }

    /// The identifier as supplied by the caller.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Map an engine name or executable path to an engine selection.
///
/// Matching is a case-insensitive substring check; unmatched identifiers fall
/// back to Chromium. Resolution always succeeds.
pub fn resolve(identifier: &str) -> EngineSelection {
    let lower = identifier.to_lowercase();

    let mut kind = EngineKind::Chromium;
    if lower.contains("chrome") || lower.contains("chromium") {
        kind = EngineKind::Chromium;
    }
    if lower.contains("firefox") {
        kind = EngineKind::Firefox;
    }
    if lower.contains("webkit") {
        kind = EngineKind::Webkit;
    }

    let path = Path::new(identifier);
    let executable = path.is_file().then(|| path.to_path_buf());

    EngineSelection {
        kind,
        executable,
        raw: identifier.to_string(),
    }
}
