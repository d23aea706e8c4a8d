use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// A throwaway user-data directory backing one launched browser process.
///
/// Removed on drop; the directory must outlive the browser process, so the
/// session handle owns the profile for as long as the session is open.
pub(crate) struct ScratchProfile {
    path: PathBuf,
}

impl ScratchProfile {
    pub(crate) fn create() -> Result<Self> {
        let temp_dir = tempfile::tempdir().map_err(|e| Error::Io(e.into()))?;
        let path = temp_dir.keep();
        tracing::debug!("created scratch profile at {}", path.display());
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchProfile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                tracing::warn!("failed to remove scratch profile {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_profile_creates_and_cleans_up() {
        let profile = ScratchProfile::create().unwrap();
        let path = profile.path().to_path_buf();

        assert!(path.is_dir());

        drop(profile);
        assert!(!path.exists());
    }

    #[test]
    fn test_profiles_are_distinct() {
        let a = ScratchProfile::create().unwrap();
        let b = ScratchProfile::create().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
