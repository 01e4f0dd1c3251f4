//! Loading the secret that seals scannable codes.
//!
//! Release builds insist on a readable secret file of adequate length. Debug
//! builds, or deployments that opt in explicitly, fall back to a generated
//! secret; codes issued with it stop resolving after a restart.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{CODE_SECRET_MIN_LEN, CodeSecret};

/// Build mode for secret validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate a missing secret file.
    Debug,
    /// Release builds require one unless ephemeral secrets are allowed.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nomcar::settings::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// if cfg!(debug_assertions) {
    ///     assert_eq!(mode, BuildMode::Debug);
    /// } else {
    ///     assert_eq!(mode, BuildMode::Release);
    /// }
    /// ```
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Errors raised while loading the code secret.
#[derive(Debug, Error)]
pub enum CodeSecretConfigError {
    #[error("failed to read code secret at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("code secret at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

/// Load the code secret from `path`.
///
/// # Examples
///
/// ```rust
/// use nomcar::settings::{BuildMode, load_code_secret};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let path = std::env::temp_dir().join("nomcar_code_secret_example");
/// std::fs::write(&path, vec![b'k'; 32])?;
///
/// let secret = load_code_secret(&path, false, BuildMode::Release)?;
/// assert_eq!(secret.as_bytes().len(), 32);
///
/// std::fs::remove_file(&path)?;
/// # Ok(())
/// # }
/// ```
pub fn load_code_secret(
    path: &Path,
    allow_ephemeral: bool,
    mode: BuildMode,
) -> Result<CodeSecret, CodeSecretConfigError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let secret = CodeSecret::from_bytes(bytes).map_err(|too_short| {
                CodeSecretConfigError::KeyTooShort {
                    path: path.to_path_buf(),
                    length: too_short.length,
                    min_len: CODE_SECRET_MIN_LEN,
                }
            })?;
            info!(
                path = %path.display(),
                fingerprint = %fingerprint(&secret),
                "code secret loaded"
            );
            Ok(secret)
        }
        Err(error) => {
            if mode.is_debug() || allow_ephemeral {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "using temporary code secret; issued codes will not survive a restart"
                );
                Ok(CodeSecret::generate())
            } else {
                Err(CodeSecretConfigError::KeyRead {
                    path: path.to_path_buf(),
                    source: error,
                })
            }
        }
    }
}

/// Short, non-reversible identifier for comparing deployments in logs.
fn fingerprint(secret: &CodeSecret) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(digest.get(..8).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn secret_dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    #[rstest]
    #[case(BuildMode::Debug)]
    #[case(BuildMode::Release)]
    fn reads_secret_from_file(secret_dir: TempDir, #[case] mode: BuildMode) {
        let path = secret_dir.path().join("secret");
        std::fs::write(&path, [7_u8; 40]).expect("write secret");

        let secret = load_code_secret(&path, false, mode).expect("secret loads");

        assert_eq!(secret.as_bytes(), &[7_u8; 40]);
    }

    #[rstest]
    #[case(BuildMode::Debug)]
    #[case(BuildMode::Release)]
    fn short_secrets_are_rejected(secret_dir: TempDir, #[case] mode: BuildMode) {
        let path = secret_dir.path().join("secret");
        std::fs::write(&path, b"short").expect("write secret");

        let err = load_code_secret(&path, true, mode).expect_err("too short");

        assert!(matches!(
            err,
            CodeSecretConfigError::KeyTooShort { length: 5, min_len: 32, .. }
        ));
    }

    #[rstest]
    #[case::debug(BuildMode::Debug, false)]
    #[case::release_opt_in(BuildMode::Release, true)]
    fn missing_file_falls_back_when_permitted(
        secret_dir: TempDir,
        #[case] mode: BuildMode,
        #[case] allow_ephemeral: bool,
    ) {
        let path = secret_dir.path().join("absent");

        let secret = load_code_secret(&path, allow_ephemeral, mode).expect("ephemeral secret");

        assert!(secret.as_bytes().len() >= CODE_SECRET_MIN_LEN);
    }

    #[rstest]
    fn missing_file_fails_in_release(secret_dir: TempDir) {
        let path = secret_dir.path().join("absent");

        let err = load_code_secret(&path, false, BuildMode::Release).expect_err("read fails");

        assert!(matches!(err, CodeSecretConfigError::KeyRead { .. }));
    }

    #[rstest]
    fn fingerprint_is_stable_and_short() {
        let secret = CodeSecret::from_bytes(vec![1_u8; 32]).expect("secret");

        let first = fingerprint(&secret);

        assert_eq!(first.len(), 16);
        assert_eq!(first, fingerprint(&secret));
    }
}
