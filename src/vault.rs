use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// The current attachment storage layout: one file per attachment, named by
/// the attachment row's external identifier, directly under the base
/// directory. Bytes are addressed by uuid so renames of the original file
/// never invalidate stored references.
#[derive(Debug, Clone)]
pub struct Vault {
    base: PathBuf,
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid attachment identifier: {0:?}")]
    InvalidName(String),
    #[error("vault I/O failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Vault {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve the on-disk location of an attachment's bytes. Identifiers
    /// containing path separators or traversal components are rejected.
    pub fn resolve(&self, uuid: &str) -> Result<PathBuf, VaultError> {
        if uuid.is_empty()
            || uuid.contains('/')
            || uuid.contains('\\')
            || uuid == "."
            || uuid == ".."
        {
            return Err(VaultError::InvalidName(uuid.to_string()));
        }
        Ok(self.base.join(uuid))
    }

    pub fn ensure_base(&self) -> Result<(), VaultError> {
        fs::create_dir_all(&self.base).map_err(|err| VaultError::Io {
            path: self.base.display().to_string(),
            source: err,
        })
    }

    /// Move an external file into the vault under the given identifier.
    /// Falls back to copy+remove across filesystems.
    pub fn import_file(&self, source: &Path, uuid: &str) -> Result<PathBuf, VaultError> {
        self.ensure_base()?;
        let dest = self.resolve(uuid)?;
        if fs::rename(source, &dest).is_err() {
            fs::copy(source, &dest).map_err(|err| VaultError::Io {
                path: dest.display().to_string(),
                source: err,
            })?;
            fs::remove_file(source).map_err(|err| VaultError::Io {
                path: source.display().to_string(),
                source: err,
            })?;
        }
        debug!(
            target: "walletbook",
            event = "vault_file_imported",
            uuid,
            path = %dest.display()
        );
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_rejects_traversal() {
        let vault = Vault::new("/tmp/vault");
        assert!(vault.resolve("../../etc/passwd").is_err());
        assert!(vault.resolve("a/b").is_err());
        assert!(vault.resolve("").is_err());
        assert!(vault.resolve("abc-123").is_ok());
    }

    #[test]
    fn import_file_moves_bytes_under_uuid() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo1.jpg");
        fs::write(&source, b"jpeg-bytes").unwrap();

        let vault = Vault::new(dir.path().join("attachments"));
        let dest = vault.import_file(&source, "abc-123").unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"jpeg-bytes");
        assert_eq!(dest, vault.base().join("abc-123"));
    }
}
