//! Token file persistence
//!
//! One JSON object holding the current `Token`, read and written wholesale.
//! Writes go to a temp file in the same directory and are renamed over the
//! target, so a reader never observes a partial write. There is no
//! cross-process lock: two concurrent runs of the tool can race on the file.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::token::Token;

/// Handle to the on-disk token record.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted token.
    ///
    /// Fails with `NotFound` when the file is absent or unreadable and with
    /// `Decode` when it is malformed or holds an empty access token.
    pub async fn load(&self) -> Result<Token> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::NotFound(format!("{}: {e}", self.path.display())))?;

        let token: Token = serde_json::from_str(&contents)
            .map_err(|e| Error::Decode(format!("{}: {e}", self.path.display())))?;

        if token.access_token.is_empty() {
            return Err(Error::Decode(format!(
                "{}: access_token is empty",
                self.path.display()
            )));
        }

        debug!(path = %self.path.display(), "loaded persisted token");
        Ok(token)
    }

    /// Overwrite the persisted token.
    ///
    /// File permissions are set to 0600 (owner read/write only) since the
    /// file holds bearer credentials.
    pub async fn save(&self, token: &Token) -> Result<()> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| Error::Persist(format!("serializing token: {e}")))?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| Error::Persist(format!("{} has no file name", self.path.display())))?;
        let tmp_path = self.path.with_file_name(format!(
            ".{}.tmp.{}",
            file_name.to_string_lossy(),
            std::process::id()
        ));

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| Error::Persist(format!("writing temp token file: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&tmp_path, perms)
                .await
                .map_err(|e| Error::Persist(format!("setting token file permissions: {e}")))?;
        }

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::Persist(format!("renaming temp token file: {e}")))?;

        debug!(path = %self.path.display(), "persisted token");
        Ok(())
    }
}
