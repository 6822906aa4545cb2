//! Avatar files on disk, named `<username>.webp`.

use async_trait::async_trait;
use social_types::{AvatarError, AvatarStore};
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct FsAvatarStore {
    dir: PathBuf,
}

impl FsAvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.webp"))
    }
}

#[async_trait]
impl AvatarStore for FsAvatarStore {
    /// Users without a custom avatar have no file; that is not an error.
    async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), AvatarError> {
        match tokio::fs::rename(self.path_for(old_name), self.path_for(new_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AvatarError::Other(e.to_string())),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), AvatarError> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AvatarError::Other(e.to_string())),
        }
    }
}
