//! Audio library
//!
//! Read-only view over the resource directory: lists playable files and
//! resolves client-supplied names to paths. Names must be plain file names;
//! anything that would escape the directory is treated as not found.

use acs_common::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncRead;

/// Where transfer workers get their bytes from
///
/// [`AudioLibrary`] is the only production source. `resolve` runs before the
/// "Streaming" announcement, `open` after it.
#[async_trait]
pub trait AudioSource: Send + Sync + 'static {
    type Reader: AsyncRead + Unpin + Send + 'static;

    /// Path of the file named by the client
    fn resolve(&self, name: &str) -> Result<PathBuf>;

    /// Open a resolved path, returning the reader and its size in bytes
    async fn open(&self, path: &Path) -> Result<(Self::Reader, u64)>;
}

/// Listing entry returned by `GET /api/audio/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioFile {
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Duration in seconds, taken from names like `sample-015s.mp3` (0 if absent)
    pub duration: u32,
}

#[derive(Debug, Clone)]
pub struct AudioLibrary {
    root: PathBuf,
    extensions: Vec<String>,
}

impl AudioLibrary {
    /// `extensions` are matched case-insensitively, with or without a leading dot
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            root: root.into(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `name` carries one of the configured extensions
    pub fn is_supported(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.iter().any(|x| *x == e)
            })
            .unwrap_or(false)
    }

    /// Sorted names of playable files
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|f| f.name).collect())
    }

    /// Playable files with size and duration, sorted by name
    pub fn entries(&self) -> Result<Vec<AudioFile>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !self.is_supported(&name) {
                continue;
            }
            // Entries whose metadata cannot be read are skipped, not fatal
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(AudioFile {
                duration: duration_from_name(&name),
                size: metadata.len(),
                name,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Resolve a client-supplied name to an existing regular file
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(Error::InvalidInput(format!("Invalid file name: {:?}", name)));
        }

        let path = self.root.join(name);
        match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(path),
            Ok(_) => Err(Error::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Open `path` (as returned by [`resolve`](Self::resolve)) for sequential reading
    pub async fn open(&self, path: &Path) -> Result<(File, u64)> {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok((file, size))
    }
}

#[async_trait]
impl AudioSource for AudioLibrary {
    type Reader = File;

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        AudioLibrary::resolve(self, name)
    }

    async fn open(&self, path: &Path) -> Result<(File, u64)> {
        AudioLibrary::open(self, path).await
    }
}

/// Exactly one normal path component, no separators or dot-dirs
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// `sample-003s.mp3` -> 3; names without a `-<digits>` suffix -> 0
pub fn duration_from_name(name: &str) -> u32 {
    let Some((_, last)) = name.rsplit_once('-') else {
        return 0;
    };
    let digits: String = last.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
