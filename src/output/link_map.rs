//! `url,filename` map of downloaded documents
//!
//! The map file is created (or emptied) when the first wave starts, so it
//! only ever describes the current run and a crawl that runs no wave leaves
//! no file behind. Every write goes through a single async mutex: appends
//! write complete lines, and [`LinkMap::commit`] picks a document's final
//! name and moves it into place under the same lock, so two documents that
//! want the same name never overwrite each other.

use super::pages::url_digest;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    file: Option<File>,
    /// Document names handed out during this run
    claimed: HashSet<String>,
}

impl State {
    async fn file(&mut self, path: &Path) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => create_truncated(path).await?,
        };
        Ok(self.file.insert(file))
    }
}

#[derive(Debug)]
pub struct LinkMap {
    path: PathBuf,
    state: Mutex<State>,
}

impl LinkMap {
    /// Creates a map backed by `path`; nothing is touched on disk yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Creates a map and immediately empties its file
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let map = Self::new(path);
        map.start().await?;
        Ok(map)
    }

    /// Creates (or empties) the map file, creating parent directories
    ///
    /// Only the first call touches the file; later calls are no-ops.
    pub async fn start(&self) -> io::Result<()> {
        let mut state = self.state.lock().await;
        state.file(&self.path).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one `url,filename` line
    pub async fn append(&self, url: &str, filename: &str) -> io::Result<()> {
        let mut state = self.state.lock().await;
        write_line(state.file(&self.path).await?, url, filename).await
    }

    /// Moves the finished download at `part` into `dir` and records it
    ///
    /// The document keeps `wanted` unless another document of this run
    /// already holds that name, in which case it becomes
    /// `<stem>-<hash8>.<ext>` where `hash8` comes from its URL.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The name the document was stored under
    /// * `Err(io::Error)` - The rename or the map write failed
    pub async fn commit(&self, url: &str, part: &Path, dir: &Path, wanted: &str) -> io::Result<String> {
        let mut state = self.state.lock().await;

        let name = free_name(wanted, url, |candidate| state.claimed.contains(candidate));
        tokio::fs::rename(part, dir.join(&name)).await?;
        state.claimed.insert(name.clone());

        write_line(state.file(&self.path).await?, url, &name).await?;
        Ok(name)
    }
}

async fn create_truncated(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
}

async fn write_line(file: &mut File, url: &str, filename: &str) -> io::Result<()> {
    let line = format!("{},{}\n", url, filename);
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// First name derived from `wanted` that `taken` rejects
fn free_name(wanted: &str, url: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(wanted) {
        return wanted.to_string();
    }

    let (stem, ext) = match wanted.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (wanted, None),
    };
    let with_ext = |base: String| match ext {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    };

    let base = format!("{}-{}", stem, &url_digest(url)[..8]);
    let mut candidate = with_ext(base.clone());
    let mut n = 2;
    while taken(&candidate) {
        candidate = with_ext(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}
