//! Request-scoped artifact storage.
//!
//! Every POST that writes files gets its own scope directory under the store
//! root, so concurrent requests never clear each other's output:
//!
//! ```text
//! <root>/<scope-id>/<number>.<ext>
//! ```
//!
//! - the scope id embeds a process-wide counter and a UUID
//! - file numbers are random within a fixed range and distinct within a scope
//! - beginning a batch clears the scope, so a re-render leaves only the new batch
//! - opening a scope prunes sibling scopes older than the TTL, except scopes
//!   whose `Scope` handle is still alive

use std::collections::HashSet;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Artifact, ArtifactId, ArtifactKind};
use crate::error::LabError;

/// File numbers for chart images.
pub const CHART_NUMBERS: RangeInclusive<u32> = 1000..=10_000_000;

/// File numbers for generated reports.
pub const REPORT_NUMBERS: RangeInclusive<u32> = 1..=10_000;

/// A directory of request scopes served under a URL prefix.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    url_prefix: String,
    kind: ArtifactKind,
    extension: &'static str,
    numbers: RangeInclusive<u32>,
    ttl: Duration,
    counter: AtomicU64,
    /// Ids of scopes with a live handle; never pruned.
    live: Mutex<HashSet<String>>,
}

impl ArtifactStore {
    /// Store for JPEG charts.
    pub fn charts(root: impl Into<PathBuf>, url_prefix: &str, ttl: Duration) -> Self {
        Self::new(root, url_prefix, ArtifactKind::Chart, "jpg", CHART_NUMBERS, ttl)
    }

    /// Store for plain-text reports.
    pub fn reports(root: impl Into<PathBuf>, url_prefix: &str, ttl: Duration) -> Self {
        Self::new(root, url_prefix, ArtifactKind::Report, "txt", REPORT_NUMBERS, ttl)
    }

    fn new(
        root: impl Into<PathBuf>,
        url_prefix: &str,
        kind: ArtifactKind,
        extension: &'static str,
        numbers: RangeInclusive<u32>,
        ttl: Duration,
    ) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            kind,
            extension,
            numbers,
            ttl,
            counter: AtomicU64::new(0),
            live: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh scope directory, pruning expired siblings first.
    pub fn open_scope(&self) -> Result<Scope<'_>, LabError> {
        fs::create_dir_all(&self.root)?;
        if let Err(e) = self.prune_expired() {
            warn!(root = %self.root.display(), error = %e, "artifact prune failed");
        }

        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("{seq:08x}-{}", Uuid::new_v4().simple());
        let dir = self.root.join(&id);
        self.live_scopes().insert(id.clone());
        if let Err(e) = fs::create_dir_all(&dir) {
            self.live_scopes().remove(&id);
            return Err(e.into());
        }
        debug!(scope = %id, root = %self.root.display(), "opened artifact scope");

        Ok(Scope {
            store: self,
            id,
            dir,
            used: HashSet::new(),
        })
    }

    /// Remove scope directories whose last modification is at least `ttl` ago.
    /// Scopes still held by a request are skipped whatever their age.
    ///
    /// Returns how many scopes were removed.
    pub fn prune_expired(&self) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let live = self.live_scopes().clone();
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if live.contains(entry.file_name().to_string_lossy().as_ref()) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age >= self.ttl {
                fs::remove_dir_all(entry.path())?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, root = %self.root.display(), "pruned expired artifact scopes");
        }
        Ok(removed)
    }

    fn live_scopes(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked.
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One request's namespace inside an [`ArtifactStore`].
#[derive(Debug)]
pub struct Scope<'a> {
    store: &'a ArtifactStore,
    id: String,
    dir: PathBuf,
    used: HashSet<u32>,
}

impl Scope<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Clear everything previously written to this scope.
    pub fn begin_batch(&mut self) -> Result<(), LabError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        self.used.clear();
        Ok(())
    }

    /// Reserve a fresh file number and return where the artifact goes.
    ///
    /// Nothing is written; the caller renders or writes to `artifact.path`.
    pub fn allocate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Artifact, LabError> {
        let capacity = (*self.store.numbers.end() - *self.store.numbers.start()) as usize + 1;
        if self.used.len() >= capacity {
            return Err(LabError::Render(format!(
                "artifact scope {} has no free file numbers",
                self.id
            )));
        }

        let number = loop {
            let n = rng.gen_range(self.store.numbers.clone());
            if self.used.insert(n) {
                break n;
            }
        };

        let file = format!("{number}.{}", self.store.extension);
        Ok(Artifact {
            id: ArtifactId {
                scope: self.id.clone(),
                number,
            },
            kind: self.store.kind,
            path: self.dir.join(&file),
            url: format!("{}/{}/{}", self.store.url_prefix, self.id, file),
        })
    }

    /// Delete the scope directory, e.g. after a failed pipeline.
    pub fn discard(self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!(scope = %self.id, error = %e, "failed to discard artifact scope");
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.store.live_scopes().remove(&self.id);
    }
}
