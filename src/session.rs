//! A long-lived handle that runs loads and hands out finished snapshots.
//!
//! Only one load runs at a time; a second `load_all` while one is in flight
//! fails with [`Error::LoadInProgress`].  A load builds a brand new
//! [`LoadedArchives`] off to the side and publishes it in one step, so readers
//! always see either the previous snapshot or the new one, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::container::PakOpener;
use crate::error::{Error, Result};
use crate::loader::{load_containers, LoadedArchives};
use crate::reader::ArchiveOpener;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet.
    Idle,
    Loading,
    /// `generation` counts successful loads, starting at 1.
    Ready { generation: u64 },
}

struct Published {
    state: LoadState,
    current: Option<Arc<LoadedArchives>>,
}

pub struct ArchiveSession {
    settings: Settings,
    opener: Arc<dyn ArchiveOpener>,
    published: Mutex<Published>,
    finished: Condvar,
    generations: AtomicU64,
}

impl ArchiveSession {
    pub fn new(settings: Settings, opener: Arc<dyn ArchiveOpener>) -> Self {
        Self {
            settings,
            opener,
            published: Mutex::new(Published { state: LoadState::Idle, current: None }),
            finished: Condvar::new(),
            generations: AtomicU64::new(0),
        }
    }

    /// A session over on-disk `.pak` containers.
    pub fn with_pak_containers(settings: Settings) -> Self {
        Self::new(settings, Arc::new(PakOpener))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, Published> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoadState {
        self.lock().state
    }

    /// Discover, unlock and index every container, replacing the previous
    /// snapshot on success.  On failure the previous snapshot stays current.
    pub fn load_all(&self) -> Result<Arc<LoadedArchives>> {
        let previous = {
            let mut published = self.lock();
            if published.state == LoadState::Loading {
                return Err(Error::LoadInProgress);
            }
            std::mem::replace(&mut published.state, LoadState::Loading)
        };

        // Restores `previous` if the load panics.
        let mut guard = LoadingGuard { session: self, previous: Some(previous) };
        let result = load_containers(&self.settings, self.opener.as_ref());

        let mut published = self.lock();
        let outcome = match result {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
                published.current = Some(Arc::clone(&loaded));
                published.state = LoadState::Ready { generation };
                info!(generation, "archive snapshot published");
                Ok(loaded)
            }
            Err(e) => {
                published.state = previous;
                Err(e)
            }
        };
        guard.previous = None;
        drop(published);
        self.finished.notify_all();
        outcome
    }

    /// The latest completed snapshot.  Rejected while a load is running.
    pub fn snapshot(&self) -> Result<Arc<LoadedArchives>> {
        Self::current(&self.lock())
    }

    /// Like [`snapshot`](Self::snapshot), but waits for an in-flight load to
    /// finish instead of failing.
    pub fn wait_ready(&self) -> Result<Arc<LoadedArchives>> {
        let published = self
            .finished
            .wait_while(self.lock(), |p| p.state == LoadState::Loading)
            .unwrap_or_else(PoisonError::into_inner);
        Self::current(&published)
    }

    fn current(published: &Published) -> Result<Arc<LoadedArchives>> {
        match (published.state, &published.current) {
            (LoadState::Loading, _) => Err(Error::LoadInProgress),
            (_, Some(current)) => Ok(Arc::clone(current)),
            (_, None) => Err(Error::NotLoaded),
        }
    }
}

struct LoadingGuard<'a> {
    session: &'a ArchiveSession,
    previous: Option<LoadState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.session.lock().state = previous;
            self.session.finished.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::reader::{ArchiveReader, MemoryOpener, MemoryReader};
    use std::fs;
    use std::path::Path;
    use std::sync::mpsc;
    use std::thread;

    /// Blocks inside `open` until released, to hold a load in flight.
    struct GatedOpener {
        inner: MemoryOpener,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ArchiveOpener for GatedOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>> {
            if let Some(tx) = self.entered.lock().unwrap().take() {
                tx.send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            self.inner.open(path)
        }
    }

    fn settings(dir: &Path) -> Settings {
        fs::write(dir.join("a.pak"), b"").unwrap();
        let mut settings = Settings::new(dir);
        settings.parallel = false;
        settings
    }

    fn memory_opener() -> MemoryOpener {
        MemoryOpener::new().with_container("a.pak", MemoryReader::new("A").with_file("Maps/Arena.umap", "m"))
    }

    #[test]
    fn reads_are_gated_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = ArchiveSession::new(settings(dir.path()), Arc::new(memory_opener()));

        assert_eq!(session.state(), LoadState::Idle);
        assert!(matches!(session.snapshot(), Err(Error::NotLoaded)));

        let loaded = session.load_all().unwrap();
        assert_eq!(session.state(), LoadState::Ready { generation: 1 });
        assert!(Arc::ptr_eq(&loaded, &session.snapshot().unwrap()));

        let reloaded = session.load_all().unwrap();
        assert_eq!(session.state(), LoadState::Ready { generation: 2 });
        assert!(!Arc::ptr_eq(&loaded, &reloaded));
        // The old snapshot is untouched by the reload.
        assert_eq!(loaded.index().entry_count(), 1);
    }

    #[test]
    fn concurrent_load_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let opener = GatedOpener {
            inner: memory_opener(),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        };
        let session = Arc::new(ArchiveSession::new(settings(dir.path()), Arc::new(opener)));

        let worker = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.load_all().map(|l| l.index().entry_count()))
        };
        entered_rx.recv().unwrap();

        assert_eq!(session.state(), LoadState::Loading);
        assert!(matches!(session.load_all(), Err(Error::LoadInProgress)));
        assert!(matches!(session.snapshot(), Err(Error::LoadInProgress)));

        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.wait_ready().map(|l| l.index().entry_count()))
        };

        release_tx.send(()).unwrap();
        assert_eq!(worker.join().unwrap().unwrap(), 1);
        assert_eq!(waiter.join().unwrap().unwrap(), 1);
        assert_eq!(session.state(), LoadState::Ready { generation: 1 });
    }

    #[test]
    fn failed_load_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let session = ArchiveSession::new(settings(dir.path()), Arc::new(memory_opener()));
        session.load_all().unwrap();

        fs::remove_file(dir.path().join("a.pak")).unwrap();
        drop(dir);
        assert!(session.load_all().is_err());
        assert_eq!(session.state(), LoadState::Ready { generation: 1 });

        let snapshot = session.snapshot().unwrap();
        let arena: &Entry = snapshot.index().resolve_entry("maps", "arena").unwrap();
        assert_eq!(snapshot.read_entry(arena).unwrap(), b"m");
    }
}
