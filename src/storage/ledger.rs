// The node's one shared ledger. Readers (balance queries, exports) share a
// read lock; a replacement is staged on disk beside the live store and only
// takes the write lock for the directory swap, so no reader ever sees a
// half-written ledger. Nothing here holds the lock while a peer socket is
// being written: outgoing images are spooled to a local file first.

use crate::core::get_balance;
use crate::error::{LedgerError, Result};
use crate::storage::image::{read_image, write_image};
use crate::storage::SledStore;
use log::{debug, error, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use uuid::Uuid;

pub struct Ledger {
    path: PathBuf,
    store: RwLock<Option<SledStore>>,
}

/// A ledger image spooled to a file next to the ledger. The file is removed on drop.
pub struct ImageSnapshot {
    path: PathBuf,
    file: File,
    entries: u64,
}

impl ImageSnapshot {
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Copies the whole image into `writer`.
    pub fn copy_to<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(io::copy(&mut self.file, writer)?)
    }
}

impl Drop for ImageSnapshot {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove {}: {e}", self.path.display());
        }
    }
}

impl Ledger {
    /// Opens the ledger at `path` if one exists. A missing ledger is not an
    /// error here; requests that need it fail with `NotFound` instead.
    pub fn open(path: &Path) -> Result<Ledger> {
        let store = match SledStore::open_existing(path) {
            Ok(store) => Some(store),
            Err(LedgerError::NotFound(msg)) => {
                warn!("{msg}; waiting for a peer to push one");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Ledger {
            path: path.to_path_buf(),
            store: RwLock::new(store),
        })
    }

    /// Opens or creates the ledger at `path`.
    pub fn create(path: &Path) -> Result<Ledger> {
        Ok(Ledger {
            path: path.to_path_buf(),
            store: RwLock::new(Some(SledStore::create(path)?)),
        })
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Option<SledStore>> {
        self.store
            .read()
            .expect("Failed to acquire read lock on ledger - this should never happen")
    }

    /// Runs `f` against the live store while holding the read lock.
    pub fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SledStore) -> Result<T>,
    {
        let guard = self.read_guard();
        let store = guard
            .as_ref()
            .ok_or_else(|| LedgerError::NotFound(format!("No ledger at {}", self.path.display())))?;
        f(store)
    }

    pub fn balance(&self, address: &str) -> Result<u64> {
        self.with_store(|store| get_balance(store, address))
    }

    /// Streams the whole ledger as an image into `writer`, holding the read
    /// lock throughout. Use `snapshot` when `writer` is a peer socket.
    pub fn export_image<W: Write>(&self, writer: &mut W) -> Result<u64> {
        self.with_store(|store| write_image(writer, store.entries()))
    }

    /// Writes the current image to a local spool file and releases the lock.
    pub fn snapshot(&self) -> Result<ImageSnapshot> {
        self.with_store(|store| {
            let path = self.sibling("outgoing");
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)?;
            let mut snapshot = ImageSnapshot {
                path,
                file,
                entries: 0,
            };

            let mut writer = BufWriter::new(&snapshot.file);
            let entries = write_image(&mut writer, store.entries())?;
            writer.flush()?;
            drop(writer);

            snapshot.entries = entries;
            debug!("Spooled {entries} ledger records to {}", snapshot.path.display());
            Ok(snapshot)
        })
    }

    /// Replaces the whole ledger with the image read from `reader`.
    ///
    /// The image is loaded into a staging store first; on any failure the
    /// staging directory is removed and the live ledger stays as it was.
    pub fn import_image<R: Read>(&self, reader: &mut R) -> Result<u64> {
        let staging = self.sibling("incoming");
        let count = match Self::stage_image(&staging, reader) {
            Ok(count) => count,
            Err(e) => {
                Self::remove_path(&staging);
                return Err(e);
            }
        };

        self.swap_in(&staging)?;
        info!("Replaced ledger at {} with {count} records", self.path.display());
        Ok(count)
    }

    fn stage_image<R: Read>(staging: &Path, reader: &mut R) -> Result<u64> {
        let staged = SledStore::create(staging)?;
        let count = read_image(reader, |key, value| staged.put_raw(key, value))?;
        staged.flush()?;
        Ok(count)
    }

    fn swap_in(&self, staging: &Path) -> Result<()> {
        let mut guard = self
            .store
            .write()
            .expect("Failed to acquire write lock on ledger - this should never happen");

        // Close the live handle before its directory moves
        if let Some(live) = guard.take() {
            if let Err(e) = live.flush() {
                warn!("Failed to flush ledger before replacement: {e}");
            }
        }

        let retired = self.sibling("retired");
        let had_live = self.path.exists();
        if had_live {
            fs::rename(&self.path, &retired)?;
        }
        if let Err(e) = fs::rename(staging, &self.path) {
            if had_live {
                fs::rename(&retired, &self.path)?;
                *guard = SledStore::open_existing(&self.path).ok();
            }
            Self::remove_path(staging);
            return Err(e.into());
        }

        let retired = had_live.then_some(retired);
        self.install(&mut guard, retired.as_deref())
    }

    /// Opens whatever now sits at the ledger path. If that fails, the retired
    /// ledger is moved back and reopened.
    fn install(&self, guard: &mut Option<SledStore>, retired: Option<&Path>) -> Result<()> {
        let err = match SledStore::open_existing(&self.path) {
            Ok(store) => {
                *guard = Some(store);
                if let Some(retired) = retired {
                    Self::remove_path(retired);
                }
                return Ok(());
            }
            Err(LedgerError::NotFound(msg)) => {
                warn!("Imported ledger is empty: {msg}");
                *guard = None;
                if let Some(retired) = retired {
                    Self::remove_path(retired);
                }
                return Ok(());
            }
            Err(e) => e,
        };

        let Some(retired) = retired else {
            Self::remove_path(&self.path);
            return Err(err);
        };

        let rejected = self.sibling("rejected");
        match fs::rename(&self.path, &rejected).and_then(|()| fs::rename(retired, &self.path)) {
            Ok(()) => {
                *guard = SledStore::open_existing(&self.path).ok();
                Self::remove_path(&rejected);
                warn!("Imported ledger failed to open, kept the previous one: {err}");
            }
            Err(e) => error!(
                "Failed to restore previous ledger from {}: {e}",
                retired.display()
            ),
        }
        Err(err)
    }

    fn sibling(&self, tag: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path
            .with_file_name(format!("{name}.{tag}-{}", Uuid::new_v4().simple()))
    }

    fn remove_path(path: &Path) {
        let result = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = result {
            warn!("Failed to remove {}: {e}", path.display());
        }
    }
}
