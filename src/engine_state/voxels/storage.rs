//! # Chunk Storage
//!
//! Key-value persistence for chunk voxel bytes. The engine never depends on storage
//! being available: [`ChunkPersistence`] wraps any [`ChunkStore`] and switches to a
//! no-persistence mode after the first backing-store failure, so every later load is a
//! miss and every later save is a no-op.
//!
//! ## Backends
//! - [`MemoryChunkStore`]: a bounded LRU cache, the default and the only backend on wasm
//! - [`FileChunkStore`]: one file per chunk in a directory (native only)

use std::num::NonZeroUsize;

use log::{debug, warn};
use lru::LruCache;

use super::chunk::{ChunkKey, CHUNK_VOLUME};

/// Errors raised by chunk stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing store failed.
    #[error("chunk store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// A stored payload has the wrong length.
    #[error("stored chunk {key} has {len} bytes, expected {CHUNK_VOLUME}")]
    Corrupt {
        /// The chunk.
        key: ChunkKey,
        /// Length found.
        len: usize,
    },
}

/// A key-value store of chunk voxel bytes.
pub trait ChunkStore: Send {
    /// Loads a chunk, `Ok(None)` when it was never saved.
    fn load(&mut self, key: &ChunkKey) -> Result<Option<Vec<u8>>, StoreError>;
    /// Saves a chunk, overwriting any previous bytes.
    fn save(&mut self, key: &ChunkKey, voxels: &[u8]) -> Result<(), StoreError>;
    /// Deletes a chunk. Deleting a missing chunk is not an error.
    fn delete(&mut self, key: &ChunkKey) -> Result<(), StoreError>;
}

/// In-memory store that forgets the least recently used chunks beyond its capacity.
pub struct MemoryChunkStore {
    chunks: LruCache<ChunkKey, Vec<u8>>,
}

impl MemoryChunkStore {
    /// Creates a store holding at most `capacity` chunks (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            chunks: LruCache::new(capacity),
        }
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn load(&mut self, key: &ChunkKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.chunks.get(key).cloned())
    }

    fn save(&mut self, key: &ChunkKey, voxels: &[u8]) -> Result<(), StoreError> {
        if let Some((evicted, _)) = self.chunks.push(*key, voxels.to_vec()) {
            if evicted != *key {
                debug!("Evicted stored chunk {}", evicted);
            }
        }
        Ok(())
    }

    fn delete(&mut self, key: &ChunkKey) -> Result<(), StoreError> {
        self.chunks.pop(key);
        Ok(())
    }
}

#[cfg(not(target_family = "wasm"))]
pub use file_store::FileChunkStore;

#[cfg(not(target_family = "wasm"))]
mod file_store {
    use std::{
        fs,
        io::ErrorKind,
        path::{Path, PathBuf},
    };

    use super::{ChunkKey, ChunkStore, StoreError};

    /// Stores each chunk as `<x>,<y>,<z>.chunk` inside a directory.
    pub struct FileChunkStore {
        directory: PathBuf,
    }

    impl FileChunkStore {
        /// Opens a store in `directory`, creating it if needed.
        pub fn new(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
            let directory = directory.as_ref().to_path_buf();
            fs::create_dir_all(&directory)?;
            Ok(Self { directory })
        }

        fn path(&self, key: &ChunkKey) -> PathBuf {
            self.directory.join(format!("{}.chunk", key))
        }
    }

    impl ChunkStore for FileChunkStore {
        fn load(&mut self, key: &ChunkKey) -> Result<Option<Vec<u8>>, StoreError> {
            match fs::read(self.path(key)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        }

        fn save(&mut self, key: &ChunkKey, voxels: &[u8]) -> Result<(), StoreError> {
            fs::write(self.path(key), voxels)?;
            Ok(())
        }

        fn delete(&mut self, key: &ChunkKey) -> Result<(), StoreError> {
            match fs::remove_file(self.path(key)) {
                Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            }
        }
    }
}

/// Failure-tolerant front for a [`ChunkStore`].
pub struct ChunkPersistence {
    store: Option<Box<dyn ChunkStore>>,
}

impl ChunkPersistence {
    /// Persists through `store`.
    pub fn new(store: Box<dyn ChunkStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Never persists anything.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// `false` once the store has failed or when created disabled.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn degrade(&mut self, operation: &str, err: StoreError) {
        warn!("Chunk store {} failed ({}), continuing without persistence", operation, err);
        self.store = None;
    }

    /// Loads a chunk's voxel bytes. Misses, failures and corrupt payloads all return `None`.
    pub fn load(&mut self, key: &ChunkKey) -> Option<Vec<u8>> {
        let store = self.store.as_mut()?;
        match store.load(key) {
            Ok(Some(bytes)) if bytes.len() == CHUNK_VOLUME => Some(bytes),
            Ok(Some(bytes)) => {
                warn!("{}", StoreError::Corrupt { key: *key, len: bytes.len() });
                None
            }
            Ok(None) => None,
            Err(err) => {
                self.degrade("load", err);
                None
            }
        }
    }

    /// Saves a chunk's voxel bytes.
    pub fn save(&mut self, key: &ChunkKey, voxels: &[u8]) {
        if let Some(store) = self.store.as_mut() {
            if let Err(err) = store.save(key, voxels) {
                self.degrade("save", err);
            }
        }
    }

    /// Deletes a stored chunk.
    pub fn delete(&mut self, key: &ChunkKey) {
        if let Some(store) = self.store.as_mut() {
            if let Err(err) = store.delete(key) {
                self.degrade("delete", err);
            }
        }
    }
}
