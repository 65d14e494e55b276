//! Filesystem-backed schema store with an in-memory registry cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::document::{timestamp, validate_id, Document, DocumentMetadata};
use super::error::{StoreError, StoreResult};
use super::registry::{self, CorruptRegistryPolicy, Registry, REGISTRY_FILE};

const STORE_DIR: &str = "schemas";
const BODY_FILE: &str = "schema.json";
/// Suffix after [`REGISTRY_FILE`] for a schema directory whose removal is
/// waiting on the registry write.
const PENDING_DELETE: &str = ".deleting-";

/// Options for [`DocumentStore::open_with`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenOptions {
    pub corrupt_registry: CorruptRegistryPolicy,
}

/// Stores one `schema.json` per identifier under `<base>/schemas/<id>/` and
/// a registry of metadata in `<base>/schemas/schema-registry.json`.
///
/// The lock covers the registry and all file I/O: saves and deletes are
/// exclusive, gets and lists run concurrently with each other.
#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
    registry_path: PathBuf,
    registry: RwLock<Registry>,
}

impl DocumentStore {
    pub fn open(base: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(base, OpenOptions::default())
    }

    pub fn open_with(base: impl AsRef<Path>, options: OpenOptions) -> StoreResult<Self> {
        let root = base.as_ref().join(STORE_DIR);
        fs::create_dir_all(&root).map_err(|e| StoreError::io("create store directory", &root, e))?;
        let registry_path = root.join(REGISTRY_FILE);
        let registry = registry::bootstrap(&registry_path, options.corrupt_registry)?;
        sweep_pending_deletes(&root);
        info!(
            root = %root.display(),
            schemas = registry.len(),
            "opened schema store"
        );
        Ok(Self {
            root,
            registry_path,
            registry: RwLock::new(registry),
        })
    }

    /// Directory holding the registry and the per-schema directories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    fn dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn body_path(&self, id: &str) -> PathBuf {
        self.dir(id).join(BODY_FILE)
    }

    fn pending_delete_dir(&self, id: &str) -> PathBuf {
        self.root.join(format!("{REGISTRY_FILE}{PENDING_DELETE}{id}"))
    }

    /// Create or overwrite a schema. An empty `name` is replaced by `id`.
    pub fn save(
        &self,
        id: &str,
        name: &str,
        description: &str,
        body: &[u8],
    ) -> StoreResult<DocumentMetadata> {
        validate_id(id)?;
        let mut registry = self.registry.write();

        let dir = self.dir(id);
        let fresh_dir = !dir.exists();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create schema directory", &dir, e))?;
        let body_path = self.body_path(id);
        // the body is only renamed into place once the registry write succeeded
        let staged = match registry::stage(&body_path, body) {
            Ok(staged) => staged,
            Err(e) => {
                discard_save(&dir, &registry::tmp_path(&body_path), fresh_dir);
                return Err(StoreError::io("write schema body", &body_path, e));
            }
        };

        let metadata =
            DocumentMetadata::for_save(id, name, description, registry.get(id), timestamp());
        let previous = registry.insert(id.to_string(), metadata.clone());
        if let Err(e) = registry::persist(&self.registry_path, &registry) {
            restore_entry(&mut registry, id, previous);
            discard_save(&dir, &staged, fresh_dir);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staged, &body_path) {
            restore_entry(&mut registry, id, previous);
            if let Err(persist_err) = registry::persist(&self.registry_path, &registry) {
                warn!(id, error = %persist_err, "could not revert registry after failed body write");
            }
            discard_save(&dir, &staged, fresh_dir);
            return Err(StoreError::io("replace schema body", &body_path, e));
        }

        info!(id, bytes = body.len(), "saved schema");
        Ok(metadata)
    }

    pub fn get(&self, id: &str) -> StoreResult<Document> {
        validate_id(id)?;
        let registry = self.registry.read();
        let metadata = registry.get(id).ok_or_else(|| StoreError::not_found(id))?;
        let body_path = self.body_path(id);
        let body = fs::read(&body_path).map_err(|e| StoreError::io("read schema body", &body_path, e))?;
        debug!(id, bytes = body.len(), "read schema");
        Ok(Document {
            metadata: metadata.clone(),
            body,
        })
    }

    pub fn list(&self) -> Vec<DocumentMetadata> {
        let registry = self.registry.read();
        debug!(schemas = registry.len(), "listing schemas");
        registry.values().cloned().collect()
    }

    pub fn delete(&self, id: &str) -> StoreResult<()> {
        validate_id(id)?;
        let mut registry = self.registry.write();
        if !registry.contains_key(id) {
            return Err(StoreError::not_found(id));
        }

        // Move the directory aside first so a failed registry write can put
        // it back.
        let dir = self.dir(id);
        let pending = self.pending_delete_dir(id);
        remove_dir_if_present(&pending)
            .map_err(|e| StoreError::io("remove schema directory", &pending, e))?;
        let moved = match fs::rename(&dir, &pending) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(StoreError::io("remove schema directory", &dir, e)),
        };

        let removed = registry.remove(id);
        if let Err(e) = registry::persist(&self.registry_path, &registry) {
            restore_entry(&mut registry, id, removed);
            if moved {
                if let Err(restore_err) = fs::rename(&pending, &dir) {
                    warn!(id, error = %restore_err, "could not restore schema directory");
                }
            }
            return Err(e);
        }

        if moved {
            if let Err(e) = fs::remove_dir_all(&pending) {
                warn!(id, path = %pending.display(), error = %e, "leftover schema directory");
            }
        }

        info!(id, "deleted schema");
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }
}

fn restore_entry(registry: &mut Registry, id: &str, previous: Option<DocumentMetadata>) {
    match previous {
        Some(prev) => registry.insert(id.to_string(), prev),
        None => registry.remove(id),
    };
}

/// Undo the filesystem side of a save that did not commit.
fn discard_save(dir: &Path, staged: &Path, fresh_dir: bool) {
    let result = if fresh_dir {
        fs::remove_dir_all(dir)
    } else {
        fs::remove_file(staged)
    };
    if let Err(e) = result {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %dir.display(), error = %e, "could not clean up after failed save");
        }
    }
}

fn remove_dir_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Remove directories left behind by deletes interrupted after the registry
/// was written.
fn sweep_pending_deletes(root: &Path) {
    let prefix = format!("{REGISTRY_FILE}{PENDING_DELETE}");
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let path = entry.path();
        match remove_dir_if_present(&path) {
            Ok(()) => debug!(path = %path.display(), "removed pending delete"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove pending delete"),
        }
    }
}
