//! On-disk form of the registry and the file helpers shared by the store.
//!
//! Every write goes to a sibling `.tmp` file which is synced and then renamed
//! over the destination, so readers and restarts only ever see a complete
//! file.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::warn;

use super::document::DocumentMetadata;
use super::error::{StoreError, StoreResult};

pub type Registry = BTreeMap<String, DocumentMetadata>;

/// File name of the registry inside the store root. Every store-owned entry
/// in the root (temp file, quarantined copies, directories pending removal)
/// starts with this name, and identifiers may not.
pub(crate) const REGISTRY_FILE: &str = "schema-registry.json";

/// What to do when the registry file exists but cannot be parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptRegistryPolicy {
    /// Fail `open` and leave the file untouched.
    #[default]
    Refuse,
    /// Move the file aside and start with an empty registry.
    Quarantine,
}

impl std::str::FromStr for CorruptRegistryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "refuse" => Ok(CorruptRegistryPolicy::Refuse),
            "quarantine" => Ok(CorruptRegistryPolicy::Quarantine),
            other => Err(format!(
                "unknown corrupt registry policy '{other}' (expected refuse or quarantine)"
            )),
        }
    }
}

/// Serialize the registry the way existing data directories expect it:
/// pretty JSON, two-space indent, keys in identifier order.
pub(crate) fn encode(registry: &Registry) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(registry).map_err(|source| StoreError::Serialization {
        op: "encode registry",
        source,
    })
}

pub(crate) fn persist(path: &Path, registry: &Registry) -> StoreResult<()> {
    let data = encode(registry)?;
    write_atomic(path, &data).map_err(|e| StoreError::io("write registry", path, e))
}

/// Read the registry at `path`, creating an empty one if none exists.
///
/// Runs before the store is shared, so no lock is involved.
pub(crate) fn bootstrap(path: &Path, policy: CorruptRegistryPolicy) -> StoreResult<Registry> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let registry = Registry::new();
            persist(path, &registry)?;
            return Ok(registry);
        }
        Err(e) => return Err(StoreError::io("read registry", path, e)),
    };

    match serde_json::from_slice::<Registry>(&data) {
        Ok(registry) => Ok(registry),
        Err(source) => match policy {
            CorruptRegistryPolicy::Refuse => Err(StoreError::CorruptRegistry {
                path: path.to_path_buf(),
                source,
            }),
            CorruptRegistryPolicy::Quarantine => {
                let backup = quarantine_path(path);
                fs::rename(path, &backup)
                    .map_err(|e| StoreError::io("quarantine registry", path, e))?;
                warn!(
                    registry = %path.display(),
                    backup = %backup.display(),
                    error = %source,
                    "registry unreadable, moved aside and starting empty"
                );
                let registry = Registry::new();
                persist(path, &registry)?;
                Ok(registry)
            }
        },
    }
}

fn quarantine_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt-{stamp}"));
    PathBuf::from(name)
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write and sync `data` to the `.tmp` sibling of `path` without touching
/// `path` itself. Returns the temp path for the caller to rename or discard.
pub(crate) fn stage(path: &Path, data: &[u8]) -> io::Result<PathBuf> {
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(tmp)
}

/// Replace `path` with `data` via write-to-temp, fsync, rename.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = stage(path, data)?;
    fs::rename(&tmp, path)
}
