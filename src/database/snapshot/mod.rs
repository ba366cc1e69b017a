
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::vector_store::StoreConfig;
use crate::{RagError, Result};

/// Format version written into every snapshot
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of a vector store
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot<R> {
    pub version: u32,
    pub config: StoreConfig,
    /// Next id the store would assign; keeps ids unique across reopen
    pub next_record_id: u64,
    pub records: Vec<R>,
}

impl<R: Serialize> Snapshot<R> {
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| RagError::Persistence(format!("Failed to serialize snapshot: {}", e)))
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so a
/// reader sees either the old snapshot or the new one.
#[inline]
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path)?;
    debug!("Writing snapshot to temporary file {}", temp_path.display());

    let write_result = (|| -> std::io::Result<()> {
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = write_result {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            warn!(
                "Failed to remove temporary snapshot {}: {}",
                temp_path.display(),
                cleanup
            );
        }
        return Err(e.into());
    }

    Ok(())
}

/// Read and version-check a snapshot
#[inline]
pub fn read<R>(path: &Path) -> Result<Snapshot<R>>
where
    R: for<'de> Deserialize<'de>,
{
    let bytes = fs::read(path)?;
    let snapshot: Snapshot<R> = serde_json::from_slice(&bytes).map_err(|e| {
        RagError::Persistence(format!(
            "Failed to parse snapshot {}: {}",
            path.display(),
            e
        ))
    })?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(RagError::Persistence(format!(
            "Unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }

    Ok(snapshot)
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            RagError::Persistence(format!("Snapshot path has no file name: {}", path.display()))
        })?
        .to_string_lossy();
    Ok(path.with_file_name(format!(".{}.tmp", file_name)))
}
