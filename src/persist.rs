//! Whole-hierarchy snapshots.
//!
//! A snapshot is one JSON document:
//!
//! ```text
//! { "format_version": 1, "saved_at": "<RFC 3339>", "hierarchy": { config, nodes, root, ... } }
//! ```
//!
//! Saving goes through a sibling temp file that is renamed over the target,
//! so readers never observe a half-written snapshot. Loading parses and
//! validates the complete tree before handing it back; a failed load
//! returns an error and produces nothing.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hierarchy::Hierarchy;
use crate::{Error, Result};

/// Snapshot layout version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format_version: u32,
    saved_at: DateTime<Utc>,
    hierarchy: &'a Hierarchy,
}

#[derive(Deserialize)]
struct Snapshot {
    format_version: u32,
    saved_at: DateTime<Utc>,
    hierarchy: Hierarchy,
}

impl Hierarchy {
    /// Write a snapshot of the whole hierarchy to `writer`.
    pub fn write_snapshot<W: Write>(&self, writer: W) -> Result<()> {
        let snapshot = SnapshotRef {
            format_version: FORMAT_VERSION,
            saved_at: Utc::now(),
            hierarchy: self,
        };
        serde_json::to_writer(writer, &snapshot)?;
        Ok(())
    }

    /// Read and validate a snapshot produced by [`write_snapshot`](Self::write_snapshot).
    pub fn read_snapshot<R: Read>(reader: R) -> Result<Hierarchy> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        if snapshot.format_version != FORMAT_VERSION {
            return Err(Error::CorruptSnapshot(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                snapshot.format_version
            )));
        }
        snapshot.hierarchy.validate()?;
        info!(
            saved_at = %snapshot.saved_at,
            nodes = snapshot.hierarchy.len(),
            leaves = snapshot.hierarchy.leaf_count(),
            "read hierarchy snapshot"
        );
        Ok(snapshot.hierarchy)
    }

    /// Save a snapshot to `path`, replacing any existing file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let staging = staging_path(path);

        let written = File::create(&staging).map_err(Error::from).and_then(|file| {
            let mut writer = BufWriter::new(file);
            self.write_snapshot(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            Ok(())
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        fs::rename(&staging, path)?;

        info!(path = %path.display(), nodes = self.len(), "saved hierarchy");
        Ok(())
    }

    /// Load a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Hierarchy> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let hierarchy = Self::read_snapshot(BufReader::new(file))?;
        info!(path = %path.display(), "loaded hierarchy");
        Ok(hierarchy)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
