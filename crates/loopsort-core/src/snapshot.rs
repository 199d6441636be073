//! Binary snapshots of a diagram.
//!
//! Sorting rewrites the diagram in place and cannot be undone. Take a
//! snapshot first if the original adjacency may be needed again, and
//! restore it to roll back.

use crate::diagram::Diagram;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a diagram snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x1005_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while taking or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header stored in front of the diagram in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Element count at the time of the snapshot.
    pub elements: u32,
    /// Flow count at the time of the snapshot.
    pub flows: u32,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(diagram: &Diagram) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            elements: diagram.element_count() as u32,
            flows: diagram.flow_count() as u32,
        }
    }

    /// Validate the header. Returns `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DiagramSnapshot {
    header: SnapshotHeader,
    diagram: Diagram,
}

// ---------------------------------------------------------------------------
// Take / restore
// ---------------------------------------------------------------------------

/// Encode the diagram, including any rewritten adjacency.
pub fn take_snapshot(diagram: &Diagram) -> Result<Vec<u8>, SnapshotError> {
    let snapshot = DiagramSnapshot {
        header: SnapshotHeader::new(diagram),
        diagram: diagram.clone(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Decode a diagram from a snapshot, checking the header first.
pub fn restore_snapshot(data: &[u8]) -> Result<Diagram, SnapshotError> {
    let snapshot: DiagramSnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok(snapshot.diagram)
}

/// Read only the header of a snapshot.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, SnapshotError> {
    // bitcode has no partial decoding, so this decodes the whole snapshot.
    let snapshot: DiagramSnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}
