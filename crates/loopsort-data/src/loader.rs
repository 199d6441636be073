//! Reads diagram and sorter configuration files.
//!
//! Provides format detection (RON/JSON/TOML), deserialization helpers, and
//! id resolution from [`DiagramData`] into a [`Diagram`].

use crate::schema::DiagramData;
use loopsort_core::config::SortConfig;
use loopsort_core::diagram::{Diagram, DiagramError};
use loopsort_core::id::ElementId;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Stand-in file name for content that did not come from disk.
const INLINE: &str = "<inline>";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An id reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// Two elements share an id.
    #[error("duplicate element id '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The diagram rejected an edit while being built.
    #[error(transparent)]
    Diagram(#[from] DiagramError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` is only used in errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Public loaders
// ===========================================================================

/// Load a [`SortConfig`]. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<SortConfig, DataLoadError> {
    deserialize_file(path)
}

/// Load a diagram file and build the diagram it describes.
pub fn load_diagram(path: &Path) -> Result<Diagram, DataLoadError> {
    let data: DiagramData = deserialize_file(path)?;
    build_diagram(&data, path)
}

/// Parse diagram content that is already in memory.
pub fn parse_diagram(content: &str, format: Format) -> Result<Diagram, DataLoadError> {
    let file = Path::new(INLINE);
    let data: DiagramData = deserialize_str(content, format, file)?;
    build_diagram(&data, file)
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Resolve string ids in `data` and build a [`Diagram`].
///
/// Elements are added in file order, so a parent must appear before its
/// children. Flows may reference any declared element.
pub fn build_diagram(data: &DiagramData, file: &Path) -> Result<Diagram, DataLoadError> {
    let mut diagram = Diagram::new();
    let mut declared: HashMap<String, ElementId> = HashMap::new();

    for entry in &data.elements {
        check_duplicate(&declared, &entry.id, file)?;
        let element = match &entry.parent {
            Some(parent) => {
                let parent = *resolve_name(&declared, parent, file, "parent element")?;
                diagram.add_child_element(parent, entry.id.clone(), entry.kind.into())?
            }
            None => diagram.add_element(entry.id.clone(), entry.kind.into())?,
        };
        declared.insert(entry.id.clone(), element);
    }

    for flow in &data.flows {
        let from = *resolve_name(&declared, &flow.source, file, "flow source")?;
        let to = *resolve_name(&declared, &flow.target, file, "flow target")?;
        diagram.connect_with(from, to, flow.kind.into(), flow.label.clone())?;
    }

    Ok(diagram)
}

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
