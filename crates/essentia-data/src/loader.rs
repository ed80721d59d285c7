//! Format detection (RON/JSON/TOML), file discovery, deserialization and
//! name-resolution helpers used by the pack pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use essentia_core::aspect::AspectError;
use essentia_core::config::ConfigError;
use essentia_core::container::ContainerError;
use essentia_core::grid::GridPos;
use essentia_tubes::WorldError;
use serde::de::DeserializeOwned;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a pack.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error("invalid color '{color}' for aspect '{aspect}' in {file}")]
    InvalidColor {
        file: PathBuf,
        aspect: String,
        color: String,
    },

    #[error("invalid tile at {pos:?} in {file}: {detail}")]
    InvalidTile {
        file: PathBuf,
        pos: GridPos,
        detail: String,
    },

    #[error(transparent)]
    Aspect(#[from] AspectError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

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
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = &found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML files hold the array under `toml_key` in a
/// top-level table; RON and JSON files are the list itself.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name, returning `UnresolvedRef` if absent.
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

/// Fail with `DuplicateName` if `name` is already present.
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

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::{AspectData, TomlAspects};
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    pub(crate) fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "essentia_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("aspects.ron")).unwrap(), Format::Ron);
        assert_eq!(
            detect_format(Path::new("aspects.toml")).unwrap(),
            Format::Toml
        );
        assert_eq!(
            detect_format(Path::new("aspects.json")).unwrap(),
            Format::Json
        );
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["aspects.yaml", "aspects"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file / require_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "layout").unwrap(), None);

        fs::write(dir.join("layout.toml"), "").unwrap();
        assert_eq!(
            find_data_file(&dir, "layout").unwrap(),
            Some(dir.join("layout.toml"))
        );

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("aspects.ron"), "[]").unwrap();
        fs::write(dir.join("aspects.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "aspects"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        let result = require_data_file(&dir, "aspects");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "aspects"
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_file / deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_ron() {
        let dir = make_test_dir("list_ron");
        let path = dir.join("aspects.ron");
        fs::write(
            &path,
            r##"[
                (key: "aer", color: "#ffff7e"),
                (key: "terra", color: "#56c000"),
                (key: "motus", color: "#cdccf4", components: Some(("aer", "terra"))),
            ]"##,
        )
        .unwrap();

        let aspects: Vec<AspectData> = deserialize_list(&path, "aspects").unwrap();
        assert_eq!(aspects.len(), 3);
        assert_eq!(aspects[0].key, "aer");
        assert_eq!(
            aspects[2].components,
            Some(("aer".to_string(), "terra".to_string()))
        );

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_json() {
        let dir = make_test_dir("list_json");
        let path = dir.join("aspects.json");
        fs::write(
            &path,
            r##"[{"key": "aer", "color": "#ffff7e"}, {"key": "ignis", "color": "#ff5a01"}]"##,
        )
        .unwrap();

        let aspects: Vec<AspectData> = deserialize_list(&path, "aspects").unwrap();
        assert_eq!(aspects.len(), 2);
        assert!(aspects[1].components.is_none());

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("aspects.toml");
        fs::write(
            &path,
            r##"
[[aspects]]
key = "aer"
color = "#ffff7e"

[[aspects]]
key = "aqua"
color = "#3cd4fc"
"##,
        )
        .unwrap();

        let aspects: Vec<AspectData> = deserialize_list(&path, "aspects").unwrap();
        assert_eq!(aspects.len(), 2);
        assert_eq!(aspects[1].key, "aqua");

        let wrapper: TomlAspects = deserialize_file(&path).unwrap();
        assert_eq!(wrapper.aspects.len(), 2);

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("aspects.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<AspectData>, _> = deserialize_list(&path, "aspects");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<AspectData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // resolve_name / check_duplicate
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_name_found_and_missing() {
        let mut map = HashMap::new();
        map.insert("aer".to_string(), 0u32);

        assert_eq!(
            *resolve_name(&map, "aer", Path::new("layout.ron"), "aspect").unwrap(),
            0
        );
        assert!(matches!(
            resolve_name(&map, "ignis", Path::new("layout.ron"), "aspect"),
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "aspect", .. }) if name == "ignis"
        ));
    }

    #[test]
    fn check_duplicate_detects() {
        let mut map = HashMap::new();
        assert!(check_duplicate(&map, "aer", Path::new("aspects.ron")).is_ok());
        map.insert("aer".to_string(), 0u32);
        assert!(matches!(
            check_duplicate(&map, "aer", Path::new("aspects.ron")),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "aer"
        ));
    }

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: "aspects".to_string(),
            dir: PathBuf::from("/data"),
        };
        assert!(format!("{e}").contains("aspects"));
        assert!(format!("{e}").contains("/data"));

        let e = DataLoadError::InvalidColor {
            file: PathBuf::from("aspects.ron"),
            aspect: "aer".to_string(),
            color: "yellow".to_string(),
        };
        let msg = format!("{e}");
        assert!(msg.contains("yellow"));
        assert!(msg.contains("aer"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(format!("{data_err}").contains("file not found"));
    }
}
