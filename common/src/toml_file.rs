//! Reading and writing TOML-backed configuration files.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum TomlFileError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, TomlFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| TomlFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| TomlFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<(), TomlFileError> {
    let text = toml::to_string_pretty(value)?;
    std::fs::write(path, text).map_err(|source| TomlFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fresh_test_dir;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        plates: Vec<u32>,
        thickness: u32,
    }

    #[test]
    fn test_save_then_load() {
        let dir = fresh_test_dir("toml_file_save_load");
        let path = dir.join("sample.toml");
        let value = Sample {
            plates: vec![1, 10],
            thickness: 7,
        };
        save(&value, &path).unwrap();
        let loaded: Sample = load(&path).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = fresh_test_dir("toml_file_parse_error");
        let path = dir.join("broken.toml");
        std::fs::write(&path, "plates = [1,").unwrap();
        let err = load::<Sample>(&path).unwrap_err();
        assert!(matches!(err, TomlFileError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load::<Sample>(Path::new("/nonexistent/screen.toml")).unwrap_err();
        assert!(matches!(err, TomlFileError::Read { .. }));
    }
}
