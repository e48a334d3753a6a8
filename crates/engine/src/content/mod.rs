//! JSON data files (levels, catalogs) with field-path error reporting.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}:{column}: invalid value at `{field}`: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        line: usize,
        column: usize,
        message: String,
    },
}

pub fn load_json_def<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json_def(&raw, path)
}

/// `origin` only labels errors; nothing is read from it.
pub fn parse_json_def<T: DeserializeOwned>(raw: &str, origin: &Path) -> Result<T, ContentError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        let inner = error.into_inner();
        parse_error(origin, field, &inner)
    })?;
    deserializer
        .end()
        .map_err(|error| parse_error(origin, ".".to_string(), &error))?;
    Ok(value)
}

fn parse_error(origin: &Path, field: String, error: &serde_json::Error) -> ContentError {
    ContentError::Parse {
        path: origin.to_path_buf(),
        field,
        line: error.line(),
        column: error.column(),
        message: error.to_string(),
    }
}
