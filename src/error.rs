use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a family genotype file
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error reading {path} at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading a haplogroup rule table
#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("Failed to read rule table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML rule table: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON rule table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid marker '{marker}' in rule '{rule}': expected position followed by allele, e.g. 16223T")]
    InvalidMarker { rule: String, marker: String },
}
