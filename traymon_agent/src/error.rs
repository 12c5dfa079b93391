//! Error types for configuration loading and overlay templates.

use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("unknown token {{{0}}}")]
    UnknownToken(String),

    #[error("empty token at byte {0}")]
    EmptyToken(usize),

    #[error("unclosed '{{' at byte {0}")]
    Unclosed(usize),

    #[error("unmatched '}}' at byte {0}")]
    StrayClose(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}: top-level value must be an object")]
    NotAnObject(PathBuf),

    #[error("invalid value for {key}: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("overlay_format: {0}")]
    Template(#[from] TemplateError),
}

impl ConfigError {
    /// Short, user-facing description suitable for a tray notice.
    pub fn summary(&self) -> String {
        match self {
            ConfigError::Io { .. } => "config file could not be read".into(),
            ConfigError::Parse { .. } | ConfigError::NotAnObject(_) => {
                "config file is not valid JSON".into()
            }
            ConfigError::InvalidValue { key, .. } => format!("config key '{key}' is invalid"),
            ConfigError::Template(TemplateError::UnknownToken(t)) => {
                format!("overlay template uses unknown token {{{t}}}")
            }
            ConfigError::Template(_) => "overlay template is malformed".into(),
        }
    }
}
